#![deny(clippy::pedantic, clippy::clone_on_ref_ptr)]
// The following warnings are too noisy for us and having them enabled leads to polluting the
// code with allow annotations. Disabling them once per project here
#![allow(clippy::similar_names)]
#![allow(clippy::module_name_repetitions)]

//! Secret-sharing and HPKE encryption of IPA match keys.
//!
//! A 64-bit match key is split into three replicated shares, one per helper. Each share is sealed
//! towards its helper's public key, bound to an [`info`] string that carries the helper and site
//! domains, key identifier, epoch and event type. The result is a binary blob that only the
//! intended helper can open.
//!
//! [`info`]: crate::hpke::Info

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ff;
pub mod helpers;
pub mod hpke;
pub mod report;
pub mod secret_sharing;

#[cfg(any(test, feature = "test-fixture"))]
pub mod test_fixture;

pub const CRATE_NAME: &str = env!("CARGO_CRATE_NAME");
