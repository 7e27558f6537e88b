pub mod crypto;
mod verbosity;

pub use verbosity::Verbosity;
