use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Index, IndexMut},
};

/// Represents an opaque identifier of one of the three helper parties. Each helper receives
/// exactly one share of every match key.
/// `HelperIdentity` is established at startup and never changes. Components that want to
/// resolve this identifier into something (encryption keys, domain) must consult
/// [`HelperRegistry`].
///
/// [`HelperRegistry`]: crate::config::HelperRegistry
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct HelperIdentity {
    id: u8,
}

impl TryFrom<usize> for HelperIdentity {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(id @ 1..=3) => Ok(Self { id }),
            _ => Err(format!(
                "{value} must be within [1, 3] range to be a valid helper identity"
            )),
        }
    }
}

impl TryFrom<&str> for HelperIdentity {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        for identity in HelperIdentity::make_three() {
            if identity.as_str() == value {
                return Ok(identity);
            }
        }

        Err(format!("{value} is not a valid helper identity"))
    }
}

impl From<HelperIdentity> for u8 {
    fn from(value: HelperIdentity) -> Self {
        value.id
    }
}

impl Debug for HelperIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for HelperIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl HelperIdentity {
    pub const ONE: Self = Self { id: 1 };
    pub const TWO: Self = Self { id: 2 };
    pub const THREE: Self = Self { id: 3 };

    pub const ONE_STR: &'static str = "helper1";
    pub const TWO_STR: &'static str = "helper2";
    pub const THREE_STR: &'static str = "helper3";

    #[must_use]
    pub fn make_three() -> [Self; 3] {
        [Self::ONE, Self::TWO, Self::THREE]
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self.id {
            1 => Self::ONE_STR,
            2 => Self::TWO_STR,
            3 => Self::THREE_STR,
            _ => unreachable!("helper identity out of range"),
        }
    }
}

// `HelperIdentity` is 1-indexed, so subtract 1 for `Index` values
impl<T> Index<HelperIdentity> for [T] {
    type Output = T;

    fn index(&self, index: HelperIdentity) -> &Self::Output {
        self.index(usize::from(index.id) - 1)
    }
}

// `HelperIdentity` is 1-indexed, so subtract 1 for `Index` values
impl<T> IndexMut<HelperIdentity> for [T] {
    fn index_mut(&mut self, index: HelperIdentity) -> &mut Self::Output {
        self.index_mut(usize::from(index.id) - 1)
    }
}
