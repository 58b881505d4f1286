use std::fmt;

use serde::{Deserialize, Serialize};

/// A migration checkpoint.
///
/// Versions are ordered by their integer value. The set of versions that
/// actually exist is owned by the [`Migrator`](crate::migrator::Migrator),
/// not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);

impl Version {
    /// The version every store starts at. It is assumed to be applied already.
    pub const BASE: Version = Version(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The next version to consider after this one.
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub const fn is_base(self) -> bool {
        self.0 == Self::BASE.0
    }
}

impl From<u32> for Version {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Version> for u32 {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[test]
fn test_successor() {
    assert_eq!(Version::BASE.successor(), Version::new(1));
    assert_eq!(Version::new(u32::MAX).successor(), Version::new(u32::MAX));
    assert!(Version::new(2) < Version::new(3));
    assert_eq!(serde_json::to_string(&Version::new(7)).unwrap(), "7");
}
