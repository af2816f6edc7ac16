use serde::{Deserialize, Serialize};

/// Optimistic concurrency token carried by every mutable row.
///
/// A row is inserted at [`Version::first`] and the store bumps it by exactly
/// one on each successful write. A writer presents the version it read; a
/// mismatch means another writer committed in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub const fn new(version: i64) -> Self {
        Self(version)
    }

    /// Version assigned to a freshly inserted row.
    pub const fn first() -> Self {
        Self(1)
    }

    /// Returns the version a successful write produces.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version number.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::first()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(version: i64) -> Self {
        Self(version)
    }
}
