//! Entity identifiers.

use std::fmt;

/// Stable identifier for one catalog entry.
///
/// The identifier is opaque to this crate: it is substituted into source URL
/// templates and used as the key for both the sprite store and the
/// scaled-icon cache. Catalog APIs typically hand out numeric ids, but
/// nothing here depends on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the id is empty or whitespace-only.
    ///
    /// Blank ids are rejected at the service boundary; they would otherwise
    /// produce nonsense cache paths and source URLs.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}
