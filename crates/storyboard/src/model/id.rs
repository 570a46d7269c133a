//! String identifiers for nodes and document resources.
//!
//! Identifiers are the only cross-reference mechanism on the wire. In memory,
//! links between nodes are [`NodeIndex`](crate::model::NodeIndex) values; the
//! graph keeps an index from `Id` to arena slot.

use std::fmt;

use uuid::Uuid;

/// Identifier of a node. Immutable once the node exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(String);

impl Id {
    /// Mints a fresh identifier (uppercase UUID v4 text).
    pub fn mint() -> Self {
        Id(mint_uuid_string())
    }

    /// Wraps an existing identifier string.
    pub fn new(value: impl Into<String>) -> Self {
        Id(value.into())
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_string())
    }
}

/// Identifier of a color or gradient resource.
///
/// Resource identifiers live in their own namespace; a node and a color may
/// share the same text without conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(String);

impl ResourceId {
    /// Mints a fresh resource identifier.
    pub fn mint() -> Self {
        ResourceId(mint_uuid_string())
    }

    /// Wraps an existing identifier string.
    pub fn new(value: impl Into<String>) -> Self {
        ResourceId(value.into())
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        ResourceId(value.to_string())
    }
}

fn mint_uuid_string() -> String {
    Uuid::new_v4().hyphenated().to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_is_unique() {
        let a = Id::mint();
        let b = Id::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_mint_format() {
        let id = Id::mint();
        assert_eq!(id.as_str().len(), 36);
        assert_eq!(id.as_str(), id.as_str().to_uppercase());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_display_matches_text() {
        let id = Id::new("screen-1");
        assert_eq!(id.to_string(), "screen-1");
        assert_eq!(ResourceId::from("red").as_str(), "red");
    }
}
