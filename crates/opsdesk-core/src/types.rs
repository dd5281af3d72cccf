//! Identifier types.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Identifier of an authenticated user, as issued by the identity provider.
///
/// The provider's ids are opaque strings (UUIDs in practice); they are kept
/// verbatim apart from surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id, rejecting empty input.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyUserId`] if `id` is empty after trimming.
    pub fn new(id: impl AsRef<str>) -> CoreResult<Self> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyUserId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_trims() {
        let id = UserId::new("  abc-123 ").unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(id.to_string(), "abc-123");
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert_eq!(UserId::new("   "), Err(CoreError::EmptyUserId));
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_user_id_serializes_transparently() {
        let id = UserId::new("u-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u-1\"");
    }
}
