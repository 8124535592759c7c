//! Validated request identifiers.
//!
//! A [`RequestId`] names one unit of work. It is also the conversation key
//! used by the memory store, so the same validation rules that keep memory
//! keys safe apply here:
//!
//! - Non-empty, at most 128 characters
//! - No leading or trailing whitespace
//! - Only alphanumeric characters, hyphens (`-`), underscores (`_`), dots (`.`)
//! - No path traversal sequences (`../`, `./`)
//!
//! ```rust
//! use maestro_core::RequestId;
//!
//! let id = RequestId::parse("r1").unwrap();
//! assert_eq!(id.as_str(), "r1");
//!
//! assert!(RequestId::parse("").is_err());
//! assert!(RequestId::parse("../etc").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length for request identifiers
pub const MAX_ID_LENGTH: usize = 128;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    #[error("Identifier cannot be empty")]
    Empty,
    #[error("Identifier cannot be whitespace-only")]
    WhitespaceOnly,
    #[error("Identifier cannot have leading or trailing whitespace")]
    LeadingTrailingWhitespace,
    #[error(
        "Identifier can only contain alphanumeric characters, hyphens, underscores, and dots"
    )]
    InvalidCharacters,
    #[error("Identifier too long ({length} chars, max {max})")]
    TooLong { length: usize, max: usize },
    #[error("Identifier cannot contain path traversal sequences (../)")]
    PathTraversal,
}

fn validate(id: &str) -> Result<&str, IdValidationError> {
    if id.is_empty() {
        return Err(IdValidationError::Empty);
    }
    if id.trim().is_empty() {
        return Err(IdValidationError::WhitespaceOnly);
    }
    if id != id.trim() {
        return Err(IdValidationError::LeadingTrailingWhitespace);
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(IdValidationError::TooLong {
            length: id.len(),
            max: MAX_ID_LENGTH,
        });
    }
    if id.contains("../") || id.contains("./") {
        return Err(IdValidationError::PathTraversal);
    }
    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(IdValidationError::InvalidCharacters);
    }
    Ok(id)
}

/// Unique identifier of a submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Parse and validate a request ID.
    pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
        validate(id.as_ref()).map(|s| Self(s.to_string()))
    }

    /// Generate a fresh random request ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a request ID without validation (tests only).
    #[doc(hidden)]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RequestId {
    type Err = IdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = IdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(&value)?;
        Ok(Self(value))
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("r1")]
    #[case("request-42")]
    #[case("chat_2024.01")]
    #[case("ABC-def_123")]
    fn test_valid_ids(#[case] id: &str) {
        assert_eq!(RequestId::parse(id).unwrap().as_str(), id);
    }

    #[rstest]
    #[case("", IdValidationError::Empty)]
    #[case("   ", IdValidationError::WhitespaceOnly)]
    #[case(" r1", IdValidationError::LeadingTrailingWhitespace)]
    #[case("../etc", IdValidationError::PathTraversal)]
    #[case("r1/r2", IdValidationError::InvalidCharacters)]
    #[case("r 1", IdValidationError::InvalidCharacters)]
    fn test_invalid_ids(#[case] id: &str, #[case] expected: IdValidationError) {
        assert_eq!(RequestId::parse(id), Err(expected));
    }

    #[test]
    fn test_too_long() {
        let long = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            RequestId::parse(&long),
            Err(IdValidationError::TooLong { length: 129, max: 128 })
        ));
    }

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert!(RequestId::parse(a.as_str()).is_ok());
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: RequestId = serde_json::from_str("\"r1\"").unwrap();
        assert_eq!(ok.as_str(), "r1");
        assert!(serde_json::from_str::<RequestId>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"r1\"");
    }
}
