//! Decentralized identifiers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Replacement value for a DID the caller is not allowed to see.
pub const HIDDEN_DID: &str = "did:none:HIDDEN";

/// A decentralized identifier such as `did:ethr:0xabc...`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[allow(dead_code)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string has the `did:<method>:<id>` shape.
    ///
    /// The method must be lowercase ASCII alphanumeric; the id must be
    /// non-empty and free of whitespace.
    pub fn looks_like_did(value: &str) -> bool {
        let Some(rest) = value.strip_prefix("did:") else {
            return false;
        };
        let Some((method, id)) = rest.split_once(':') else {
            return false;
        };

        !method.is_empty()
            && method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            && !id.is_empty()
            && !id.chars().any(char::is_whitespace)
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Did {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identity of the caller, placed in request extensions by the identity
/// middleware before any report handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIssuer(pub Did);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_did() {
        assert!(Did::looks_like_did("did:ethr:0x1234abcd"));
        assert!(Did::looks_like_did("did:web:example.com:user:alice"));
        assert!(Did::looks_like_did(HIDDEN_DID));

        assert!(!Did::looks_like_did("did:"));
        assert!(!Did::looks_like_did("did:ethr:"));
        assert!(!Did::looks_like_did("did::0x1"));
        assert!(!Did::looks_like_did("did:ETHR:0x1"));
        assert!(!Did::looks_like_did("did:ethr:0x1 and more"));
        assert!(!Did::looks_like_did("ethr:0x1"));
        assert!(!Did::looks_like_did("Alice"));
    }

    #[test]
    fn test_did_serializes_as_plain_string() {
        let did = Did::new("did:ethr:0xabc");
        assert_eq!(serde_json::to_string(&did).unwrap(), "\"did:ethr:0xabc\"");
        assert_eq!(did.to_string(), "did:ethr:0xabc");
    }
}
