//! Definition hashing
//!
//! Provides [`DefinitionHash`], a SHA-256 digest over the canonical JSON form
//! of a component definition. Object keys are sorted recursively so that two
//! semantically identical definitions hash identically regardless of field
//! order. The `trust_level` field is excluded.

use crate::error::HandlerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};

/// Field excluded from the digest
pub const TRUST_LEVEL_FIELD: &str = "trust_level";

/// Hex-encoded SHA-256 digest of a definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionHash(String);

impl DefinitionHash {
    /// Compute the digest of a raw definition
    ///
    /// # Errors
    /// Returns error if the canonical form cannot be encoded
    pub fn compute(definition: &Value) -> Result<Self, HandlerError> {
        let mut stripped = definition.clone();
        if let Value::Object(map) = &mut stripped {
            map.remove(TRUST_LEVEL_FIELD);
        }
        let bytes = serde_json::to_vec(&canonicalize(&stripped))?;
        Ok(Self(hex::encode(Sha256::digest(&bytes))))
    }

    /// Hex string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a previously recorded hex digest
    #[inline]
    #[must_use]
    pub fn matches(&self, recorded: Option<&str>) -> bool {
        recorded == Some(self.0.as_str())
    }
}

impl Display for DefinitionHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DefinitionHash> for Value {
    fn from(hash: DefinitionHash) -> Self {
        Value::String(hash.0)
    }
}

/// Rebuild `value` with every object's keys inserted in sorted order
///
/// Insertion order is also the output order when serde_json preserves it,
/// so the result serializes identically either way.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_hex_sha256() {
        let hash = DefinitionHash::compute(&json!({"name": "app-logs"})).unwrap();
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"name":"x","tags":{"a":"1","b":"2"}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"tags":{"b":"2","a":"1"},"name":"x"}"#).unwrap();
        assert_eq!(
            DefinitionHash::compute(&a).unwrap(),
            DefinitionHash::compute(&b).unwrap()
        );
    }

    #[test]
    fn trust_level_excluded() {
        let plain = DefinitionHash::compute(&json!({"name": "x"})).unwrap();
        let trusted = DefinitionHash::compute(&json!({"name": "x", "trust_level": "full"})).unwrap();
        assert_eq!(plain, trusted);
    }

    #[test]
    fn nested_trust_level_is_content() {
        let plain = DefinitionHash::compute(&json!({"tags": {}})).unwrap();
        let nested = DefinitionHash::compute(&json!({"tags": {"trust_level": "full"}})).unwrap();
        assert_ne!(plain, nested);
    }

    #[test]
    fn content_changes_hash() {
        let a = DefinitionHash::compute(&json!({"name": "x"})).unwrap();
        let b = DefinitionHash::compute(&json!({"name": "y"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn matches_recorded() {
        let hash = DefinitionHash::compute(&json!({"name": "x"})).unwrap();
        let recorded = hash.to_string();
        assert!(hash.matches(Some(&recorded)));
        assert!(!hash.matches(None));
        assert!(!hash.matches(Some("deadbeef")));
    }

    #[test]
    fn canonicalize_sorts_nested_objects() {
        let value: Value = serde_json::from_str(r#"{"b":[{"z":1,"y":2}],"a":0}"#).unwrap();
        let text = serde_json::to_string(&canonicalize(&value)).unwrap();
        assert_eq!(text, r#"{"a":0,"b":[{"y":2,"z":1}]}"#);
    }
}
