// crates/flutnet-core/src/hashing.rs
// ============================================================================
// Module: Contract Hashing
// Description: Canonical JSON encoding and SHA-256 digests for contracts.
// Purpose: Give generated packages a stable fingerprint and artifact digests.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Contract models and package manifests are serialized with RFC 8785 (JCS)
//! so identical inputs always produce identical bytes. The contract
//! fingerprint is embedded into every generated package; the native side and
//! the Dart side can compare fingerprints to detect a stale bridge.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::model::ContractModel;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first `len` hex characters, for display in headers.
    #[must_use]
    pub fn short(&self, len: usize) -> &str {
        self.0.get(.. len).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical serialization failure.
#[derive(Debug, Error)]
#[error("failed to canonicalize json: {0}")]
pub struct CanonicalJsonError(String);

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns RFC 8785 canonical JSON bytes for a value.
///
/// # Errors
///
/// Returns [`CanonicalJsonError`] when the value cannot be serialized.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalJsonError> {
    serde_jcs::to_vec(value).map_err(|err| CanonicalJsonError(err.to_string()))
}

/// Digests raw bytes with SHA-256.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> ContentDigest {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    ContentDigest(out)
}

/// Computes the fingerprint of a contract model.
///
/// # Errors
///
/// Returns [`CanonicalJsonError`] when the model cannot be serialized.
pub fn contract_fingerprint(model: &ContractModel) -> Result<ContentDigest, CanonicalJsonError> {
    Ok(digest_bytes(&canonical_json_bytes(model)?))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::*;

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            digest_bytes(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let value = serde_json::json!({"b": 1, "a": [true, null]});
        assert_eq!(canonical_json_bytes(&value).unwrap(), br#"{"a":[true,null],"b":1}"#.to_vec());
    }

    #[test]
    fn fingerprint_is_stable_for_equal_models() {
        let a = ContractModel {
            assembly: "Acme".to_string(),
            ..ContractModel::default()
        };
        let b = a.clone();
        assert_eq!(contract_fingerprint(&a).unwrap(), contract_fingerprint(&b).unwrap());
        assert_eq!(contract_fingerprint(&a).unwrap().short(8).len(), 8);
    }
}
