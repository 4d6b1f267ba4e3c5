//! Base encoding and canonical JSON serialization.
//!
//! Base encoding is `base64url`, no padding, via `multibase` so every
//! producer in the system emits byte-identical strings for the same input.
//! `canonical_serialize` sorts JSON object keys recursively before encoding
//! so that two structurally-equal objects always serialize identically.

use serde::Serialize;
use thiserror::Error;

/// The multibase prefix this protocol commits to. Every encoded string in
/// the system carries this prefix; producers and consumers must agree on it.
const BASE: multibase::Base = multibase::Base::Base64Url;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid base encoding: {0}")]
    InvalidEncoding(String),
    #[error("failed to canonicalize: {0}")]
    Canonicalization(#[from] serde_json::Error),
}

/// Encode bytes to the canonical base-encoded string form.
pub fn encode(bytes: &[u8]) -> String {
    multibase::encode(BASE, bytes)
}

/// Decode a base-encoded string back to bytes.
///
/// Fails with `InvalidEncoding` on malformed input, including strings using
/// a different multibase prefix than `BASE`.
pub fn decode(value: &str) -> Result<Vec<u8>, EncodingError> {
    let (base, bytes) =
        multibase::decode(value).map_err(|e| EncodingError::InvalidEncoding(e.to_string()))?;
    if base != BASE {
        return Err(EncodingError::InvalidEncoding(format!(
            "expected {:?} encoding, got {:?}",
            BASE, base
        )));
    }
    Ok(bytes)
}

/// Serialize any `Serialize` value to a stable, key-ordered JSON byte string.
///
/// Two calls on structurally-equivalent values (same keys/values, any
/// declaration order) produce byte-identical output — this is what makes
/// hashing a structured object (e.g. `suffix_data`) reproducible across
/// independent implementations.
pub fn canonical_serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let value = serde_json::to_value(value)?;
    let canonical = sort_keys(value);
    Ok(serde_json::to_vec(&canonical)?)
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
