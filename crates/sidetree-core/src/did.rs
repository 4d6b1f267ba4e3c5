//! DID identifier parsing and composition.
//!
//! A DID is `<namespace> ":" <unique-suffix>`. The namespace may itself
//! contain colons, so parsing always splits on the *last* colon.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DidError {
    #[error("malformed DID: no namespace delimiter found in {0:?}")]
    NoDelimiter(String),
    #[error("initial-values is present but empty")]
    InitialValuesEmpty,
}

/// Compose a DID identifier from its parts: `namespace + ":" + unique_suffix`.
pub fn compose(namespace: &str, unique_suffix: &str) -> String {
    format!("{namespace}:{unique_suffix}")
}

/// Split a DID into `(namespace, unique_suffix)`, splitting on the *last*
/// colon so namespaces containing colons (e.g. `did:example:v1`) parse
/// correctly.
pub fn parse(id: &str) -> Result<(&str, &str), DidError> {
    match id.rfind(':') {
        Some(idx) => Ok((&id[..idx], &id[idx + 1..])),
        None => Err(DidError::NoDelimiter(id.to_string())),
    }
}

/// Return just the namespace portion of a DID.
pub fn parse_namespace(id: &str) -> Result<&str, DidError> {
    parse(id).map(|(ns, _)| ns)
}

/// The `;initial-values=` suffix used for unpublished resolution.
const INITIAL_VALUES_DELIMITER: &str = ";initial-values=";

/// Split a DID-with-initial-values string into `(did, initial_values)`.
///
/// Returns `None` if the delimiter is absent (an ordinary DID). Returns
/// `InitialValuesEmpty` if the delimiter is present but nothing follows it.
pub fn split_initial_values(input: &str) -> Result<Option<(&str, &str)>, DidError> {
    match input.find(INITIAL_VALUES_DELIMITER) {
        None => Ok(None),
        Some(idx) => {
            let did = &input[..idx];
            let rest = &input[idx + INITIAL_VALUES_DELIMITER.len()..];
            if rest.is_empty() {
                return Err(DidError::InitialValuesEmpty);
            }
            Ok(Some((did, rest)))
        }
    }
}
