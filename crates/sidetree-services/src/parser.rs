//! Operation parser & validator.

use serde::Deserialize;
use sidetree_core::encoding::{self, EncodingError};
use sidetree_core::multihash::{self, HashError};
use sidetree_core::operation::{
    derive_unique_suffix, Operation, OperationKind, OperationType, PatchData, SignedDataDeactivate,
    SignedDataRecover, SignedDataUpdate, SuffixData,
};
use sidetree_core::protocol::Protocol;
use thiserror::Error;

use crate::patch::{validate_patches, PatchError};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request exceeds max_operation_byte_size ({actual} > {max})")]
    OperationTooLarge { actual: usize, max: usize },
    #[error("malformed request JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing required field {0:?}")]
    MissingField(&'static str),
    #[error("invalid base encoding in field {field:?}: {source}")]
    InvalidEncoding {
        field: &'static str,
        #[source]
        source: EncodingError,
    },
    #[error("invalid patch: {0}")]
    InvalidPatch(#[from] PatchError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("patch_data hash does not match suffix_data.patch_data_hash")]
    CommitmentMismatch,
    #[error("unknown operation type {0:?}")]
    UnknownOperationType(String),
}

/// The raw JSON shape of a client request before field-specific decoding.
#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(rename = "type")]
    operation_type: String,
    #[serde(default)]
    suffix_data: Option<String>,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    signed_data: Option<String>,
    #[serde(default)]
    did_suffix: Option<String>,
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, ParseError> {
    encoding::decode(value).map_err(|source| ParseError::InvalidEncoding { field, source })
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ParseError> {
    value.as_deref().ok_or(ParseError::MissingField(field))
}

fn parse_patch_data(bytes: &[u8]) -> Result<PatchData, ParseError> {
    let patch_data: PatchData = serde_json::from_slice(bytes)?;
    validate_patches(&patch_data.patches)?;
    Ok(patch_data)
}

/// Commitments are computed over the canonical serialization of the parsed
/// structure (the same convention `derive_unique_suffix` uses for
/// `suffix_data`), not the raw wire bytes — so replaying an anchored
/// operation can re-check the commitment without keeping the original bytes
/// around.
fn patch_data_hash_matches(code: u64, patch_data: &PatchData, expected: &str) -> Result<bool, ParseError> {
    let canonical = encoding::canonical_serialize(patch_data)
        .map_err(|source| ParseError::InvalidEncoding { field: "delta", source })?;
    let computed = multihash::compute_multihash(code, &canonical)?;
    Ok(encoding::encode(&computed) == expected)
}

/// Parse and validate a client request into an `Operation`.
///
/// `namespace` is supplied by the caller (it is not carried in the wire
/// request itself — the node knows which namespace it is serving).
pub fn parse_operation(
    namespace: &str,
    request_bytes: &[u8],
    protocol: &Protocol,
) -> Result<Operation, ParseError> {
    if request_bytes.len() > protocol.max_operation_byte_size {
        return Err(ParseError::OperationTooLarge {
            actual: request_bytes.len(),
            max: protocol.max_operation_byte_size,
        });
    }

    let raw: RawRequest = serde_json::from_slice(request_bytes)?;
    let code = protocol.hash_algorithm_code;

    let (kind, unique_suffix) = match raw.operation_type.as_str() {
        "create" => {
            let suffix_data_bytes = decode_field("suffix_data", required("suffix_data", &raw.suffix_data)?)?;
            let suffix_data: SuffixData = serde_json::from_slice(&suffix_data_bytes)?;

            let patch_data_bytes = decode_field("delta", required("delta", &raw.delta)?)?;
            let patch_data = parse_patch_data(&patch_data_bytes)?;

            if !patch_data_hash_matches(code, &patch_data, &suffix_data.patch_data_hash)? {
                return Err(ParseError::CommitmentMismatch);
            }

            let unique_suffix = derive_unique_suffix(code, &suffix_data)?;
            (
                OperationKind::Create {
                    suffix_data,
                    patch_data,
                },
                unique_suffix,
            )
        }
        "update" => {
            let patch_data_bytes = decode_field("delta", required("delta", &raw.delta)?)?;
            let patch_data = parse_patch_data(&patch_data_bytes)?;

            let signed_data_bytes =
                decode_field("signed_data", required("signed_data", &raw.signed_data)?)?;
            let signed_data: SignedDataUpdate = serde_json::from_slice(&signed_data_bytes)?;

            let unique_suffix = required("did_suffix", &raw.did_suffix)?.to_string();
            (
                OperationKind::Update {
                    patch_data,
                    signed_data,
                },
                unique_suffix,
            )
        }
        "recover" => {
            let patch_data_bytes = decode_field("delta", required("delta", &raw.delta)?)?;
            let patch_data = parse_patch_data(&patch_data_bytes)?;

            let signed_data_bytes =
                decode_field("signed_data", required("signed_data", &raw.signed_data)?)?;
            let signed_data: SignedDataRecover = serde_json::from_slice(&signed_data_bytes)?;

            if !patch_data_hash_matches(code, &patch_data, &signed_data.patch_data_hash)? {
                return Err(ParseError::CommitmentMismatch);
            }

            let unique_suffix = required("did_suffix", &raw.did_suffix)?.to_string();
            (
                OperationKind::Recover {
                    signed_data,
                    patch_data,
                },
                unique_suffix,
            )
        }
        "deactivate" => {
            let signed_data_bytes =
                decode_field("signed_data", required("signed_data", &raw.signed_data)?)?;
            let signed_data: SignedDataDeactivate = serde_json::from_slice(&signed_data_bytes)?;

            let unique_suffix = required("did_suffix", &raw.did_suffix)?.to_string();
            (OperationKind::Deactivate { signed_data }, unique_suffix)
        }
        other => return Err(ParseError::UnknownOperationType(other.to_string())),
    };

    let id = sidetree_core::did::compose(namespace, &unique_suffix);

    Ok(Operation {
        namespace: namespace.to_string(),
        unique_suffix,
        id,
        operation_buffer: request_bytes.to_vec(),
        hash_algorithm_code: code,
        kind,
    })
}

pub fn operation_type_of(op: &Operation) -> OperationType {
    op.operation_type()
}
