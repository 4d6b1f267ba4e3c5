//! Per-DID state machine: folds an ordered operation log into a document.
//!
//! `apply_operation` is a pure function — given the same `(state, op)` pair
//! it always produces the same next state, and never panics or returns an
//! error. An operation that fails its own validation (bad commitment, bad
//! signature, wrong lifecycle state) is simply dropped: the state comes back
//! unchanged. This is what makes replay of the same log deterministic and
//! makes the transition logic testable without touching storage.

use sidetree_core::capability::SignatureVerifier;
use sidetree_core::document::{Document, DocumentEnvelope, MethodMetadata, ResolutionResult};
use sidetree_core::multihash::reveal_matches_commitment;
use sidetree_core::operation::{Operation, OperationKind, PatchData};
use sidetree_core::protocol::Protocol;
use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("derived unique suffix does not match the suffix carried in the DID")]
    DidMismatch,
    #[error("malformed DID: {0}")]
    MalformedDid(#[from] sidetree_core::did::DidError),
    #[error("inline create request failed its own validation")]
    InvalidCreate,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Live state for one DID suffix, materialized by folding its operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidState {
    pub recovery_commitment: String,
    pub update_commitment: String,
    /// The recovery key currently in force. Needed (alongside the
    /// commitment hash) to verify the signature on the next recover or
    /// deactivate operation.
    pub current_recovery_key: serde_json::Value,
    pub document: Document,
    pub deactivated: bool,
}

fn decode_or_drop(value: &str) -> Option<Vec<u8>> {
    sidetree_core::encoding::decode(value).ok()
}

fn reveal_matches(code: u64, reveal_value: &str, commitment: &str) -> bool {
    let (Some(reveal), Some(commitment)) = (decode_or_drop(reveal_value), decode_or_drop(commitment))
    else {
        return false;
    };
    reveal_matches_commitment(code, &reveal, &commitment).unwrap_or(false)
}

/// Re-check a recover's `patch_data` against the commitment carried by its
/// `signed_data` — the same canonical-serialization convention
/// `derive_unique_suffix` and the request parser use, applied here so a
/// substituted chunk-file delta is caught on replay, not only when a client
/// submits the request directly.
fn patch_data_hash_matches(code: u64, patch_data: &PatchData, expected: &str) -> bool {
    let Ok(canonical) = sidetree_core::encoding::canonical_serialize(patch_data) else {
        return false;
    };
    let Ok(computed) = sidetree_core::multihash::compute_multihash(code, &canonical) else {
        return false;
    };
    let Some(expected) = decode_or_drop(expected) else {
        return false;
    };
    computed == expected
}

/// Fold one operation into `state`. `None` means "no Create observed yet".
pub fn apply_operation(
    state: Option<DidState>,
    op: &Operation,
    verifier: &dyn SignatureVerifier,
) -> Option<DidState> {
    match (&state, &op.kind) {
        (None, OperationKind::Create { suffix_data, patch_data }) => {
            let canonical = match sidetree_core::encoding::canonical_serialize(patch_data) {
                Ok(bytes) => bytes,
                Err(_) => return state,
            };
            let computed = match sidetree_core::multihash::compute_multihash(op.hash_algorithm_code, &canonical) {
                Ok(mh) => mh,
                Err(_) => return state,
            };
            let expected = match decode_or_drop(&suffix_data.patch_data_hash) {
                Some(bytes) => bytes,
                None => return state,
            };
            if computed != expected {
                tracing::warn!(suffix = %op.unique_suffix, "create rejected: patch_data hash mismatch");
                return state;
            }
            Some(DidState {
                recovery_commitment: suffix_data.next_recovery_commitment.clone(),
                update_commitment: patch_data.next_update_commitment.clone(),
                current_recovery_key: suffix_data.recovery_key.clone(),
                document: crate::patch::apply(&patch_data.patches, Document::empty()),
                deactivated: false,
            })
        }
        (Some(_), OperationKind::Create { .. }) => {
            tracing::debug!(suffix = %op.unique_suffix, "duplicate create ignored");
            state
        }
        (Some(current), OperationKind::Update { patch_data, signed_data }) if !current.deactivated => {
            if !reveal_matches(op.hash_algorithm_code, &signed_data.update_reveal_value, &current.update_commitment)
            {
                tracing::warn!(suffix = %op.unique_suffix, "update rejected: reveal does not match commitment");
                return state;
            }
            let Some(key) = current.document.find_public_key(&signed_data.key_id) else {
                tracing::warn!(suffix = %op.unique_suffix, key_id = %signed_data.key_id, "update rejected: unknown key id");
                return state;
            };
            let payload = match sidetree_core::encoding::canonical_serialize(signed_data) {
                Ok(p) => p,
                Err(_) => return state,
            };
            match verifier.verify(&key.public_key_jwk, &payload, &signed_data.signature) {
                Ok(true) => {
                    let mut next = current.clone();
                    next.document = crate::patch::apply(&patch_data.patches, next.document);
                    next.update_commitment = patch_data.next_update_commitment.clone();
                    Some(next)
                }
                _ => {
                    tracing::warn!(suffix = %op.unique_suffix, "update rejected: bad signature");
                    state
                }
            }
        }
        (Some(current), OperationKind::Recover { signed_data, patch_data }) if !current.deactivated => {
            if !reveal_matches(
                op.hash_algorithm_code,
                &signed_data.recovery_reveal_value,
                &current.recovery_commitment,
            ) {
                tracing::warn!(suffix = %op.unique_suffix, "recover rejected: reveal does not match commitment");
                return state;
            }
            if !patch_data_hash_matches(op.hash_algorithm_code, patch_data, &signed_data.patch_data_hash) {
                tracing::warn!(suffix = %op.unique_suffix, "recover rejected: patch_data hash mismatch");
                return state;
            }
            let payload = match sidetree_core::encoding::canonical_serialize(signed_data) {
                Ok(p) => p,
                Err(_) => return state,
            };
            match verifier.verify(&current.current_recovery_key, &payload, &signed_data.signature) {
                Ok(true) => Some(DidState {
                    recovery_commitment: signed_data.next_recovery_commitment.clone(),
                    update_commitment: signed_data.next_update_commitment.clone(),
                    current_recovery_key: signed_data.new_recovery_key.clone(),
                    document: crate::patch::apply(&patch_data.patches, Document::empty()),
                    deactivated: false,
                }),
                _ => {
                    tracing::warn!(suffix = %op.unique_suffix, "recover rejected: bad signature");
                    state
                }
            }
        }
        (Some(current), OperationKind::Deactivate { signed_data }) if !current.deactivated => {
            if !reveal_matches(
                op.hash_algorithm_code,
                &signed_data.recovery_reveal_value,
                &current.recovery_commitment,
            ) {
                tracing::warn!(suffix = %op.unique_suffix, "deactivate rejected: reveal does not match commitment");
                return state;
            }
            let payload = signed_data.recovery_reveal_value.as_bytes().to_vec();
            match verifier.verify(&current.current_recovery_key, &payload, &signed_data.signature) {
                Ok(true) => Some(DidState {
                    recovery_commitment: String::new(),
                    update_commitment: String::new(),
                    current_recovery_key: serde_json::Value::Null,
                    document: Document::empty(),
                    deactivated: true,
                }),
                _ => {
                    tracing::warn!(suffix = %op.unique_suffix, "deactivate rejected: bad signature");
                    state
                }
            }
        }
        // Deactivated is terminal; every later operation is a no-op.
        (Some(_), _) => state,
        // Update/Recover/Deactivate with no prior Create: nothing to act on.
        (None, _) => state,
    }
}

/// Fold an ordered operation log (already sorted by transaction
/// coordinates) into a `ResolutionResult`.
pub fn resolve(unique_suffix: &str, ops: &[Operation], verifier: &dyn SignatureVerifier) -> ResolutionResult {
    let final_state = ops.iter().fold(None, |state, op| apply_operation(state, op, verifier));
    let id_suffix = unique_suffix.to_string();
    match final_state {
        Some(state) if state.deactivated => ResolutionResult {
            document: DocumentEnvelope::new(id_suffix, Document::empty()),
            method_metadata: MethodMetadata {
                published: true,
                recovery_commitment: None,
                update_commitment: None,
                deactivated: true,
            },
        },
        Some(state) => ResolutionResult {
            document: DocumentEnvelope::new(id_suffix, state.document),
            method_metadata: MethodMetadata {
                published: true,
                recovery_commitment: Some(state.recovery_commitment),
                update_commitment: Some(state.update_commitment),
                deactivated: false,
            },
        },
        None => ResolutionResult {
            document: DocumentEnvelope::new(id_suffix, Document::empty()),
            method_metadata: MethodMetadata::default(),
        },
    }
}

struct RejectAllVerifier;
impl SignatureVerifier for RejectAllVerifier {
    fn verify(
        &self,
        _public_key: &serde_json::Value,
        _payload: &[u8],
        _signature: &str,
    ) -> Result<bool, sidetree_core::capability::SignatureError> {
        Err(sidetree_core::capability::SignatureError::Invalid)
    }
}

/// Resolve a DID carrying an encoded create request inline (the
/// "initial-values" path), without consulting the operation index at all.
pub fn resolve_unpublished(
    did: &str,
    initial_values: &str,
    protocol: &Protocol,
) -> Result<ResolutionResult, ProcessorError> {
    let (namespace, suffix_in_did) = sidetree_core::did::parse(did)?;
    let decoded = sidetree_core::encoding::decode(initial_values)
        .map_err(|e| ProcessorError::Parse(ParseError::InvalidEncoding {
            field: "initial_values",
            source: e,
        }))?;
    let op = crate::parser::parse_operation(namespace, &decoded, protocol)?;
    if op.unique_suffix != suffix_in_did {
        return Err(ProcessorError::DidMismatch);
    }
    let state = apply_operation(None, &op, &RejectAllVerifier).ok_or(ProcessorError::InvalidCreate)?;
    Ok(ResolutionResult {
        document: DocumentEnvelope::new(op.unique_suffix, state.document),
        method_metadata: MethodMetadata {
            published: false,
            recovery_commitment: Some(state.recovery_commitment),
            update_commitment: Some(state.update_commitment),
            deactivated: false,
        },
    })
}
