//! Batch assembly: turns one observed anchor transaction into the ordered
//! list of operations it implies.
//!
//! Every CAS read and decompression call is given a cancellation token, and
//! any failure along the way — CAS, decompression, parse, size, or count —
//! rejects the whole batch. There is no partial commit.

use std::sync::Arc;

use sidetree_core::capability::{Cas, CasError, Compression, CompressionError};
use sidetree_core::multihash::HashError;
use sidetree_core::operation::{derive_unique_suffix, Operation, OperationKind, PatchData};
use sidetree_core::protocol::{Protocol, ProtocolClient, ProtocolError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::files::{AnchorFile, ChunkFile, FileError, MapFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorTransaction {
    pub anchor_string: String,
    pub namespace: String,
    pub transaction_time: u64,
    pub transaction_number: u64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("malformed anchor string {0:?}")]
    InvalidAnchorString(String),
    #[error(transparent)]
    UnknownNamespace(#[from] ProtocolError),
    #[error(transparent)]
    Cas(#[from] CasError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("assembled {actual} operations but anchor string declared {expected}")]
    CountMismatch { expected: u64, actual: u64 },
    #[error("batch assembly cancelled")]
    Cancelled,
}

/// Parse `<decimal_count>.<content_address>`. Leading zeros in the count
/// (other than the literal value `0`) are rejected.
fn parse_anchor_string(anchor_string: &str) -> Result<(u64, &str), ProviderError> {
    let (count_str, address) = anchor_string
        .split_once('.')
        .ok_or_else(|| ProviderError::InvalidAnchorString(anchor_string.to_string()))?;
    if count_str.is_empty() || address.is_empty() {
        return Err(ProviderError::InvalidAnchorString(anchor_string.to_string()));
    }
    if count_str.len() > 1 && count_str.starts_with('0') {
        return Err(ProviderError::InvalidAnchorString(anchor_string.to_string()));
    }
    let count: u64 = count_str
        .parse()
        .map_err(|_| ProviderError::InvalidAnchorString(anchor_string.to_string()))?;
    Ok((count, address))
}

async fn fetch_and_decompress(
    cas: &dyn Cas,
    compression: &dyn Compression,
    address: &str,
    max_size: usize,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ProviderError> {
    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }
    let raw = cas.read(address, cancel).await?;
    if raw.len() > max_size {
        return Err(ProviderError::Compression(CompressionError::OutputTooLarge { max: max_size }));
    }
    if cancel.is_cancelled() {
        return Err(ProviderError::Cancelled);
    }
    let decompressed = compression.decompress(&raw, max_size)?;
    Ok(decompressed)
}

fn unique_suffix_for_create(
    hash_algorithm_code: u64,
    suffix_data: &sidetree_core::operation::SuffixData,
) -> Result<String, ProviderError> {
    Ok(derive_unique_suffix(hash_algorithm_code, suffix_data)?)
}

/// Assemble the ordered list of operations implied by one observed anchor
/// transaction. Pure given its inputs: identical arguments always produce
/// an identical result (or an identical error).
#[tracing::instrument(skip(cas, compression, protocol_client, cancel), fields(anchor = %transaction.anchor_string))]
pub async fn assemble_operations(
    transaction: &AnchorTransaction,
    cas: Arc<dyn Cas>,
    compression: Arc<dyn Compression>,
    protocol_client: Arc<dyn ProtocolClient>,
    cancel: &CancellationToken,
) -> Result<Vec<Operation>, ProviderError> {
    let (declared_op_count, anchor_address) = parse_anchor_string(&transaction.anchor_string)?;

    let protocol_view = protocol_client.for_namespace(&transaction.namespace)?;
    let protocol: Protocol = protocol_view.current();

    let anchor_bytes = fetch_and_decompress(
        cas.as_ref(),
        compression.as_ref(),
        anchor_address,
        protocol.max_anchor_file_size,
        cancel,
    )
    .await?;
    let anchor_file = AnchorFile::parse(&anchor_bytes, protocol.max_anchor_file_size)?;

    let mut operations = Vec::new();

    if anchor_file.is_deactivate_only() {
        for entry in &anchor_file.deactivate_operations {
            operations.push(build_operation(
                &transaction.namespace,
                entry.did_suffix.clone(),
                protocol.hash_algorithm_code,
                &serde_json::to_vec(entry).unwrap_or_default(),
                OperationKind::Deactivate {
                    signed_data: entry.signed_data.clone(),
                },
            ));
        }
        return finish(operations, declared_op_count);
    }

    let map_file_hash = anchor_file
        .map_file_hash
        .as_deref()
        .expect("map_file_hash present: checked via is_deactivate_only above");

    let map_bytes = fetch_and_decompress(
        cas.as_ref(),
        compression.as_ref(),
        map_file_hash,
        protocol.max_map_file_size,
        cancel,
    )
    .await?;
    let map_file = MapFile::parse(&map_bytes, protocol.max_map_file_size)?;

    let chunk_bytes = fetch_and_decompress(
        cas.as_ref(),
        compression.as_ref(),
        &map_file.first_chunk().chunk_file_hash,
        protocol.max_chunk_file_size,
        cancel,
    )
    .await?;
    let chunk_file = ChunkFile::parse(&chunk_bytes, protocol.max_chunk_file_size)?;

    let mut deltas = chunk_file.deltas.into_iter();
    let mut next_delta = |count: usize| -> Result<PatchData, ProviderError> {
        deltas.next().ok_or(ProviderError::CountMismatch {
            expected: declared_op_count,
            actual: count as u64,
        })
    };

    for entry in &anchor_file.create_operations {
        let patch_data = next_delta(operations.len())?;
        let unique_suffix = unique_suffix_for_create(protocol.hash_algorithm_code, &entry.suffix_data)?;
        operations.push(build_operation(
            &transaction.namespace,
            unique_suffix,
            protocol.hash_algorithm_code,
            &serde_json::to_vec(entry).unwrap_or_default(),
            OperationKind::Create {
                suffix_data: entry.suffix_data.clone(),
                patch_data,
            },
        ));
    }
    for entry in &anchor_file.recover_operations {
        let patch_data = next_delta(operations.len())?;
        operations.push(build_operation(
            &transaction.namespace,
            entry.did_suffix.clone(),
            protocol.hash_algorithm_code,
            &serde_json::to_vec(entry).unwrap_or_default(),
            OperationKind::Recover {
                signed_data: entry.signed_data.clone(),
                patch_data,
            },
        ));
    }
    for entry in &map_file.update_operations {
        let patch_data = next_delta(operations.len())?;
        operations.push(build_operation(
            &transaction.namespace,
            entry.did_suffix.clone(),
            protocol.hash_algorithm_code,
            &serde_json::to_vec(entry).unwrap_or_default(),
            OperationKind::Update {
                patch_data,
                signed_data: entry.signed_data.clone(),
            },
        ));
    }
    for entry in &anchor_file.deactivate_operations {
        operations.push(build_operation(
            &transaction.namespace,
            entry.did_suffix.clone(),
            protocol.hash_algorithm_code,
            &serde_json::to_vec(entry).unwrap_or_default(),
            OperationKind::Deactivate {
                signed_data: entry.signed_data.clone(),
            },
        ));
    }

    finish(operations, declared_op_count)
}

fn build_operation(
    namespace: &str,
    unique_suffix: String,
    hash_algorithm_code: u64,
    operation_buffer: &[u8],
    kind: OperationKind,
) -> Operation {
    let id = sidetree_core::did::compose(namespace, &unique_suffix);
    Operation {
        namespace: namespace.to_string(),
        unique_suffix,
        id,
        operation_buffer: operation_buffer.to_vec(),
        hash_algorithm_code,
        kind,
    }
}

fn finish(operations: Vec<Operation>, declared_op_count: u64) -> Result<Vec<Operation>, ProviderError> {
    if operations.len() as u64 != declared_op_count {
        return Err(ProviderError::CountMismatch {
            expected: declared_op_count,
            actual: operations.len() as u64,
        });
    }
    Ok(operations)
}
