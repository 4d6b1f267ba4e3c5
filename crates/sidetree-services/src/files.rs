//! Anchor/Map/Chunk file model.
//!
//! Each file type parses from an already-decompressed byte buffer. A parse
//! failure is always fatal for the enclosing batch — never retried, never
//! partially applied.

use serde::{Deserialize, Serialize};
use sidetree_core::operation::{PatchData, SignedDataDeactivate, SignedDataRecover, SignedDataUpdate, SuffixData};
use thiserror::Error;

use crate::patch::{validate_patches, PatchError};

#[derive(Debug, Error)]
pub enum FileError {
    #[error("malformed file JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("map_file_hash is present but not a syntactically valid content address")]
    InvalidMapFileHash,
    #[error("map file must reference at least one chunk file")]
    MissingChunkReference,
    #[error("chunk delta failed to decode or parse: {0}")]
    InvalidDelta(String),
    #[error("file size {actual} exceeds maximum of {max} bytes")]
    TooLarge { actual: usize, max: usize },
    #[error("invalid patch in chunk delta: {0}")]
    InvalidPatch(#[from] PatchError),
}

fn is_syntactically_valid_content_address(address: &str) -> bool {
    !address.trim().is_empty()
}

fn enforce_size(bytes: &[u8], max: usize) -> Result<(), FileError> {
    if bytes.len() > max {
        return Err(FileError::TooLarge {
            actual: bytes.len(),
            max,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFileCreateEntry {
    pub suffix_data: SuffixData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFileRecoverEntry {
    pub did_suffix: String,
    pub signed_data: SignedDataRecover,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFileDeactivateEntry {
    pub did_suffix: String,
    pub signed_data: SignedDataDeactivate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorFile {
    #[serde(default)]
    pub map_file_hash: Option<String>,
    #[serde(default)]
    pub create_operations: Vec<AnchorFileCreateEntry>,
    #[serde(default)]
    pub recover_operations: Vec<AnchorFileRecoverEntry>,
    #[serde(default)]
    pub deactivate_operations: Vec<AnchorFileDeactivateEntry>,
}

impl AnchorFile {
    pub fn parse(bytes: &[u8], max_size: usize) -> Result<Self, FileError> {
        enforce_size(bytes, max_size)?;
        let file: AnchorFile = serde_json::from_slice(bytes)?;
        if let Some(hash) = &file.map_file_hash {
            if !is_syntactically_valid_content_address(hash) {
                return Err(FileError::InvalidMapFileHash);
            }
        }
        Ok(file)
    }

    /// True when this batch contains only deactivate operations (no map
    /// file).
    pub fn is_deactivate_only(&self) -> bool {
        self.map_file_hash.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFileUpdateEntry {
    pub did_suffix: String,
    pub signed_data: SignedDataUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFileReference {
    pub chunk_file_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFile {
    #[serde(default)]
    pub chunks: Vec<ChunkFileReference>,
    #[serde(default)]
    pub update_operations: Vec<MapFileUpdateEntry>,
}

impl MapFile {
    pub fn parse(bytes: &[u8], max_size: usize) -> Result<Self, FileError> {
        enforce_size(bytes, max_size)?;
        let file: MapFile = serde_json::from_slice(bytes)?;
        if file.chunks.is_empty() {
            return Err(FileError::MissingChunkReference);
        }
        Ok(file)
    }

    /// The first chunk reference. Only the first chunk is consumed;
    /// multi-chunk batches are not yet supported.
    pub fn first_chunk(&self) -> &ChunkFileReference {
        &self.chunks[0]
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawChunkFile {
    #[serde(default)]
    deltas: Vec<String>,
}

/// A parsed chunk file: deltas are eagerly decoded and parsed into
/// `PatchData` so replay never has to re-parse.
#[derive(Debug, Clone, Default)]
pub struct ChunkFile {
    pub deltas: Vec<PatchData>,
}

impl ChunkFile {
    pub fn parse(bytes: &[u8], max_size: usize) -> Result<Self, FileError> {
        enforce_size(bytes, max_size)?;
        let raw: RawChunkFile = serde_json::from_slice(bytes)?;
        let mut deltas = Vec::with_capacity(raw.deltas.len());
        for (i, encoded) in raw.deltas.iter().enumerate() {
            let decoded = sidetree_core::encoding::decode(encoded)
                .map_err(|e| FileError::InvalidDelta(format!("delta[{i}]: {e}")))?;
            let patch_data: PatchData = serde_json::from_slice(&decoded)
                .map_err(|e| FileError::InvalidDelta(format!("delta[{i}]: {e}")))?;
            validate_patches(&patch_data.patches)?;
            deltas.push(patch_data);
        }
        Ok(Self { deltas })
    }
}
