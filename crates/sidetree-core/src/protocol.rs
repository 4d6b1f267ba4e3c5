//! Protocol parameters, resolved per namespace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::multihash::SHA2_256;

/// Compression algorithm identifiers a `Compression` capability may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    Gzip,
    None,
}

/// Protocol parameters in force for a namespace at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub hash_algorithm_code: u64,
    pub max_operation_byte_size: usize,
    pub max_anchor_file_size: usize,
    pub max_map_file_size: usize,
    pub max_chunk_file_size: usize,
    pub max_operations_per_batch: usize,
    pub compression_algorithm: CompressionAlgorithm,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            hash_algorithm_code: SHA2_256,
            max_operation_byte_size: 2_000,
            max_anchor_file_size: 1_000_000,
            max_map_file_size: 1_000_000,
            max_chunk_file_size: 10_000_000,
            max_operations_per_batch: 10_000,
            compression_algorithm: CompressionAlgorithm::Gzip,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("no protocol registered for namespace {0:?}")]
    UnknownNamespace(String),
}

/// A read-only view onto a namespace's current protocol parameters.
/// Protocol parameters can change over time (e.g. at an activation epoch);
/// `current()` always returns the parameters in force right now.
pub trait ProtocolView: Send + Sync {
    fn current(&self) -> Protocol;
}

/// Resolves a namespace to its `ProtocolView`. Implementations are supplied
/// by the host process — the core never looks this up through ambient
/// global state.
pub trait ProtocolClient: Send + Sync {
    fn for_namespace(&self, namespace: &str) -> Result<Box<dyn ProtocolView>, ProtocolError>;
}

/// A `ProtocolClient` backed by a fixed table of namespace -> `Protocol`,
/// useful for tests and for single-protocol-epoch deployments.
#[derive(Clone, Default)]
pub struct StaticProtocolClient {
    table: std::collections::HashMap<String, Protocol>,
}

impl StaticProtocolClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>, protocol: Protocol) -> Self {
        self.table.insert(namespace.into(), protocol);
        self
    }
}

struct FixedProtocolView(Protocol);

impl ProtocolView for FixedProtocolView {
    fn current(&self) -> Protocol {
        self.0.clone()
    }
}

impl ProtocolClient for StaticProtocolClient {
    fn for_namespace(&self, namespace: &str) -> Result<Box<dyn ProtocolView>, ProtocolError> {
        self.table
            .get(namespace)
            .cloned()
            .map(|p| Box::new(FixedProtocolView(p)) as Box<dyn ProtocolView>)
            .ok_or_else(|| ProtocolError::UnknownNamespace(namespace.to_string()))
    }
}
