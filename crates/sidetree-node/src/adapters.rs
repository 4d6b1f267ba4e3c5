//! Concrete capability adapters. `sidetree-core`/`sidetree-services` only
//! define the `Cas`/`Compression` contracts; a host process supplies the
//! real implementations. These are the ones this node ships with.

use std::io::Read;

use async_trait::async_trait;
use dashmap::DashMap;
use sidetree_core::capability::{Cas, CasError, Compression, CompressionError};
use tokio_util::sync::CancellationToken;

/// A gzip `Compression` adapter, bounding decompressed output by reading at
/// most `max_output_bytes + 1` bytes so an oversized payload is caught
/// without buffering an unbounded amount of memory first.
pub struct GzipCompression;

impl Compression for GzipCompression {
    fn decompress(&self, bytes: &[u8], max_output_bytes: usize) -> Result<Vec<u8>, CompressionError> {
        let mut decoder = flate2::read::GzDecoder::new(bytes).take(max_output_bytes as u64 + 1);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CompressionError::Failed(e.to_string()))?;
        if out.len() > max_output_bytes {
            return Err(CompressionError::OutputTooLarge { max: max_output_bytes });
        }
        Ok(out)
    }
}

/// A `Cas` adapter backed by an in-memory map. Useful for local development
/// and as the seed for the node's own published content; a production
/// deployment replaces this with a real content-addressable store.
#[derive(Default)]
pub struct InMemoryCas {
    store: DashMap<String, Vec<u8>>,
}

impl InMemoryCas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, address: impl Into<String>, bytes: Vec<u8>) {
        self.store.insert(address.into(), bytes);
    }
}

#[async_trait]
impl Cas for InMemoryCas {
    async fn read(&self, address: &str, cancel: &CancellationToken) -> Result<Vec<u8>, CasError> {
        if cancel.is_cancelled() {
            return Err(CasError::Cancelled);
        }
        self.store
            .get(address)
            .map(|v| v.clone())
            .ok_or_else(|| CasError::NotFound(address.to_string()))
    }
}
