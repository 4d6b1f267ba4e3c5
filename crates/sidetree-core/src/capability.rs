//! Capability traits — the narrow interfaces through which the core
//! consumes every external collaborator it depends on: CAS, compression,
//! and signature verification. Concrete adapters are supplied by the host
//! process; this crate defines only the contract, and every entry point
//! that needs one of these capabilities takes it as an explicit argument
//! rather than reaching for ambient global state.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum CasError {
    #[error("CAS unavailable: {0}")]
    Unavailable(String),
    #[error("no content found for address {0:?}")]
    NotFound(String),
    #[error("operation cancelled")]
    Cancelled,
}

/// Read-only key -> bytes content-addressable store.
#[async_trait]
pub trait Cas: Send + Sync {
    async fn read(&self, address: &str, cancel: &CancellationToken) -> Result<Vec<u8>, CasError>;
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("unsupported compression algorithm {0:?}")]
    Unsupported(String),
    #[error("decompressed output exceeds maximum of {max} bytes")]
    OutputTooLarge { max: usize },
    #[error("decompression failed: {0}")]
    Failed(String),
}

/// Decompression capability. `max_output_bytes` bounds the *decompressed*
/// size via a streaming check, never buffering past the limit.
pub trait Compression: Send + Sync {
    fn decompress(&self, bytes: &[u8], max_output_bytes: usize) -> Result<Vec<u8>, CompressionError>;
}

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    Invalid,
    #[error("unknown key id {0:?}")]
    UnknownKeyId(String),
}

/// Signature verification capability. The core never implements a concrete
/// signature scheme; it only verifies via this trait.
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` over `payload` using the key identified by
    /// `public_key` (opaque to the core — typically a JWK).
    fn verify(
        &self,
        public_key: &serde_json::Value,
        payload: &[u8],
        signature: &str,
    ) -> Result<bool, SignatureError>;
}
