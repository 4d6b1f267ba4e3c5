//! Multihash — self-describing content hashes.
//!
//! A multihash is `[algorithm code: varint][digest length: varint][digest]`.
//! Only single-byte codes/lengths are needed for the algorithms this crate
//! supports, so encoding is a flat `Vec<u8>` build rather than a general
//! varint implementation.

use thiserror::Error;

/// Multihash code for SHA-256. Required by every protocol.
pub const SHA2_256: u64 = 0x12; // 18, per the multihash table
/// Multihash code for BLAKE3-256 (non-standard but registered in the
/// multiformats table as an experimental code). Offered as a faster
/// alternative for namespaces that opt into it.
pub const BLAKE3_256: u64 = 0x1e;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("unsupported hash algorithm code {0}")]
    UnsupportedHash(u64),
    #[error("invalid multihash bytes: {0}")]
    InvalidMultihash(&'static str),
}

/// One supported hash algorithm, identified by its multihash code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn code(self) -> u64 {
        match self {
            Self::Sha256 => SHA2_256,
            Self::Blake3 => BLAKE3_256,
        }
    }

    pub fn from_code(code: u64) -> Result<Self, HashError> {
        match code {
            SHA2_256 => Ok(Self::Sha256),
            BLAKE3_256 => Ok(Self::Blake3),
            other => Err(HashError::UnsupportedHash(other)),
        }
    }

    fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => {
                use sha2::{Digest, Sha256};
                Sha256::digest(bytes).to_vec()
            }
            Self::Blake3 => blake3::hash(bytes).as_bytes().to_vec(),
        }
    }
}

/// Compute the multihash bytes for `bytes` under `code`.
///
/// Deterministic: calling this twice on the same input yields identical
/// output. Fails with `UnsupportedHash` for an unknown code.
pub fn compute_multihash(code: u64, bytes: &[u8]) -> Result<Vec<u8>, HashError> {
    let algo = HashAlgorithm::from_code(code)?;
    let digest = algo.digest(bytes);
    let mut out = Vec::with_capacity(digest.len() + 2);
    out.push(code as u8);
    out.push(digest.len() as u8);
    out.extend_from_slice(&digest);
    Ok(out)
}

/// Split a multihash into `(code, length, digest)`.
pub fn decode_multihash(multihash: &[u8]) -> Result<(u64, u8, &[u8]), HashError> {
    let &[code, len, ref digest @ ..] = multihash else {
        return Err(HashError::InvalidMultihash("multihash too short"));
    };
    if digest.len() != len as usize {
        return Err(HashError::InvalidMultihash("digest length mismatch"));
    }
    Ok((code as u64, len, digest))
}

/// Verify that `reveal` hashes (under `code`) to the same multihash as
/// `commitment`. Used for every commit/reveal check in the state machine.
pub fn reveal_matches_commitment(
    code: u64,
    reveal: &[u8],
    commitment: &[u8],
) -> Result<bool, HashError> {
    let computed = compute_multihash(code, reveal)?;
    Ok(computed == commitment)
}
