//! The shared operation data model.
//!
//! `Operation` is an envelope (namespace, suffix, id, transaction
//! coordinates, raw buffer) wrapping an `OperationKind` sum type with one
//! variant per operation kind.

use serde::{Deserialize, Serialize};

use crate::document::{PublicKeyEntry, ServiceEndpointEntry};
use crate::encoding::{canonical_serialize, encode};
use crate::multihash::{compute_multihash, HashError};

/// Discriminator for an operation's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Recover,
    Deactivate,
}

/// Create-time suffix data. Hashing this (canonically serialized) produces
/// the DID's `unique_suffix` — immutable for the life of the DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuffixData {
    pub recovery_key: serde_json::Value,
    pub next_recovery_commitment: String,
    pub patch_data_hash: String,
}

/// Patch-data: the patches to apply plus the commitment for the *next*
/// update/recover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchData {
    pub patches: Vec<Patch>,
    pub next_update_commitment: String,
}

/// The document shape a Replace patch is allowed to carry: only `publicKey`
/// and `service` top-level keys. `deny_unknown_fields` enforces the "no
/// other top-level keys" rule at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReplaceDocument {
    #[serde(default)]
    pub public_key: Vec<PublicKeyEntry>,
    #[serde(default)]
    pub service: Vec<ServiceEndpointEntry>,
}

/// A single patch, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Patch {
    Replace {
        document: ReplaceDocument,
    },
    AddPublicKeys {
        public_keys: Vec<PublicKeyEntry>,
    },
    RemovePublicKeys {
        ids: Vec<String>,
    },
    AddServices {
        service_endpoints: Vec<ServiceEndpointEntry>,
    },
    RemoveServices {
        ids: Vec<String>,
    },
}

/// Signed data accompanying an Update operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDataUpdate {
    pub update_reveal_value: String,
    /// Id of the public key (in the current document) that produced `signature`.
    pub key_id: String,
    pub signature: String,
}

/// Signed data accompanying a Recover operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDataRecover {
    pub recovery_reveal_value: String,
    pub new_recovery_key: serde_json::Value,
    pub next_recovery_commitment: String,
    pub next_update_commitment: String,
    pub patch_data_hash: String,
    pub signature: String,
}

/// Signed data accompanying a Deactivate operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDataDeactivate {
    pub recovery_reveal_value: String,
    pub signature: String,
}

/// The per-kind payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationKind {
    Create {
        suffix_data: SuffixData,
        patch_data: PatchData,
    },
    Update {
        patch_data: PatchData,
        signed_data: SignedDataUpdate,
    },
    Recover {
        signed_data: SignedDataRecover,
        patch_data: PatchData,
    },
    Deactivate {
        signed_data: SignedDataDeactivate,
    },
}

impl OperationKind {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Create { .. } => OperationType::Create,
            Self::Update { .. } => OperationType::Update,
            Self::Recover { .. } => OperationType::Recover,
            Self::Deactivate { .. } => OperationType::Deactivate,
        }
    }
}

/// Where an operation sits in the observed anchor stream. Used as the
/// ordering key for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionCoordinates {
    pub transaction_time: u64,
    pub transaction_number: u64,
    pub operation_index: u32,
}

/// A fully parsed operation: the envelope shared by every kind plus the
/// kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub namespace: String,
    pub unique_suffix: String,
    pub id: String,
    /// The raw client request bytes, preserved for replay/audit.
    #[serde(with = "bytes_as_base64")]
    pub operation_buffer: Vec<u8>,
    pub hash_algorithm_code: u64,
    pub kind: OperationKind,
}

impl Operation {
    pub fn operation_type(&self) -> OperationType {
        self.kind.operation_type()
    }
}

mod bytes_as_base64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::encoding::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        crate::encoding::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Derive `unique_suffix` from a Create's `suffix_data`:
/// `encode(multihash(code, canonical(suffix_data)))`.
pub fn derive_unique_suffix(
    hash_algorithm_code: u64,
    suffix_data: &SuffixData,
) -> Result<String, HashError> {
    let canonical =
        canonical_serialize(suffix_data).map_err(|_| HashError::InvalidMultihash("suffix_data"))?;
    let mh = compute_multihash(hash_algorithm_code, &canonical)?;
    Ok(encode(&mh))
}
