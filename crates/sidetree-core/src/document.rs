//! DID document model — the state a resolved DID folds to.

use serde::{Deserialize, Serialize};

/// A public key entry in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base-encoded public key material.
    pub public_key_jwk: serde_json::Value,
    #[serde(default)]
    pub purposes: Vec<String>,
}

/// A service endpoint entry in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpointEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub endpoint_type: String,
    pub service_endpoint: String,
}

/// The DID document produced by folding an operation history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<PublicKeyEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<ServiceEndpointEntry>,
}

impl Document {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn find_public_key(&self, id: &str) -> Option<&PublicKeyEntry> {
        self.public_key.iter().find(|k| k.id == id)
    }
}

/// Method-level metadata returned alongside a resolved document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMetadata {
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_commitment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_commitment: Option<String>,
    #[serde(default)]
    pub deactivated: bool,
}

/// The envelope produced on resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub document: DocumentEnvelope,
    pub method_metadata: MethodMetadata,
}

/// `document` carries `id` alongside the folded public keys/services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public_key: Vec<PublicKeyEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<ServiceEndpointEntry>,
}

impl DocumentEnvelope {
    pub fn new(id: String, document: Document) -> Self {
        Self {
            id,
            public_key: document.public_key,
            service: document.service,
        }
    }
}
