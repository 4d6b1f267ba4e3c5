//! Configuration system for the node.
//!
//! Resolution order: environment variables -> config file -> defaults.
//!
//! Config file location:
//!   1. $SIDETREE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/sidetree/config.toml
//!   3. ~/.config/sidetree/config.toml

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sidetree_core::multihash::SHA2_256;
use sidetree_core::protocol::{CompressionAlgorithm, Protocol};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub namespace: NamespaceConfig,
    pub protocol: ProtocolConfig,
    pub concurrency: ConcurrencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// The DID namespace this node serves, e.g. `did:example`.
    pub name: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            name: "did:example".to_string(),
        }
    }
}

/// Mirrors `sidetree_core::protocol::Protocol` field-for-field so it can be
/// loaded from TOML and converted with `ProtocolConfig::to_protocol`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub hash_algorithm_code: u64,
    pub max_operation_byte_size: usize,
    pub max_anchor_file_size: usize,
    pub max_map_file_size: usize,
    pub max_chunk_file_size: usize,
    pub max_operations_per_batch: usize,
    pub compression_algorithm: CompressionAlgorithm,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let defaults = Protocol::default();
        Self {
            hash_algorithm_code: defaults.hash_algorithm_code,
            max_operation_byte_size: defaults.max_operation_byte_size,
            max_anchor_file_size: defaults.max_anchor_file_size,
            max_map_file_size: defaults.max_map_file_size,
            max_chunk_file_size: defaults.max_chunk_file_size,
            max_operations_per_batch: defaults.max_operations_per_batch,
            compression_algorithm: defaults.compression_algorithm,
        }
    }
}

impl ProtocolConfig {
    pub fn to_protocol(&self) -> Protocol {
        Protocol {
            hash_algorithm_code: self.hash_algorithm_code,
            max_operation_byte_size: self.max_operation_byte_size,
            max_anchor_file_size: self.max_anchor_file_size,
            max_map_file_size: self.max_map_file_size,
            max_chunk_file_size: self.max_chunk_file_size,
            max_operations_per_batch: self.max_operations_per_batch,
            compression_algorithm: self.compression_algorithm,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Upper bound on batches assembled concurrently. 0 = number of CPUs.
    pub max_concurrent_batches: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_batches: 0,
        }
    }
}

impl ConcurrencyConfig {
    pub fn resolved_max_concurrent_batches(&self) -> usize {
        if self.max_concurrent_batches == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            self.max_concurrent_batches
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            namespace: NamespaceConfig::default(),
            protocol: ProtocolConfig::default(),
            concurrency: ConcurrencyConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("sidetree")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

impl NodeConfig {
    /// Load config: env vars -> file -> defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            NodeConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn file_path() -> PathBuf {
        std::env::var("SIDETREE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&NodeConfig::default()).map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SIDETREE_NAMESPACE") {
            self.namespace.name = v;
        }
        if let Ok(v) = std::env::var("SIDETREE_CONCURRENCY__MAX_CONCURRENT_BATCHES") {
            if let Ok(n) = v.parse() {
                self.concurrency.max_concurrent_batches = n;
            }
        }
        if let Ok(v) = std::env::var("SIDETREE_PROTOCOL__HASH_ALGORITHM_CODE") {
            if let Ok(code) = v.parse() {
                self.protocol.hash_algorithm_code = code;
            }
        }
    }
}
