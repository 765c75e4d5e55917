//! Verifier configuration
//!
//! All limits the verifiers enforce live here. Defaults match the ledger's
//! consensus constants; a JSON file can override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// 1 MiB
pub const MIB: usize = 1024 * 1024;

/// Maximum actions in one batch
pub const MAX_BATCH_SIZE: usize = 256;

/// Maximum object, region and function-name length in bytes
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum drift between the time quorum median and block time (5 minutes)
pub const MAX_TIME_DRIFT_SECS: u64 = 5 * 60;

/// Maximum size of attested data
pub const MAX_ATTESTATION_DATA: usize = 1024;

/// Minimum number of verified Roughtime stamps
pub const MIN_TIME_QUORUM: usize = 3;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("time server {server_id}: public key must be 32 hex-encoded bytes")]
    InvalidServerKey { server_id: String },

    #[error("duplicate time server {0}")]
    DuplicateServer(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Aggregate limits for a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLimits {
    /// Maximum number of actions
    pub max_actions: usize,
    /// Total code + storage + parameter bytes across the batch
    pub max_total_bytes: usize,
    /// Total SendEvent actions across the batch
    pub max_events: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_actions: MAX_BATCH_SIZE,
            max_total_bytes: 16 * MIB,
            max_events: MAX_BATCH_SIZE,
        }
    }
}

/// A trusted Roughtime server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeServer {
    pub server_id: String,
    /// Hex-encoded ed25519 public key
    pub public_key: String,
}

impl TimeServer {
    pub fn new(server_id: impl Into<String>, public_key: &[u8; 32]) -> Self {
        Self {
            server_id: server_id.into(),
            public_key: hex::encode(public_key),
        }
    }

    /// Decode the hex public key
    pub fn key_bytes(&self) -> Result<[u8; 32], ConfigError> {
        hex::decode(&self.public_key)
            .ok()
            .and_then(|b| <[u8; 32]>::try_from(b.as_slice()).ok())
            .ok_or_else(|| ConfigError::InvalidServerKey {
                server_id: self.server_id.clone(),
            })
    }
}

/// Time quorum settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Minimum verified stamps before a median is trusted
    pub min_quorum: usize,
    /// Allowed |median - block_time| in seconds
    pub max_drift_secs: u64,
    /// Trusted Roughtime servers
    pub servers: Vec<TimeServer>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            min_quorum: MIN_TIME_QUORUM,
            max_drift_secs: MAX_TIME_DRIFT_SECS,
            servers: Vec::new(),
        }
    }
}

/// Top-level verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub max_code_size: usize,
    pub max_storage_size: usize,
    pub max_id_length: usize,
    pub max_function_length: usize,
    pub max_attestation_data: usize,
    /// Declared downstream routes per event
    pub max_routes_per_event: usize,
    pub batch: BatchLimits,
    pub time: TimeConfig,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_code_size: MIB,
            max_storage_size: MIB,
            max_id_length: MAX_ID_LENGTH,
            max_function_length: MAX_ID_LENGTH,
            max_attestation_data: MAX_ATTESTATION_DATA,
            max_routes_per_event: 16,
            batch: BatchLimits::default(),
            time: TimeConfig::default(),
        }
    }
}

impl VerifierConfig {
    /// Default limits with the given trusted time servers
    pub fn with_time_servers(servers: Vec<TimeServer>) -> Self {
        Self {
            time: TimeConfig {
                servers,
                ..TimeConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        log::info!(
            "Loaded verifier config from {} ({} time servers)",
            path.as_ref().display(),
            config.time.servers.len()
        );
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject configurations that would make verification meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time.min_quorum == 0 {
            return Err(ConfigError::Invalid("time.min_quorum must be at least 1".into()));
        }
        if self.batch.max_actions == 0 || self.batch.max_actions > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "batch.max_actions must be in 1..={}",
                MAX_BATCH_SIZE
            )));
        }
        if self.max_id_length == 0 || self.max_id_length > u16::MAX as usize {
            return Err(ConfigError::Invalid("max_id_length out of range".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for server in &self.time.servers {
            server.key_bytes()?;
            if !seen.insert(server.server_id.as_str()) {
                return Err(ConfigError::DuplicateServer(server.server_id.clone()));
            }
        }
        Ok(())
    }
}
