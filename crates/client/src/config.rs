use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use onboard_types::{Address, SignatureAlgorithm};

use crate::finality::FinalityPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything an account-creation run needs besides the new account's keys.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Node address, `host:port`.
    pub endpoint: String,
    pub payer: PayerConfig,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub finality: FinalityConfig,
}

/// The existing account that proposes, pays for and signs the transaction.
#[derive(Clone, Deserialize, Serialize)]
pub struct PayerConfig {
    pub address: Address,
    /// Hex-encoded private key.
    pub private_key: String,
    pub signature_algorithm: SignatureAlgorithm,
    #[serde(default)]
    pub key_index: u32,
}

impl fmt::Debug for PayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayerConfig")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("signature_algorithm", &self.signature_algorithm)
            .field("key_index", &self.key_index)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FinalityConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_gas_limit() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl FinalityConfig {
    pub fn policy(&self) -> FinalityPolicy {
        FinalityPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint is empty".into()));
        }
        if self.payer.private_key.trim().is_empty() {
            return Err(ConfigError::Invalid("payer.private_key is empty".into()));
        }
        if self.gas_limit == 0 {
            return Err(ConfigError::Invalid("gas_limit must be positive".into()));
        }
        let f = &self.finality;
        if f.timeout_ms == 0 || f.initial_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "finality timeout and backoff must be positive".into(),
            ));
        }
        if f.max_backoff_ms < f.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "finality.max_backoff_ms is below initial_backoff_ms".into(),
            ));
        }
        Ok(())
    }
}
