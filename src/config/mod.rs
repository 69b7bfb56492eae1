use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chain::wallet::{DEFAULT_HD_PATH, DEFAULT_PREFIX};
use crate::chain::ClientConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub tx: TxConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub grpc_endpoint: String,
    // Queried from the node when unset
    pub chain_id: Option<String>,
    pub address_prefix: String,
    pub hd_path: String,
    /// Seconds
    pub connection_timeout: u64,
    /// Seconds
    pub request_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    pub fee_amount: u64,
    pub fee_denom: String,
    pub gas_limit: u64,
    pub memo: String,
    /// Seconds added to the current time for IBC transfer timeouts
    pub transfer_timeout: u64,
    /// 1 = no retry
    pub max_attempts: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            grpc_endpoint: "http://localhost:9090".to_string(),
            chain_id: None,
            address_prefix: DEFAULT_PREFIX.to_string(),
            hd_path: DEFAULT_HD_PATH.to_string(),
            connection_timeout: 10,
            request_timeout: 30,
        }
    }
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            fee_amount: 5000,
            fee_denom: "uatom".to_string(),
            gas_limit: 200_000,
            memo: String::new(),
            transfer_timeout: 600,
            max_attempts: 1,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given; otherwise the default location, falling back
    /// to defaults when that file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => match default_path() {
                Some(p) if p.exists() => Self::load(p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            grpc_endpoint: self.chain.grpc_endpoint.clone(),
            connection_timeout: Duration::from_secs(self.chain.connection_timeout),
            request_timeout: Duration::from_secs(self.chain.request_timeout),
        }
    }
}

/// `<config dir>/interstellar/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("interstellar").join("config.toml"))
}
