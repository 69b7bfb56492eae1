pub mod query;
pub mod tx;

pub use query::QueryCommand;
pub use tx::TxCommand;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use interstellar::chain::LocalKey;
use interstellar::config::Config;
use interstellar::TxError;

/// Node connection flags, shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct NodeArgs {
    /// gRPC endpoint, e.g. https://grpc.cosmos.network:443
    #[arg(long, global = true)]
    pub grpc: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl NodeArgs {
    /// Flags win over the config file
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(grpc) = &self.grpc {
            config.chain.grpc_endpoint = grpc.clone();
        }
        if let Some(timeout) = self.timeout {
            config.chain.request_timeout = timeout;
        }
        config
    }
}

/// Where the signing key comes from
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Hex-encoded secp256k1 private key
    #[arg(long, global = true, env = "INTERSTELLAR_PRIVKEY", hide_env_values = true)]
    pub privkey: Option<String>,

    /// Environment variable holding a BIP39 mnemonic
    #[arg(long, global = true, default_value = "INTERSTELLAR_MNEMONIC")]
    pub mnemonic_env: String,

    /// Bech32 address prefix (defaults to the config value)
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// HD derivation path for mnemonics (defaults to the config value)
    #[arg(long, global = true)]
    pub hd_path: Option<String>,
}

impl KeyArgs {
    pub fn load(&self, config: &Config) -> Result<LocalKey> {
        if let Some(hex_key) = &self.privkey {
            return Ok(LocalKey::from_hex(hex_key)?);
        }
        match std::env::var(&self.mnemonic_env) {
            Ok(phrase) => {
                let hd_path = self.hd_path.as_deref().unwrap_or(&config.chain.hd_path);
                Ok(LocalKey::from_mnemonic(&phrase, "", hd_path)?)
            }
            Err(_) => Err(TxError::SigningUnavailable(format!(
                "no key material: pass --privkey or set {}",
                self.mnemonic_env
            ))
            .into()),
        }
    }

    pub fn prefix<'a>(&'a self, config: &'a Config) -> &'a str {
        self.prefix.as_deref().unwrap_or(&config.chain.address_prefix)
    }

    /// Load the key and derive its address
    pub fn address(&self, config: &Config) -> Result<String> {
        let key = self.load(config)?;
        key.address(self.prefix(config))
            .context("deriving address from key")
    }
}

/// Every command prints exactly one JSON value on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
