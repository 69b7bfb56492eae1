use anyhow::Result;
use clap::Subcommand;
use serde_json::{json, Value};
use tracing::debug;

use interstellar::chain::{ChainClient, ChainQuery, EncodingRegistry};
use interstellar::config::Config;

use super::{print_json, KeyArgs};

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    /// Chain id reported by the node
    ChainId,

    /// Account number, sequence and public key
    Account {
        /// Defaults to the address of the loaded key
        address: Option<String>,
    },

    /// Address derived from the key material (no network)
    Address,

    /// Balances held by an address
    Balance {
        /// Defaults to the address of the loaded key
        address: Option<String>,

        /// Only this denom; prints an explicit zero when absent
        #[arg(long)]
        denom: Option<String>,
    },
}

pub async fn run(command: QueryCommand, config: &Config, key: &KeyArgs) -> Result<()> {
    if let QueryCommand::Address = command {
        return print_json(&json!({ "address": key.address(config)? }));
    }

    let client = ChainClient::connect(config.client_config()).await?;
    let output = query(&client, command, config, key).await?;
    print_json(&output)
}

async fn query(
    node: &dyn ChainQuery,
    command: QueryCommand,
    config: &Config,
    key: &KeyArgs,
) -> Result<Value> {
    let or_own = |address: Option<String>| -> Result<String> {
        match address {
            Some(a) => Ok(a),
            None => key.address(config),
        }
    };

    let value = match command {
        QueryCommand::ChainId => json!({ "chain_id": node.chain_id().await? }),
        QueryCommand::Account { address } => {
            let address = or_own(address)?;
            debug!("Querying account {}", address);
            let account = node.account(&address).await?;

            let registry = EncodingRegistry::new();
            let pub_key = match &account.pub_key {
                Some(any) => registry.amino().marshal_json(any)?,
                None => Value::Null,
            };
            json!({
                "address": account.address,
                "account_number": account.account_number,
                "sequence": account.sequence,
                "pub_key": pub_key,
            })
        }
        QueryCommand::Address => json!({ "address": key.address(config)? }),
        QueryCommand::Balance { address, denom } => {
            let address = or_own(address)?;
            match denom {
                Some(denom) => serde_json::to_value(node.balance(&address, &denom).await?)?,
                None => serde_json::to_value(node.all_balances(&address).await?)?,
            }
        }
    };
    Ok(value)
}
