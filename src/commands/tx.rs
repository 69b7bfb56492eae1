use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use interstellar::chain::account_types::AccountInfo;
use interstellar::chain::{
    Balance, Broadcaster, ChainClient, ChainOverrides, ChainQuery, EncodingRegistry, FeeSettings,
    KeySigner, MessageIntent, MessageKind, SignedTransaction, TransactionResult, TxPipeline,
    TxRequest, WasmSwap,
};
use interstellar::config::Config;
use interstellar::TxError;

use super::{print_json, KeyArgs};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Fee, replay and submission flags shared by every transaction
#[derive(Args, Debug, Clone, Default)]
pub struct TxArgs {
    /// Fee amount (defaults to the config value)
    #[arg(long)]
    pub fee: Option<u64>,

    #[arg(long)]
    pub fee_denom: Option<String>,

    /// Gas limit
    #[arg(long)]
    pub gas: Option<u64>,

    #[arg(long)]
    pub memo: Option<String>,

    /// Skip the chain id query
    #[arg(long)]
    pub chain_id: Option<String>,

    /// Skip the account query (needs --sequence as well)
    #[arg(long)]
    pub account_number: Option<u64>,

    #[arg(long)]
    pub sequence: Option<u64>,

    /// Attempts before giving up; retries re-query the account sequence
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Print the signed transaction instead of broadcasting it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    /// Bank send
    Send {
        to: String,
        amount: u64,
        denom: String,
        #[command(flatten)]
        args: TxArgs,
    },

    /// Send the whole balance of a denom, less the fee when paid in it
    SendAll {
        to: String,
        denom: String,
        #[command(flatten)]
        args: TxArgs,
    },

    /// IBC transfer over a channel
    Transfer {
        to: String,
        amount: u64,
        denom: String,
        #[arg(long)]
        channel: String,
        #[command(flatten)]
        args: TxArgs,
    },

    /// IBC transfer of the whole balance of a denom
    TransferAll {
        to: String,
        denom: String,
        #[arg(long)]
        channel: String,
        #[command(flatten)]
        args: TxArgs,
    },

    /// Swap through a router contract
    Swap {
        contract: String,
        amount: u64,
        denom: String,
        output_denom: String,
        /// TWAP slippage percentage
        #[arg(long, default_value = "5")]
        slippage: String,
        /// TWAP window in seconds
        #[arg(long, default_value_t = 10)]
        window: u64,
        #[command(flatten)]
        args: TxArgs,
    },
}

/// A parsed command before the sender and fee are known
struct Draft {
    kind: MessageKind,
    intent: MessageIntent,
    /// Amount comes from the current balance
    whole_balance: bool,
    args: TxArgs,
}

impl TxCommand {
    fn into_draft(self, from: String) -> Result<Draft> {
        let draft = match self {
            TxCommand::Send { to, amount, denom, args } => Draft {
                kind: MessageKind::Send,
                intent: MessageIntent { from, to, amount, denom, ..Default::default() },
                whole_balance: false,
                args,
            },
            TxCommand::SendAll { to, denom, args } => Draft {
                kind: MessageKind::Send,
                intent: MessageIntent { from, to, denom, ..Default::default() },
                whole_balance: true,
                args,
            },
            TxCommand::Transfer { to, amount, denom, channel, args } => Draft {
                kind: MessageKind::Transfer,
                intent: MessageIntent {
                    from,
                    to,
                    amount,
                    denom,
                    channel: Some(channel),
                    ..Default::default()
                },
                whole_balance: false,
                args,
            },
            TxCommand::TransferAll { to, denom, channel, args } => Draft {
                kind: MessageKind::Transfer,
                intent: MessageIntent {
                    from,
                    to,
                    denom,
                    channel: Some(channel),
                    ..Default::default()
                },
                whole_balance: true,
                args,
            },
            TxCommand::Swap { contract, amount, denom, output_denom, slippage, window, args } => {
                let payload =
                    WasmSwap::new(amount, &denom, &output_denom, &slippage, window).to_json_bytes()?;
                Draft {
                    kind: MessageKind::Swap,
                    intent: MessageIntent {
                        from,
                        amount,
                        denom,
                        contract: Some(contract),
                        contract_payload: Some(payload),
                        ..Default::default()
                    },
                    whole_balance: false,
                    args,
                }
            }
        };
        Ok(draft)
    }
}

impl TxArgs {
    fn fee(&self, config: &Config) -> FeeSettings {
        FeeSettings {
            fee_amount: self.fee.unwrap_or(config.tx.fee_amount),
            fee_denom: self.fee_denom.clone().unwrap_or_else(|| config.tx.fee_denom.clone()),
            gas_limit: self.gas.unwrap_or(config.tx.gas_limit),
            memo: self.memo.clone().unwrap_or_else(|| config.tx.memo.clone()),
        }
    }

    fn overrides(&self, config: &Config) -> ChainOverrides {
        ChainOverrides {
            chain_id: self.chain_id.clone().or_else(|| config.chain.chain_id.clone()),
            account_number: self.account_number,
            sequence: self.sequence,
        }
    }
}

/// Stand-in node for dry runs that need no network
struct Offline;

#[async_trait]
impl ChainQuery for Offline {
    async fn chain_id(&self) -> interstellar::error::Result<String> {
        Err(TxError::QueryUnavailable("offline".into()))
    }

    async fn account(&self, _address: &str) -> interstellar::error::Result<AccountInfo> {
        Err(TxError::QueryUnavailable("offline".into()))
    }

    async fn all_balances(&self, _address: &str) -> interstellar::error::Result<Vec<Balance>> {
        Err(TxError::QueryUnavailable("offline".into()))
    }

    async fn balance(&self, _address: &str, _denom: &str) -> interstellar::error::Result<Balance> {
        Err(TxError::QueryUnavailable("offline".into()))
    }
}

#[async_trait]
impl Broadcaster for Offline {
    async fn broadcast(&self, _tx: &SignedTransaction) -> interstellar::error::Result<TransactionResult> {
        Err(TxError::BroadcastUnavailable("offline".into()))
    }
}

pub async fn run(command: TxCommand, config: &Config, key_args: &KeyArgs) -> Result<()> {
    let key = key_args.load(config)?;
    let from = key.address(key_args.prefix(config))?;
    let key: Arc<dyn KeySigner> = Arc::new(key);

    let draft = command.into_draft(from)?;
    let fee = draft.args.fee(config);
    let overrides = draft.args.overrides(config);

    let offline = Offline;
    let client;
    let (query, broadcaster): (&dyn ChainQuery, &dyn Broadcaster) =
        if draft.args.dry_run && overrides.is_complete() && !draft.whole_balance {
            info!("Signing offline");
            (&offline, &offline)
        } else {
            client = ChainClient::connect(config.client_config()).await?;
            (&client, &client)
        };

    let mut intent = draft.intent;
    if draft.whole_balance {
        let balance = query.balance(&intent.from, &intent.denom).await?;
        intent.amount = spendable(&balance, &fee)?;
        info!("Moving whole balance: {}{}", intent.amount, intent.denom);
    }

    let can_retry = overrides.account_number.is_none() && overrides.sequence.is_none();
    let request = TxRequest {
        kind: draft.kind,
        intent,
        fee,
        overrides,
        key,
    };

    let registry = EncodingRegistry::new();
    let mut pipeline = TxPipeline::new(&registry, query, broadcaster)
        .with_timeout(Duration::from_secs(config.chain.request_timeout))
        .with_transfer_timeout(Duration::from_secs(config.tx.transfer_timeout));

    if draft.args.dry_run {
        let resolved = pipeline.resolve(&request.intent.from, &request.overrides).await?;
        let signed = pipeline.sign(&request, &resolved)?;
        return print_json(&json!({
            "tx_bytes": BASE64.encode(&signed.bytes),
            "hash": signed.hash(),
            "chain_id": resolved.chain_id,
            "account_number": resolved.account_number,
            "sequence": resolved.sequence,
        }));
    }

    let max_attempts = draft.args.max_attempts.unwrap_or(config.tx.max_attempts).max(1);
    let attempts = if can_retry { max_attempts } else { 1 };
    let result = submit(&mut pipeline, &request, attempts, RETRY_DELAY).await?;

    print_json(&result)?;
    if !result.is_success() {
        bail!(
            "transaction rejected with code {}",
            result.code.map_or_else(|| "none".to_string(), |c| c.to_string())
        );
    }
    Ok(())
}

/// Balance left after reserving the fee when it is paid in the same denom
fn spendable(balance: &Balance, fee: &FeeSettings) -> Result<u64> {
    let held: u128 = balance.amount.parse().map_err(|_| {
        TxError::InvalidIntent(format!("unreadable {} balance {:?}", balance.denom, balance.amount))
    })?;
    let held = u64::try_from(held).map_err(|_| {
        TxError::InvalidIntent(format!("{} balance {} exceeds a u64 amount", balance.denom, held))
    })?;
    let reserve = if fee.fee_denom == balance.denom { fee.fee_amount } else { 0 };

    match held.saturating_sub(reserve) {
        0 => Err(TxError::InvalidIntent(format!(
            "nothing to move: balance {}{} with fee {}{}",
            held, balance.denom, fee.fee_amount, fee.fee_denom
        ))
        .into()),
        amount => Ok(amount),
    }
}

/// Execute with retries. Every attempt resolves the account again, so the
/// sequence signed is always the one the node currently expects.
async fn submit(
    pipeline: &mut TxPipeline<'_>,
    request: &TxRequest,
    max_attempts: u32,
    delay: Duration,
) -> Result<TransactionResult> {
    let mut attempt = 1;
    loop {
        let outcome = pipeline.execute(request).await;
        let retryable = match &outcome {
            Ok(result) => result.is_sequence_mismatch(),
            Err(e) => e.is_retryable(),
        };
        if !retryable || attempt >= max_attempts {
            return Ok(outcome?);
        }

        match &outcome {
            Ok(result) => warn!(
                "Attempt {}/{}: sequence mismatch (node expects {:?})",
                attempt,
                max_attempts,
                result.expected_sequence()
            ),
            Err(e) => warn!("Attempt {}/{} failed: {}", attempt, max_attempts, e),
        }
        attempt += 1;
        tokio::time::sleep(delay).await;
    }
}
