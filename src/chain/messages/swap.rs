use std::str::FromStr;

use cosmwasm_std::{Decimal, Uint128};
use serde::{Deserialize, Serialize};

use crate::chain::proto::{Coin, MsgExecuteContract};
use crate::error::{Result, TxError};

use super::MessageIntent;

/// Swap-router contract message: `{"swap": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmSwap {
    pub swap: Swap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swap {
    pub input_coin: InputCoin,
    pub output_denom: String,
    pub slippage: Slippage,
}

/// Amount is a string so large values survive JSON untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCoin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slippage {
    pub twap: Twap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Twap {
    pub slippage_percentage: String,
    pub window_seconds: u64,
}

impl WasmSwap {
    pub fn new(
        amount: u64,
        denom: &str,
        output_denom: &str,
        slippage_percentage: &str,
        window_seconds: u64,
    ) -> Self {
        Self {
            swap: Swap {
                input_coin: InputCoin {
                    denom: denom.to_string(),
                    amount: amount.to_string(),
                },
                output_denom: output_denom.to_string(),
                slippage: Slippage {
                    twap: Twap {
                        slippage_percentage: slippage_percentage.to_string(),
                        window_seconds,
                    },
                },
            },
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TxError::Encoding(e.to_string()))
    }

    /// Parse and check the payload shape.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let swap: WasmSwap = serde_json::from_slice(payload)
            .map_err(|e| TxError::InvalidIntent(format!("malformed swap payload: {}", e)))?;
        swap.validate()?;
        Ok(swap)
    }

    fn validate(&self) -> Result<()> {
        let swap = &self.swap;
        if swap.input_coin.denom.is_empty() {
            return Err(TxError::InvalidIntent("swap input denom is empty".into()));
        }
        Uint128::from_str(&swap.input_coin.amount).map_err(|e| {
            TxError::InvalidIntent(format!(
                "swap input amount {:?} is not an integer: {}",
                swap.input_coin.amount, e
            ))
        })?;
        if swap.output_denom.is_empty() {
            return Err(TxError::InvalidIntent("swap output denom is empty".into()));
        }
        Decimal::from_str(&swap.slippage.twap.slippage_percentage).map_err(|e| {
            TxError::InvalidIntent(format!(
                "slippage percentage {:?} is not a decimal: {}",
                swap.slippage.twap.slippage_percentage, e
            ))
        })?;
        Ok(())
    }
}

/// Contract-mediated swap. `intent.from` is the swap sender; when
/// `intent.amount` is set it is attached as funds and must agree with the
/// payload's input coin.
pub fn build_swap(intent: &MessageIntent) -> Result<MsgExecuteContract> {
    let contract = match intent.contract.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => return Err(TxError::InvalidIntent("swap requires a contract address".into())),
    };
    if intent.from.is_empty() {
        return Err(TxError::InvalidIntent("sender address is empty".into()));
    }
    let payload = match intent.contract_payload.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(TxError::InvalidIntent("swap payload is empty".into())),
    };
    let swap = WasmSwap::parse(payload)?;

    let mut funds = Vec::new();
    if intent.amount > 0 {
        let input = &swap.swap.input_coin;
        // Already checked by `parse`
        let input_amount = Uint128::from_str(&input.amount)
            .map_err(|e| TxError::InvalidIntent(e.to_string()))?;
        if input.denom != intent.denom || input_amount != Uint128::from(intent.amount) {
            return Err(TxError::InvalidIntent(format!(
                "funds {}{} do not match swap input {}{}",
                intent.amount, intent.denom, input.amount, input.denom
            )));
        }
        funds.push(Coin {
            denom: intent.denom.clone(),
            amount: intent.amount.to_string(),
        });
    }

    Ok(MsgExecuteContract {
        sender: intent.from.clone(),
        contract: contract.to_string(),
        msg: payload.to_vec(),
        funds,
    })
}
