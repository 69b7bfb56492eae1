use crate::chain::proto::{Coin, MsgSend};
use crate::error::{Result, TxError};

use super::MessageIntent;

/// Bank send. Channel and contract fields are ignored.
pub fn build_send(intent: &MessageIntent) -> Result<MsgSend> {
    require_addresses(intent)?;
    let amount = require_coin(intent)?;

    Ok(MsgSend {
        from_address: intent.from.clone(),
        to_address: intent.to.clone(),
        amount: vec![amount],
    })
}

pub(super) fn require_addresses(intent: &MessageIntent) -> Result<()> {
    if intent.from.is_empty() {
        return Err(TxError::InvalidIntent("sender address is empty".into()));
    }
    if intent.to.is_empty() {
        return Err(TxError::InvalidIntent("recipient address is empty".into()));
    }
    Ok(())
}

pub(super) fn require_coin(intent: &MessageIntent) -> Result<Coin> {
    if intent.amount == 0 {
        return Err(TxError::InvalidIntent("amount must be greater than zero".into()));
    }
    if intent.denom.is_empty() {
        return Err(TxError::InvalidIntent("denom is empty".into()));
    }
    Ok(Coin {
        denom: intent.denom.clone(),
        amount: intent.amount.to_string(),
    })
}
