use crate::chain::proto::MsgTransfer;
use crate::error::{Result, TxError};

use super::send::{require_addresses, require_coin};
use super::MessageIntent;

/// ICS-20 port used for fungible token transfers
pub const TRANSFER_PORT: &str = "transfer";

/// IBC transfer over `intent.channel`.
///
/// The timeout is left at zero here; the transaction builder stamps its
/// default when assembling.
pub fn build_transfer(intent: &MessageIntent) -> Result<MsgTransfer> {
    let channel = match intent.channel.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => return Err(TxError::InvalidIntent("transfer requires a channel".into())),
    };
    require_addresses(intent)?;
    let token = require_coin(intent)?;

    Ok(MsgTransfer {
        source_port: TRANSFER_PORT.to_string(),
        source_channel: channel.to_string(),
        token: Some(token),
        sender: intent.from.clone(),
        receiver: intent.to.clone(),
        timeout_height: None,
        timeout_timestamp: 0,
        memo: String::new(),
    })
}
