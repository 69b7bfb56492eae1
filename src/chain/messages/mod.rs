mod send;
mod swap;
mod transfer;

pub use send::build_send;
pub use swap::{build_swap, InputCoin, Slippage, Swap, Twap, WasmSwap};
pub use transfer::{build_transfer, TRANSFER_PORT};

use prost::Message;

use crate::chain::proto::{type_urls, Any, MsgExecuteContract, MsgSend, MsgTransfer};
use crate::error::Result;

/// What the user wants to happen, independent of signing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageIntent {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub denom: String,
    /// Cross-chain routing (transfer only)
    pub channel: Option<String>,
    /// Contract address (swap only)
    pub contract: Option<String>,
    /// Serialized `WasmSwap` (swap only)
    pub contract_payload: Option<Vec<u8>>,
}

/// The fixed set of transaction kinds this client can assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Send,
    Transfer,
    Swap,
}

impl MessageKind {
    /// Build the chain message for this kind. Pure: no I/O, no clock.
    pub fn build(self, intent: &MessageIntent) -> Result<ChainMessage> {
        match self {
            MessageKind::Send => build_send(intent).map(ChainMessage::Send),
            MessageKind::Transfer => build_transfer(intent).map(ChainMessage::Transfer),
            MessageKind::Swap => build_swap(intent).map(ChainMessage::Swap),
        }
    }
}

/// A message ready for inclusion in a transaction body.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainMessage {
    Send(MsgSend),
    Transfer(MsgTransfer),
    Swap(MsgExecuteContract),
}

impl ChainMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ChainMessage::Send(_) => MessageKind::Send,
            ChainMessage::Transfer(_) => MessageKind::Transfer,
            ChainMessage::Swap(_) => MessageKind::Swap,
        }
    }

    /// Address that must sign this message
    pub fn signer(&self) -> &str {
        match self {
            ChainMessage::Send(msg) => &msg.from_address,
            ChainMessage::Transfer(msg) => &msg.sender,
            ChainMessage::Swap(msg) => &msg.sender,
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            ChainMessage::Send(_) => type_urls::MSG_SEND,
            ChainMessage::Transfer(_) => type_urls::MSG_TRANSFER,
            ChainMessage::Swap(_) => type_urls::MSG_EXECUTE_CONTRACT,
        }
    }

    /// Protobuf encoding of the inner message (without the `Any` wrapper)
    pub fn encode_value(&self) -> Vec<u8> {
        match self {
            ChainMessage::Send(msg) => msg.encode_to_vec(),
            ChainMessage::Transfer(msg) => msg.encode_to_vec(),
            ChainMessage::Swap(msg) => msg.encode_to_vec(),
        }
    }

    pub fn to_any(&self) -> Any {
        Any {
            type_url: self.type_url().to_string(),
            value: self.encode_value(),
        }
    }
}
