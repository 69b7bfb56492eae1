//! Transaction assembly: chain messages + fee, gas and memo into an
//! unsigned transaction, encoded through the registry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use prost::Message;

use crate::chain::encoding::EncodingRegistry;
use crate::chain::messages::ChainMessage;
use crate::chain::proto::{AuthInfo, Coin, Fee, Tx, TxBody};
use crate::chain::wallet::SigningContext;
use crate::error::{Result, TxError};

/// Default relative timeout stamped on IBC transfers
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Fee, gas and memo for one transaction, plus who signs it.
#[derive(Debug, Clone)]
pub struct TransactionMetadata {
    /// Signer address; every message must name it as its sender
    pub address: String,
    pub fee_amount: u64,
    pub fee_denom: String,
    pub gas_limit: u64,
    pub memo: String,
    pub signing: SigningContext,
}

/// Body and fee of a transaction that has not been signed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub body: TxBody,
    pub fee: Fee,
}

/// What comes back out of an encoded unsigned transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTransaction {
    pub messages: Vec<ChainMessage>,
    pub fee: Vec<Coin>,
    pub gas_limit: u64,
    pub memo: String,
}

impl UnsignedTransaction {
    pub fn memo(&self) -> &str {
        &self.body.memo
    }

    pub fn gas_limit(&self) -> u64 {
        self.fee.gas_limit
    }

    /// `Tx` with an empty signer list and no signatures
    pub fn to_bytes(&self) -> Vec<u8> {
        Tx {
            body: Some(self.body.clone()),
            auth_info: Some(AuthInfo {
                fee: Some(self.fee.clone()),
                ..Default::default()
            }),
            signatures: vec![],
        }
        .encode_to_vec()
    }

    pub fn decode(bytes: &[u8], registry: &EncodingRegistry) -> Result<DecodedTransaction> {
        let tx = Tx::decode(bytes)?;
        let body = tx.body.unwrap_or_default();
        let fee = tx.auth_info.and_then(|a| a.fee).unwrap_or_default();

        let messages = body
            .messages
            .iter()
            .map(|any| registry.decode_message(any))
            .collect::<Result<Vec<_>>>()?;

        Ok(DecodedTransaction {
            messages,
            fee: fee.amount,
            gas_limit: fee.gas_limit,
            memo: body.memo,
        })
    }
}

pub struct TxBuilder<'a> {
    registry: &'a EncodingRegistry,
    transfer_timeout: Duration,
}

impl<'a> TxBuilder<'a> {
    pub fn new(registry: &'a EncodingRegistry) -> Self {
        Self {
            registry,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }

    /// Builder pattern method to set the transfer timeout
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn build(
        &self,
        messages: Vec<ChainMessage>,
        metadata: &TransactionMetadata,
    ) -> Result<UnsignedTransaction> {
        self.build_at(messages, metadata, Utc::now())
    }

    /// Same as [`build`](Self::build) with an explicit clock reading for
    /// transfer timeouts.
    pub fn build_at(
        &self,
        messages: Vec<ChainMessage>,
        metadata: &TransactionMetadata,
        now: DateTime<Utc>,
    ) -> Result<UnsignedTransaction> {
        if messages.is_empty() {
            return Err(TxError::EmptyTransaction);
        }
        if metadata.fee_amount == 0 {
            return Err(TxError::InvalidFee("fee amount must be nonzero".into()));
        }
        if metadata.gas_limit == 0 {
            return Err(TxError::InvalidFee("gas limit must be nonzero".into()));
        }
        if metadata.fee_denom.is_empty() {
            return Err(TxError::InvalidFee("fee denom is empty".into()));
        }

        if let Some(msg) = messages.iter().find(|m| m.signer() != metadata.address) {
            return Err(TxError::InvalidIntent(format!(
                "message signer {} differs from transaction signer {}",
                msg.signer(),
                metadata.address
            )));
        }

        let timeout = self.timeout_timestamp(now);

        // Message order is execution order on chain
        let encoded = messages
            .into_iter()
            .map(|msg| {
                let msg = match msg {
                    ChainMessage::Transfer(mut transfer) if transfer.timeout_timestamp == 0 => {
                        transfer.timeout_timestamp = timeout;
                        ChainMessage::Transfer(transfer)
                    }
                    other => other,
                };
                self.registry.encode_message(&msg)
            })
            .collect::<Result<Vec<_>>>()?;

        let body = TxBody {
            messages: encoded,
            memo: metadata.memo.clone(),
            ..Default::default()
        };
        let fee = Fee {
            amount: vec![Coin {
                denom: metadata.fee_denom.clone(),
                amount: metadata.fee_amount.to_string(),
            }],
            gas_limit: metadata.gas_limit,
            payer: String::new(),
            granter: String::new(),
        };

        log::debug!(
            "Built tx with {} message(s), gas {}, fee {}{}",
            body.messages.len(),
            fee.gas_limit,
            metadata.fee_amount,
            metadata.fee_denom
        );

        Ok(UnsignedTransaction { body, fee })
    }

    fn timeout_timestamp(&self, now: DateTime<Utc>) -> u64 {
        let now_nanos = now.timestamp_nanos_opt().unwrap_or(i64::MAX).max(0) as u64;
        let timeout_nanos = u64::try_from(self.transfer_timeout.as_nanos()).unwrap_or(u64::MAX);
        now_nanos.saturating_add(timeout_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;

    use crate::chain::messages::{MessageIntent, MessageKind, WasmSwap};
    use crate::chain::wallet::LocalKey;

    fn metadata() -> TransactionMetadata {
        TransactionMetadata {
            address: "addr1".to_string(),
            fee_amount: 200,
            fee_denom: "utoken".to_string(),
            gas_limit: 80000,
            memo: "hello".to_string(),
            signing: SigningContext {
                chain_id: "test-1".to_string(),
                account_number: 5,
                sequence: 3,
                key: Arc::new(LocalKey::from_hex(&"01".repeat(32)).unwrap()),
            },
        }
    }

    fn intent() -> MessageIntent {
        MessageIntent {
            from: "addr1".to_string(),
            to: "addr2".to_string(),
            amount: 1000,
            denom: "utoken".to_string(),
            channel: Some("channel-0".to_string()),
            ..Default::default()
        }
    }

    fn swap_message() -> ChainMessage {
        let payload = WasmSwap::new(10, "utoken", "uother", "1", 10).to_json_bytes().unwrap();
        MessageKind::Swap
            .build(&MessageIntent {
                from: "addr1".to_string(),
                contract: Some("addr-contract".to_string()),
                contract_payload: Some(payload),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_messages_fee_gas_memo() {
        let registry = EncodingRegistry::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let messages = vec![
            MessageKind::Send.build(&intent()).unwrap(),
            swap_message(),
            MessageKind::Transfer.build(&intent()).unwrap(),
        ];

        let unsigned = TxBuilder::new(&registry)
            .build_at(messages.clone(), &metadata(), now)
            .unwrap();
        let decoded = UnsignedTransaction::decode(&unsigned.to_bytes(), &registry).unwrap();

        assert_eq!(decoded.messages.len(), 3);
        assert_eq!(decoded.messages[0], messages[0]);
        assert_eq!(decoded.messages[1], messages[1]);
        assert_eq!(decoded.messages[2].kind(), MessageKind::Transfer);
        assert_eq!(decoded.fee[0].amount, "200");
        assert_eq!(decoded.fee[0].denom, "utoken");
        assert_eq!(decoded.gas_limit, 80000);
        assert_eq!(decoded.memo, "hello");
    }

    #[test]
    fn test_transfer_gets_default_timeout() {
        let registry = EncodingRegistry::new();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let unsigned = TxBuilder::new(&registry)
            .with_transfer_timeout(Duration::from_secs(60))
            .build_at(vec![MessageKind::Transfer.build(&intent()).unwrap()], &metadata(), now)
            .unwrap();

        let decoded = UnsignedTransaction::decode(&unsigned.to_bytes(), &registry).unwrap();
        match &decoded.messages[0] {
            ChainMessage::Transfer(t) => {
                let expected = (now.timestamp() as u64 + 60) * 1_000_000_000;
                assert_eq!(t.timeout_timestamp, expected);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_empty_message_list() {
        let registry = EncodingRegistry::new();
        let result = TxBuilder::new(&registry).build(vec![], &metadata());
        assert!(matches!(result, Err(TxError::EmptyTransaction)));
    }

    #[test]
    fn test_zero_fee_or_gas() {
        let registry = EncodingRegistry::new();
        let builder = TxBuilder::new(&registry);
        let msg = MessageKind::Send.build(&intent()).unwrap();

        let mut m = metadata();
        m.fee_amount = 0;
        assert!(matches!(builder.build(vec![msg.clone()], &m), Err(TxError::InvalidFee(_))));

        let mut m = metadata();
        m.gas_limit = 0;
        assert!(matches!(builder.build(vec![msg.clone()], &m), Err(TxError::InvalidFee(_))));

        let mut m = metadata();
        m.fee_denom = String::new();
        assert!(matches!(builder.build(vec![msg], &m), Err(TxError::InvalidFee(_))));
    }

    #[test]
    fn test_message_signer_must_match_metadata() {
        let registry = EncodingRegistry::new();
        let mut other = intent();
        other.from = "addr9".to_string();
        let messages = vec![
            MessageKind::Send.build(&intent()).unwrap(),
            MessageKind::Send.build(&other).unwrap(),
        ];

        let result = TxBuilder::new(&registry).build(messages, &metadata());
        assert!(matches!(result, Err(TxError::InvalidIntent(_))));
    }

    #[test]
    fn test_long_memo_accepted() {
        let registry = EncodingRegistry::new();
        let mut m = metadata();
        m.memo = "x".repeat(10_000);
        let unsigned = TxBuilder::new(&registry)
            .build(vec![MessageKind::Send.build(&intent()).unwrap()], &m)
            .unwrap();
        assert_eq!(unsigned.memo().len(), 10_000);
        assert_eq!(unsigned.gas_limit(), 80000);
    }
}
