use async_trait::async_trait;
use serde::Serialize;

use crate::chain::wallet::SignedTransaction;
use crate::error::Result;

/// Submits signed bytes to a node.
///
/// Transport failures are `BroadcastUnavailable`; anything the node actually
/// evaluated comes back as a `TransactionResult`. Not idempotent: the node's
/// replay protection rejects a resubmission.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionResult>;
}

/// Normalized node answer. All fields are independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
    pub code: Option<u32>,
    pub hash: Option<String>,
    pub log: Option<String>,
}

impl TransactionResult {
    /// From the node's `TxResponse` fields; empty strings become `None`.
    pub fn from_node(code: u32, txhash: String, raw_log: String) -> Self {
        Self {
            code: Some(code),
            hash: Some(txhash).filter(|h| !h.is_empty()),
            log: Some(raw_log).filter(|l| !l.is_empty()),
        }
    }

    /// Accepted into the mempool
    pub fn is_success(&self) -> bool {
        self.code.unwrap_or(0) == 0 && self.hash.is_some()
    }

    pub fn is_sequence_mismatch(&self) -> bool {
        self.log.as_deref().map_or(false, |log| {
            log.contains("account sequence mismatch") || log.contains("incorrect account sequence")
        })
    }

    /// Sequence the node expected, parsed from "expected X, got Y"
    pub fn expected_sequence(&self) -> Option<u64> {
        let log = self.log.as_deref()?;
        let start = log.find("expected ")?;
        let remaining = &log[start + 9..];
        let comma = remaining.find(',')?;
        remaining[..comma].trim().parse::<u64>().ok()
    }
}
