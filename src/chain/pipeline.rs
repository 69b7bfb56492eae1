//! resolve → build → sign → broadcast, one transaction at a time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::broadcast::{Broadcaster, TransactionResult};
use crate::chain::encoding::EncodingRegistry;
use crate::chain::messages::{MessageIntent, MessageKind};
use crate::chain::resolver::{self, ChainOverrides, ChainQuery, ResolvedChain};
use crate::chain::tx_builder::{TransactionMetadata, TxBuilder, DEFAULT_TRANSFER_TIMEOUT};
use crate::chain::wallet::{KeySigner, SignedTransaction, SigningContext, TransactionSigner};
use crate::error::{Result, TxError};

/// Fee, gas and memo applied to one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSettings {
    pub fee_amount: u64,
    pub fee_denom: String,
    pub gas_limit: u64,
    pub memo: String,
}

/// One user-level transaction request
#[derive(Clone)]
pub struct TxRequest {
    pub kind: MessageKind,
    pub intent: MessageIntent,
    pub fee: FeeSettings,
    pub overrides: ChainOverrides,
    pub key: Arc<dyn KeySigner>,
}

pub struct TxPipeline<'a> {
    registry: &'a EncodingRegistry,
    query: &'a dyn ChainQuery,
    broadcaster: &'a dyn Broadcaster,
    timeout: Duration,
    transfer_timeout: Duration,
    signed: HashSet<(String, u64, u64)>,
}

impl<'a> TxPipeline<'a> {
    pub fn new(
        registry: &'a EncodingRegistry,
        query: &'a dyn ChainQuery,
        broadcaster: &'a dyn Broadcaster,
    ) -> Self {
        Self {
            registry,
            query,
            broadcaster,
            timeout: Duration::from_secs(30),
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            signed: HashSet::new(),
        }
    }

    /// Bound on resolution and on broadcast
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// A resolution that consulted the node re-arms the returned triple:
    /// the node's sequence has not moved, so nothing signed with it landed.
    /// Fully supplied overrides never re-arm.
    pub async fn resolve(&mut self, address: &str, overrides: &ChainOverrides) -> Result<ResolvedChain> {
        let resolved = resolver::resolve(self.query, address, overrides, self.timeout).await?;
        if !overrides.is_complete() {
            let triple = (
                resolved.chain_id.clone(),
                resolved.account_number,
                resolved.sequence,
            );
            if self.signed.remove(&triple) {
                log::debug!("Sequence {} re-resolved from the node", resolved.sequence);
            }
        }
        Ok(resolved)
    }

    /// Build and sign without touching the network. Each replay triple can
    /// be signed once per resolution.
    pub fn sign(&mut self, request: &TxRequest, resolved: &ResolvedChain) -> Result<SignedTransaction> {
        let message = request.kind.build(&request.intent)?;

        let triple = (
            resolved.chain_id.clone(),
            resolved.account_number,
            resolved.sequence,
        );
        if self.signed.contains(&triple) {
            return Err(TxError::SequenceReused {
                chain_id: triple.0,
                account_number: triple.1,
                sequence: triple.2,
            });
        }

        let metadata = TransactionMetadata {
            address: request.intent.from.clone(),
            fee_amount: request.fee.fee_amount,
            fee_denom: request.fee.fee_denom.clone(),
            gas_limit: request.fee.gas_limit,
            memo: request.fee.memo.clone(),
            signing: SigningContext {
                chain_id: resolved.chain_id.clone(),
                account_number: resolved.account_number,
                sequence: resolved.sequence,
                key: Arc::clone(&request.key),
            },
        };

        let unsigned = TxBuilder::new(self.registry)
            .with_transfer_timeout(self.transfer_timeout)
            .build(vec![message], &metadata)?;
        let signed = TransactionSigner::new(self.registry).sign(&unsigned, &metadata.signing)?;

        self.signed.insert(triple);
        Ok(signed)
    }

    pub async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionResult> {
        let result = tokio::time::timeout(self.timeout, self.broadcaster.broadcast(tx))
            .await
            .map_err(|_| {
                TxError::BroadcastUnavailable(format!("broadcast timed out after {:?}", self.timeout))
            })??;

        match (&result.code, &result.hash) {
            (Some(code), _) if *code != 0 => log::warn!(
                "Transaction rejected with code {}: {}",
                code,
                result.log.as_deref().unwrap_or("")
            ),
            (_, Some(hash)) => log::info!("Transaction accepted: {}", hash),
            _ => log::warn!("Node returned an empty result"),
        }
        Ok(result)
    }

    /// Full flow for one request. Fails fast; never retries.
    pub async fn execute(&mut self, request: &TxRequest) -> Result<TransactionResult> {
        // Reject malformed intents before any network round trip
        request.kind.build(&request.intent)?;

        let resolved = self.resolve(&request.intent.from, &request.overrides).await?;
        let signed = self.sign(request, &resolved)?;
        self.broadcast(&signed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::chain::account_types::AccountInfo;
    use crate::chain::resolver::Balance;
    use crate::chain::wallet::LocalKey;

    #[derive(Default)]
    struct FixedNode {
        queries: AtomicUsize,
        broadcasts: AtomicUsize,
    }

    #[async_trait]
    impl ChainQuery for FixedNode {
        async fn chain_id(&self) -> Result<String> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok("test-1".to_string())
        }

        async fn account(&self, address: &str) -> Result<AccountInfo> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(AccountInfo {
                address: address.to_string(),
                account_number: 5,
                sequence: 3,
                pub_key: None,
            })
        }

        async fn all_balances(&self, _address: &str) -> Result<Vec<Balance>> {
            Ok(vec![])
        }

        async fn balance(&self, _address: &str, denom: &str) -> Result<Balance> {
            Ok(Balance::zero(denom))
        }
    }

    #[async_trait]
    impl Broadcaster for FixedNode {
        async fn broadcast(&self, _tx: &SignedTransaction) -> Result<TransactionResult> {
            self.broadcasts.fetch_add(1, Ordering::SeqCst);
            Ok(TransactionResult::from_node(0, "FIXED".to_string(), String::new()))
        }
    }

    fn request(kind: MessageKind, intent: MessageIntent) -> TxRequest {
        TxRequest {
            kind,
            intent,
            fee: FeeSettings {
                fee_amount: 200,
                fee_denom: "utoken".to_string(),
                gas_limit: 80000,
                memo: String::new(),
            },
            overrides: ChainOverrides::default(),
            key: Arc::new(LocalKey::from_hex(&"33".repeat(32)).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_swap_without_contract_never_reaches_node() {
        let node = FixedNode::default();
        let registry = EncodingRegistry::new();
        let mut pipeline = TxPipeline::new(&registry, &node, &node);

        let intent = MessageIntent {
            from: "addr1".to_string(),
            contract_payload: Some(b"{}".to_vec()),
            ..Default::default()
        };
        let err = pipeline.execute(&request(MessageKind::Swap, intent)).await.unwrap_err();

        assert!(matches!(err, TxError::InvalidIntent(_)));
        assert_eq!(node.queries.load(Ordering::SeqCst), 0);
        assert_eq!(node.broadcasts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_same_triple_cannot_be_signed_twice() {
        let node = FixedNode::default();
        let registry = EncodingRegistry::new();
        let mut pipeline = TxPipeline::new(&registry, &node, &node);

        let req = request(
            MessageKind::Send,
            MessageIntent {
                from: "addr1".to_string(),
                to: "addr2".to_string(),
                amount: 1,
                denom: "utoken".to_string(),
                ..Default::default()
            },
        );
        let resolved = pipeline.resolve("addr1", &req.overrides).await.unwrap();
        pipeline.sign(&req, &resolved).unwrap();

        let err = pipeline.sign(&req, &resolved).unwrap_err();
        assert!(matches!(err, TxError::SequenceReused { sequence: 3, .. }));

        let next = ResolvedChain {
            sequence: 4,
            ..resolved
        };
        assert!(pipeline.sign(&req, &next).is_ok());
    }

    #[tokio::test]
    async fn test_fresh_resolution_rearms_triple() {
        let node = FixedNode::default();
        let registry = EncodingRegistry::new();
        let mut pipeline = TxPipeline::new(&registry, &node, &node);

        let req = request(
            MessageKind::Send,
            MessageIntent {
                from: "addr1".to_string(),
                to: "addr2".to_string(),
                amount: 1,
                denom: "utoken".to_string(),
                ..Default::default()
            },
        );
        let resolved = pipeline.resolve("addr1", &req.overrides).await.unwrap();
        pipeline.sign(&req, &resolved).unwrap();

        let again = pipeline.resolve("addr1", &req.overrides).await.unwrap();
        assert_eq!(again, resolved);
        assert!(pipeline.sign(&req, &again).is_ok());
    }

    #[tokio::test]
    async fn test_supplied_triple_stays_guarded() {
        let node = FixedNode::default();
        let registry = EncodingRegistry::new();
        let mut pipeline = TxPipeline::new(&registry, &node, &node);

        let mut req = request(
            MessageKind::Send,
            MessageIntent {
                from: "addr1".to_string(),
                to: "addr2".to_string(),
                amount: 1,
                denom: "utoken".to_string(),
                ..Default::default()
            },
        );
        req.overrides = ChainOverrides {
            chain_id: Some("test-1".to_string()),
            account_number: Some(5),
            sequence: Some(3),
        };

        assert!(pipeline.execute(&req).await.unwrap().is_success());
        let err = pipeline.execute(&req).await.unwrap_err();
        assert!(matches!(err, TxError::SequenceReused { sequence: 3, .. }));
        assert_eq!(node.queries.load(Ordering::SeqCst), 0);
        assert_eq!(node.broadcasts.load(Ordering::SeqCst), 1);
    }
}
