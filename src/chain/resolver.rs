//! Account/chain resolution: fills the replay-protection triple
//! (chain id, account number, sequence) from node state unless the caller
//! supplied all of it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::chain::account_types::AccountInfo;
use crate::error::{Result, TxError};

/// Read-only node queries
#[async_trait]
pub trait ChainQuery: Send + Sync {
    async fn chain_id(&self) -> Result<String>;

    /// Fails with `AccountNotFound` when the address has no on-chain account.
    async fn account(&self, address: &str) -> Result<AccountInfo>;

    async fn all_balances(&self, address: &str) -> Result<Vec<Balance>>;

    /// Exactly one entry; zero amount when the address holds none.
    async fn balance(&self, address: &str, denom: &str) -> Result<Balance>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub denom: String,
    pub amount: String,
}

impl Balance {
    pub fn zero(denom: &str) -> Self {
        Self {
            denom: denom.to_string(),
            amount: "0".to_string(),
        }
    }
}

/// Values the caller supplied up front (offline or batch signing).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOverrides {
    pub chain_id: Option<String>,
    pub account_number: Option<u64>,
    pub sequence: Option<u64>,
}

impl ChainOverrides {
    pub fn is_complete(&self) -> bool {
        self.chain_id.is_some() && self.account_number.is_some() && self.sequence.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChain {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Resolve the signing triple for `address`.
///
/// Queries only what `overrides` leaves open; with nothing open the node is
/// never contacted. The whole resolution is bounded by `timeout`.
pub async fn resolve(
    query: &dyn ChainQuery,
    address: &str,
    overrides: &ChainOverrides,
    timeout: Duration,
) -> Result<ResolvedChain> {
    if let (Some(chain_id), Some(account_number), Some(sequence)) = (
        overrides.chain_id.clone(),
        overrides.account_number,
        overrides.sequence,
    ) {
        log::debug!("Using supplied chain id, account number and sequence");
        return Ok(ResolvedChain {
            chain_id,
            account_number,
            sequence,
        });
    }

    let lookup = async {
        let chain_id = match &overrides.chain_id {
            Some(id) => id.clone(),
            None => query.chain_id().await?,
        };
        let account = query.account(address).await?;
        log::info!(
            "Resolved {} on {}: account number {}, sequence {}",
            address,
            chain_id,
            account.account_number,
            account.sequence
        );
        Ok::<_, TxError>(ResolvedChain {
            chain_id,
            account_number: overrides.account_number.unwrap_or(account.account_number),
            sequence: overrides.sequence.unwrap_or(account.sequence),
        })
    };

    tokio::time::timeout(timeout, lookup).await.map_err(|_| {
        TxError::QueryUnavailable(format!("account resolution timed out after {:?}", timeout))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNode {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingNode {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl ChainQuery for CountingNode {
        async fn chain_id(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok("test-1".to_string())
        }

        async fn account(&self, address: &str) -> Result<AccountInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if address == "missing" {
                return Err(TxError::AccountNotFound(address.to_string()));
            }
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

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_resolves_from_node() {
        let node = CountingNode::new(Duration::ZERO);
        let resolved = resolve(&node, "addr1", &ChainOverrides::default(), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(
            resolved,
            ResolvedChain {
                chain_id: "test-1".to_string(),
                account_number: 5,
                sequence: 3
            }
        );
        assert_eq!(node.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_complete_overrides_skip_queries() {
        let node = CountingNode::new(Duration::ZERO);
        let overrides = ChainOverrides {
            chain_id: Some("offline-1".to_string()),
            account_number: Some(9),
            sequence: Some(12),
        };
        let resolved = resolve(&node, "addr1", &overrides, TIMEOUT).await.unwrap();
        assert_eq!(resolved.sequence, 12);
        assert_eq!(node.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_overrides_win() {
        let node = CountingNode::new(Duration::ZERO);
        let overrides = ChainOverrides {
            sequence: Some(40),
            ..Default::default()
        };
        let resolved = resolve(&node, "addr1", &overrides, TIMEOUT).await.unwrap();
        assert_eq!(resolved.account_number, 5);
        assert_eq!(resolved.sequence, 40);
    }

    #[tokio::test]
    async fn test_missing_account() {
        let node = CountingNode::new(Duration::ZERO);
        let err = resolve(&node, "missing", &ChainOverrides::default(), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_slow_node_times_out() {
        let node = CountingNode::new(Duration::from_secs(60));
        let err = resolve(&node, "addr1", &ChainOverrides::default(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::QueryUnavailable(_)));
    }
}
