use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Status};

use crate::chain::account_types::{Account, AccountInfo};
use crate::chain::broadcast::{Broadcaster, TransactionResult};
use crate::chain::proto::{
    AuthQueryClient, BankQueryClient, BroadcastMode, BroadcastTxRequest, GetNodeInfoRequest,
    PageRequest, QueryAccountRequest, QueryAllBalancesRequest, QueryAllBalancesResponse,
    QueryBalanceRequest, QueryBalanceResponse, ServiceClient, TendermintServiceClient,
};
use crate::chain::resolver::{Balance, ChainQuery};
use crate::chain::wallet::SignedTransaction;
use crate::error::{Result, TxError};

/// Configuration for the gRPC client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// gRPC endpoint URL (e.g., "https://grpc.cosmos.network:443")
    pub grpc_endpoint: String,
    pub connection_timeout: Duration,
    /// Bound on every query and broadcast call
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            grpc_endpoint: "http://localhost:9090".to_string(),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// gRPC client for a Cosmos SDK node
#[derive(Clone)]
pub struct ChainClient {
    config: ClientConfig,
    channel: Channel,
}

impl ChainClient {
    /// Connect to the gRPC endpoint
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        log::info!("Connecting to {}", config.grpc_endpoint);

        let mut endpoint = Endpoint::from_shared(config.grpc_endpoint.clone())
            .map_err(|e| {
                TxError::QueryUnavailable(format!("invalid endpoint {}: {}", config.grpc_endpoint, e))
            })?
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout);

        if config.grpc_endpoint.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new())
                .map_err(|e| TxError::QueryUnavailable(format!("TLS setup failed: {}", e)))?;
        }

        let channel = endpoint.connect().await.map_err(|e| {
            TxError::QueryUnavailable(format!("cannot reach {}: {}", config.grpc_endpoint, e))
        })?;

        log::info!("Connected to {}", config.grpc_endpoint);
        Ok(Self { config, channel })
    }

    /// Await a gRPC call bounded by the request timeout.
    async fn bounded<T, F>(&self, what: &str, call: F) -> std::result::Result<T, CallError>
    where
        F: Future<Output = std::result::Result<tonic::Response<T>, Status>>,
    {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(CallError::Status(status)),
            Err(_) => {
                log::warn!("{} timed out after {:?}", what, self.config.request_timeout);
                Err(CallError::Timeout(self.config.request_timeout))
            }
        }
    }
}

enum CallError {
    Status(Status),
    Timeout(Duration),
}

impl CallError {
    fn into_query_error(self, what: &str) -> TxError {
        match self {
            CallError::Status(status) if status.code() == Code::InvalidArgument => {
                TxError::InvalidIntent(format!("{}: {}", what, status.message()))
            }
            CallError::Status(status) => {
                TxError::QueryUnavailable(format!("{}: {}", what, status.message()))
            }
            CallError::Timeout(t) => TxError::QueryUnavailable(format!("{} timed out after {:?}", what, t)),
        }
    }
}

#[async_trait]
impl ChainQuery for ChainClient {
    async fn chain_id(&self) -> Result<String> {
        let mut client = TendermintServiceClient::new(self.channel.clone());
        let response = self
            .bounded("node info query", client.get_node_info(GetNodeInfoRequest {}))
            .await
            .map_err(|e| e.into_query_error("node info query"))?;

        let node_info = response
            .default_node_info
            .ok_or_else(|| TxError::QueryUnavailable("no default node info in response".into()))?;
        Ok(node_info.network)
    }

    async fn account(&self, address: &str) -> Result<AccountInfo> {
        let mut client = AuthQueryClient::new(self.channel.clone());
        let request = QueryAccountRequest {
            address: address.to_string(),
        };
        let response = match self.bounded("account query", client.account(request)).await {
            Ok(response) => response,
            Err(CallError::Status(status))
                if status.code() == Code::NotFound || status.message().contains("not found") =>
            {
                return Err(TxError::AccountNotFound(address.to_string()));
            }
            Err(e) => return Err(e.into_query_error("account query")),
        };

        let account_any = response
            .account
            .ok_or_else(|| TxError::AccountNotFound(address.to_string()))?;
        log::debug!("Decoding account with type_url: {}", account_any.type_url);

        let account = Account::decode_any(&account_any)?;
        account.get_account_info().ok_or_else(|| {
            TxError::AccountNotFound(format!(
                "{} (account type {} carries no base account)",
                address,
                account.account_type()
            ))
        })
    }

    async fn all_balances(&self, address: &str) -> Result<Vec<Balance>> {
        collect_balance_pages(|next_key| {
            let mut client = BankQueryClient::new(self.channel.clone());
            let request = QueryAllBalancesRequest {
                address: address.to_string(),
                pagination: Some(PageRequest {
                    key: next_key,
                    ..Default::default()
                }),
                ..Default::default()
            };
            async move {
                self.bounded("balance query", client.all_balances(request))
                    .await
                    .map_err(|e| e.into_query_error("balance query"))
            }
        })
        .await
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<Balance> {
        let mut client = BankQueryClient::new(self.channel.clone());
        let request = QueryBalanceRequest {
            address: address.to_string(),
            denom: denom.to_string(),
        };
        let response = self
            .bounded("balance query", client.balance(request))
            .await
            .map_err(|e| e.into_query_error("balance query"))?;

        Ok(balance_or_zero(response, denom))
    }
}

/// Follow `next_key` until the node reports the last page.
async fn collect_balance_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Balance>>
where
    F: FnMut(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<QueryAllBalancesResponse>>,
{
    let mut balances = Vec::new();
    let mut next_key = Vec::new();

    loop {
        let response = fetch_page(next_key).await?;
        balances.extend(response.balances.into_iter().map(|coin| Balance {
            denom: coin.denom,
            amount: coin.amount,
        }));

        match response.pagination {
            Some(page) if !page.next_key.is_empty() => next_key = page.next_key,
            _ => break,
        }
    }

    Ok(balances)
}

/// The bank module omits the coin entirely when nothing is held
fn balance_or_zero(response: QueryBalanceResponse, denom: &str) -> Balance {
    response
        .balance
        .map(|coin| Balance {
            denom: coin.denom,
            amount: coin.amount,
        })
        .unwrap_or_else(|| Balance::zero(denom))
}

#[async_trait]
impl Broadcaster for ChainClient {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TransactionResult> {
        log::info!("Broadcasting {} bytes", tx.bytes.len());
        let mut client = ServiceClient::new(self.channel.clone());
        let request = BroadcastTxRequest {
            tx_bytes: tx.bytes.clone(),
            mode: BroadcastMode::Sync as i32,
        };

        let response = self
            .bounded("broadcast", client.broadcast_tx(request))
            .await
            .map_err(|e| match e {
                CallError::Status(status) => {
                    TxError::BroadcastUnavailable(format!("{}: {}", status.code(), status.message()))
                }
                CallError::Timeout(t) => {
                    TxError::BroadcastUnavailable(format!("broadcast timed out after {:?}", t))
                }
            })?;

        match response.tx_response {
            Some(r) => Ok(TransactionResult::from_node(r.code, r.txhash, r.raw_log)),
            None => {
                log::warn!("Node returned no tx response");
                Ok(TransactionResult::default())
            }
        }
    }
}
