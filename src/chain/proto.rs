//! Proto definitions for Cosmos SDK chain integration.
//! Most types come from `cosmos-sdk-proto`; the IBC transfer message is
//! declared here since the SDK crate does not ship the ibc-go protos.

pub use cosmos_sdk_proto::Any;

pub use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
pub use cosmos_sdk_proto::cosmos::base::query::v1beta1::{PageRequest, PageResponse};
pub use cosmos_sdk_proto::cosmos::tx::v1beta1::{
    mode_info, AuthInfo, BroadcastMode, BroadcastTxRequest, Fee, ModeInfo, SignDoc, SignerInfo,
    Tx, TxBody, TxRaw, service_client::ServiceClient,
};
pub use cosmos_sdk_proto::cosmos::auth::v1beta1::{
    BaseAccount, ModuleAccount, QueryAccountRequest,
    query_client::QueryClient as AuthQueryClient,
};
pub use cosmos_sdk_proto::cosmos::bank::v1beta1::{
    MsgSend, QueryAllBalancesRequest, QueryAllBalancesResponse, QueryBalanceRequest,
    QueryBalanceResponse,
    query_client::QueryClient as BankQueryClient,
};
pub use cosmos_sdk_proto::cosmos::base::tendermint::v1beta1::{
    GetNodeInfoRequest, service_client::ServiceClient as TendermintServiceClient,
};
pub use cosmos_sdk_proto::cosmos::crypto::ed25519::PubKey as Ed25519PubKey;
pub use cosmos_sdk_proto::cosmos::crypto::secp256k1::PubKey as Secp256k1PubKey;
pub use cosmos_sdk_proto::cosmos::vesting::v1beta1::{
    BaseVestingAccount, ContinuousVestingAccount, DelayedVestingAccount, PeriodicVestingAccount,
    PermanentLockedAccount,
};
pub use cosmos_sdk_proto::cosmwasm::wasm::v1::MsgExecuteContract;

/// `ibc.core.client.v1.Height`
#[derive(Clone, PartialEq, prost::Message)]
pub struct Height {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,

    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

/// `ibc.applications.transfer.v1.MsgTransfer`
#[derive(Clone, PartialEq, prost::Message)]
pub struct MsgTransfer {
    /// Port on which the packet will be sent
    #[prost(string, tag = "1")]
    pub source_port: String,

    /// Channel by which the packet will be sent
    #[prost(string, tag = "2")]
    pub source_channel: String,

    #[prost(message, optional, tag = "3")]
    pub token: Option<Coin>,

    #[prost(string, tag = "4")]
    pub sender: String,

    /// Recipient address on the destination chain
    #[prost(string, tag = "5")]
    pub receiver: String,

    /// Disabled when zero
    #[prost(message, optional, tag = "6")]
    pub timeout_height: Option<Height>,

    /// Nanoseconds since the Unix epoch; disabled when zero
    #[prost(uint64, tag = "7")]
    pub timeout_timestamp: u64,

    #[prost(string, tag = "8")]
    pub memo: String,
}

pub mod type_urls {
    pub const MSG_SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
    pub const MSG_TRANSFER: &str = "/ibc.applications.transfer.v1.MsgTransfer";
    pub const MSG_EXECUTE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
    pub const SECP256K1_PUBKEY: &str = "/cosmos.crypto.secp256k1.PubKey";
    pub const ED25519_PUBKEY: &str = "/cosmos.crypto.ed25519.PubKey";

    pub const BASE_ACCOUNT: &str = "/cosmos.auth.v1beta1.BaseAccount";
    pub const MODULE_ACCOUNT: &str = "/cosmos.auth.v1beta1.ModuleAccount";
    pub const BASE_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.BaseVestingAccount";
    pub const CONTINUOUS_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.ContinuousVestingAccount";
    pub const DELAYED_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.DelayedVestingAccount";
    pub const PERIODIC_VESTING_ACCOUNT: &str = "/cosmos.vesting.v1beta1.PeriodicVestingAccount";
    pub const PERMANENT_LOCKED_ACCOUNT: &str = "/cosmos.vesting.v1beta1.PermanentLockedAccount";
}
