use thiserror::Error;

/// Failures of the transaction assembly pipeline.
///
/// Only the transport variants are worth retrying, and only after the
/// account has been resolved again.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    #[error("transaction has no messages")]
    EmptyTransaction,

    #[error("invalid fee: {0}")]
    InvalidFee(String),

    #[error("account {0} not found on chain")]
    AccountNotFound(String),

    #[error("query unavailable: {0}")]
    QueryUnavailable(String),

    #[error("broadcast unavailable: {0}")]
    BroadcastUnavailable(String),

    #[error("signing unavailable: {0}")]
    SigningUnavailable(String),

    #[error("type {0} is not registered with the encoding registry")]
    UnregisteredType(String),

    #[error("sequence {sequence} of account {account_number} on {chain_id} was already signed")]
    SequenceReused {
        chain_id: String,
        account_number: u64,
        sequence: u64,
    },

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl TxError {
    /// Transport failures: the node never evaluated anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TxError::QueryUnavailable(_) | TxError::BroadcastUnavailable(_)
        )
    }
}

impl From<prost::EncodeError> for TxError {
    fn from(e: prost::EncodeError) -> Self {
        TxError::Encoding(e.to_string())
    }
}

impl From<prost::DecodeError> for TxError {
    fn from(e: prost::DecodeError) -> Self {
        TxError::Encoding(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TxError>;
