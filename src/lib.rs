// Library exports for interstellar

pub mod chain;
pub mod config;
pub mod error;

// Re-export main types for convenience
pub use chain::{ChainClient, EncodingRegistry, MessageIntent, MessageKind, TransactionResult, TxPipeline};
pub use error::TxError;
