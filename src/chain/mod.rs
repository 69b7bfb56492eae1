pub mod account_types;
pub mod broadcast;
pub mod client;
pub mod encoding;
pub mod messages;
pub mod pipeline;
pub mod proto;
pub mod resolver;
pub mod tx_builder;
pub mod wallet;

pub use broadcast::{Broadcaster, TransactionResult};
pub use client::{ChainClient, ClientConfig};
pub use encoding::EncodingRegistry;
pub use messages::{ChainMessage, MessageIntent, MessageKind, WasmSwap};
pub use pipeline::{FeeSettings, TxPipeline, TxRequest};
pub use resolver::{Balance, ChainOverrides, ChainQuery, ResolvedChain};
pub use tx_builder::{TransactionMetadata, TxBuilder, UnsignedTransaction};
pub use wallet::{KeySigner, LocalKey, SignedTransaction, SigningContext, TransactionSigner};
