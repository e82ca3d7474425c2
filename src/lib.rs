// File: src/lib.rs
// Fabric ledger decoding and channel browsing core
//
// Block bytes are unwrapped layer by layer (decoder), flattened per
// transaction (transaction) and per block (block), and collected into channel
// history by walking previous-hash links backward (browser).

pub mod block;
pub mod browser;
pub mod crypto;
pub mod decoder;
pub mod error;
pub mod identity;
pub mod ledger_store;
pub mod model;
pub mod protos;
pub mod transaction;

pub use block::decode_block;
pub use browser::{browse_channel, CancelToken, ChannelBrowser, LedgerQuery};
pub use crypto::{CryptoSuite, Sha2Suite};
pub use error::{BrowseError, ConfigError, DecodeError, LedgerError};
pub use model::{BlockInfoBasic, BlockInfoWithTx, BrowseConfig, ChannelSummary, StopCondition, TransactionInfo};
pub use transaction::assemble_transaction;
