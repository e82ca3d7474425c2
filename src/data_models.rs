// File: src/data_models.rs
// Shared data structures and models for all interfaces

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fabric_ledger_inspector::crypto::CryptoSuite;
use fabric_ledger_inspector::error::LedgerError;
use fabric_ledger_inspector::ledger_store::FileLedger;
use fabric_ledger_inspector::model::{BlockInfoWithTx, ChannelSummary, TransactionInfo};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger_path: PathBuf,
    pub crypto_suite: Arc<dyn CryptoSuite>,
}

impl AppConfig {
    /// Load the block directory with the configured suite
    pub fn open_ledger(&self) -> Result<FileLedger, LedgerError> {
        FileLedger::open(&self.ledger_path, self.crypto_suite.as_ref())
    }
}

/// Real-time dashboard data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardData {
    pub chain_stats: ChainStats,
    pub recent_blocks: Vec<BlockRow>,
    pub last_updated: u64, // Unix timestamp
}

/// Channel statistics over the loaded window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainStats {
    pub block_height: u64,
    pub blocks_loaded: usize,
    pub transactions_loaded: u64,
    pub valid_transactions: usize,
    pub invalid_transactions: usize,
    pub channel_id: Option<String>,
    pub hash_suite: String,
}

/// Block row for dashboard tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRow {
    pub number: u64,
    pub hash: String,
    pub previous_hash: String,
    pub transaction_count: u64,
    pub created_at: Option<String>,
}

impl DashboardData {
    pub fn from_summary(summary: &ChannelSummary, hash_suite: &str) -> Self {
        let recent_blocks = summary
            .blocks
            .iter()
            .map(|block| BlockRow {
                number: block.basic.number,
                hash: block.basic.block_hash.clone(),
                previous_hash: block.basic.previous_hash.clone(),
                transaction_count: block.basic.transaction_count,
                created_at: block.transactions.first().map(|tx| tx.created_at.clone()),
            })
            .collect();

        let valid_transactions = summary.transactions.iter().filter(|tx| tx.is_valid() == Some(true)).count();
        let invalid_transactions = summary.transactions.iter().filter(|tx| tx.is_valid() == Some(false)).count();

        Self {
            chain_stats: ChainStats {
                block_height: summary.block_height,
                blocks_loaded: summary.blocks.len(),
                transactions_loaded: summary.transaction_total,
                valid_transactions,
                invalid_transactions,
                channel_id: summary
                    .transactions
                    .iter()
                    .map(|tx| tx.channel_id.clone())
                    .find(|id| !id.is_empty()),
                hash_suite: hash_suite.to_string(),
            },
            recent_blocks,
            last_updated: chrono::Utc::now().timestamp() as u64,
        }
    }
}

/// WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebSocketMessage {
    /// Request dashboard data
    GetDashboard,

    /// Dashboard data response
    DashboardData { data: DashboardData },

    /// Request block details
    GetBlockDetail { number: u64 },

    /// Block detail response
    BlockDetail { block: BlockInfoWithTx },

    /// Request a transaction by ID
    GetTransaction { tx_id: String },

    /// Transaction detail response
    TransactionDetail { transaction: TransactionInfo },

    /// Error response
    Error { message: String },

    /// Ping/Pong for connection health
    Ping,
    Pong,
}
