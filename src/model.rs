// File: src/model.rs
// Version: 2.0.0 - Decoded ledger records and browse configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Height and tip linkage reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub height: u64,
    #[serde(with = "hex::serde")]
    pub current_block_hash: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub previous_block_hash: Vec<u8>,
}

/// Block number, linkage and transaction count without transaction detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfoBasic {
    pub number: u64,
    pub block_hash: String,
    pub previous_hash: String,
    pub transaction_count: u64,
}

/// A decoded block together with every transaction it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfoWithTx {
    #[serde(flatten)]
    pub basic: BlockInfoBasic,
    pub transactions: Vec<TransactionInfo>,
}

impl BlockInfoWithTx {
    pub fn basic_info(&self) -> &BlockInfoBasic {
        &self.basic
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub tx_id: String,
    /// `common.HeaderType` of the envelope.
    pub tx_type: i32,
    pub channel_id: String,
    /// Local wall-clock creation time, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    pub chaincode_id: String,
    pub chaincode_version: String,
    pub args: Vec<String>,
    pub caller_msp_id: String,
    pub caller_name: String,
    pub caller_ou: String,
    #[serde(with = "hex::serde")]
    pub nonce: Vec<u8>,
    pub reads: Vec<ReadEntry>,
    pub writes: Vec<WriteEntry>,
    /// Chaincode response status, when the action carried one.
    pub response_status: Option<i32>,
    pub response_message: Option<String>,
    /// Validation code from the block's transaction filter, when present.
    pub validation_code: Option<u8>,
}

impl TransactionInfo {
    /// `true` when the committer marked the transaction VALID (code 0).
    pub fn is_valid(&self) -> Option<bool> {
        self.validation_code.map(|code| code == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadEntry {
    pub namespace: String,
    pub key: String,
    pub block_num: u64,
    pub tx_num: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteEntry {
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub is_delete: bool,
}

/// Result of walking a channel backward from its tip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub block_height: u64,
    /// Sum over the traversed blocks only.
    pub transaction_total: u64,
    pub blocks: Vec<BlockInfoWithTx>,
    pub transactions: Vec<TransactionInfo>,
    pub block_basics: Vec<BlockInfoBasic>,
}

impl ChannelSummary {
    pub fn find_transaction(&self, tx_id: &str) -> Option<&TransactionInfo> {
        self.transactions.iter().find(|tx| tx.tx_id == tx_id)
    }

    pub fn find_block(&self, number: u64) -> Option<&BlockInfoWithTx> {
        self.blocks.iter().find(|b| b.basic.number == number)
    }
}

/// When a backward traversal stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
    /// Stop once this many blocks were fetched; 0 means unlimited.
    BlockCountLimit(u64),
    /// Stop before fetching the block with this header hash.
    TargetPreviousHash(#[serde(with = "hex::serde")] Vec<u8>),
    /// Stop before fetching the block with this number.
    TargetBlockNumber(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseConfig {
    pub stop: StopCondition,
}

impl BrowseConfig {
    pub fn unlimited() -> Self {
        Self { stop: StopCondition::BlockCountLimit(0) }
    }

    pub fn block_count_limit(limit: u64) -> Self {
        Self { stop: StopCondition::BlockCountLimit(limit) }
    }

    /// Build a target-hash config from a hex string.
    pub fn target_previous_hash(hash_hex: &str) -> Result<Self, ConfigError> {
        if hash_hex.is_empty() {
            return Err(ConfigError::MissingTargetHash);
        }
        let hash = hex::decode(hash_hex)?;
        Ok(Self { stop: StopCondition::TargetPreviousHash(hash) })
    }

    pub fn target_block_number(number: u64) -> Self {
        Self { stop: StopCondition::TargetBlockNumber(number) }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.stop {
            StopCondition::TargetPreviousHash(hash) if hash.is_empty() => Err(ConfigError::MissingTargetHash),
            _ => Ok(()),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Legacy numeric form: `limit_type` 0 = block count, 1 = previous hash, 2 = block number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBrowseConfig {
    pub limit_type: i32,
    pub block_count_limit: u64,
    pub last_block_hash: String,
    pub last_block_num: u64,
}

impl TryFrom<RawBrowseConfig> for BrowseConfig {
    type Error = ConfigError;

    fn try_from(raw: RawBrowseConfig) -> Result<Self, Self::Error> {
        match raw.limit_type {
            0 => Ok(BrowseConfig::block_count_limit(raw.block_count_limit)),
            1 => BrowseConfig::target_previous_hash(&raw.last_block_hash),
            2 => Ok(BrowseConfig::target_block_number(raw.last_block_num)),
            other => Err(ConfigError::UnsupportedStopCondition(other)),
        }
    }
}

// ------------------------------------------------------- text renderings ----

impl fmt::Display for ReadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NameSpace: {}, ReadKey: {}, ReadBlockNum: {}, ReadTxNumInBlock: {}",
            self.namespace, self.key, self.block_num, self.tx_num
        )
    }
}

impl fmt::Display for WriteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NameSpace: {}, WriteKey: {}, WriteValue: {}, IsDelete: {}",
            self.namespace, self.key, self.value, self.is_delete
        )
    }
}

impl fmt::Display for TransactionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TxID: {}", self.tx_id)?;
        writeln!(f, "  Type: {}  Channel: {}  Created: {}", self.tx_type, self.channel_id, self.created_at)?;
        writeln!(f, "  Chaincode: {} {}", self.chaincode_id, self.chaincode_version)?;
        writeln!(f, "  Args: {:?}", self.args)?;
        writeln!(f, "  Caller: {} / {} / {}", self.caller_msp_id, self.caller_name, self.caller_ou)?;
        if let Some(code) = self.validation_code {
            writeln!(f, "  Validation code: {}", code)?;
        }
        for read in &self.reads {
            writeln!(f, "  R {}", read)?;
        }
        for write in &self.writes {
            writeln!(f, "  W {}", write)?;
        }
        Ok(())
    }
}

impl fmt::Display for BlockInfoBasic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {} ({} txs) hash: {} previous: {}",
            self.number, self.transaction_count, self.block_hash, self.previous_hash
        )
    }
}

impl fmt::Display for BlockInfoWithTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.basic)?;
        for tx in &self.transactions {
            for line in tx.to_string().lines() {
                writeln!(f, "    {}", line)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ChannelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Block height: {}, transactions in {} traversed blocks: {}",
            self.block_height,
            self.blocks.len(),
            self.transaction_total
        )?;
        for block in &self.blocks {
            for line in block.to_string().lines() {
                writeln!(f, "  {}", line)?;
            }
        }
        Ok(())
    }
}
