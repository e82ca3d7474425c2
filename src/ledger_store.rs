// File: src/ledger_store.rs
// Version: 3.0.0 - Block-file and in-memory ledgers implementing LedgerQuery
//
// A ledger directory holds one serialized `common.Block` per `*.block` file,
// the format `peer channel fetch` writes. File names are not significant;
// blocks are indexed by header number and by header hash.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use prost::Message;

use crate::browser::LedgerQuery;
use crate::crypto::{block_header_hash, CryptoSuite};
use crate::error::LedgerError;
use crate::model::ChainInfo;
use crate::protos::Block;

pub const BLOCK_FILE_EXTENSION: &str = "block";

/// Blocks indexed by number and header hash.
#[derive(Debug, Default)]
struct BlockIndex {
    by_number: BTreeMap<u64, Block>,
    by_hash: HashMap<Vec<u8>, u64>,
    hash_of: HashMap<u64, Vec<u8>>,
}

impl BlockIndex {
    fn insert(&mut self, suite: &dyn CryptoSuite, block: Block) {
        let Some(header) = block.header.as_ref() else {
            tracing::warn!("skipping block without header");
            return;
        };
        let number = header.number;
        let hash = block_header_hash(suite, header);

        if let Some(old_hash) = self.hash_of.insert(number, hash.clone()) {
            tracing::warn!(number, "duplicate block number, keeping the later block");
            self.by_hash.remove(&old_hash);
        }
        self.by_hash.insert(hash, number);
        self.by_number.insert(number, block);
    }

    fn chain_info(&self) -> ChainInfo {
        match self.by_number.iter().next_back() {
            Some((number, block)) => ChainInfo {
                height: number + 1,
                current_block_hash: self.hash_of.get(number).cloned().unwrap_or_default(),
                previous_block_hash: block.header.as_ref().map(|h| h.previous_hash.clone()).unwrap_or_default(),
            },
            None => ChainInfo { height: 0, current_block_hash: Vec::new(), previous_block_hash: Vec::new() },
        }
    }

    fn by_hash(&self, hash: &[u8]) -> Result<Block, LedgerError> {
        self.by_hash
            .get(hash)
            .and_then(|number| self.by_number.get(number))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("block with hash {}", hex::encode(hash))))
    }

    fn by_number(&self, number: u64) -> Result<Block, LedgerError> {
        self.by_number
            .get(&number)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("block number {}", number)))
    }
}

/// Ledger read from a directory of `.block` files.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    index: BlockIndex,
}

impl FileLedger {
    pub fn open(path: &Path, suite: &dyn CryptoSuite) -> Result<Self, LedgerError> {
        if !path.is_dir() {
            return Err(LedgerError::Unavailable(format!("{} is not a directory", path.display())));
        }
        let mut files: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_block_file(p))
            .collect();
        files.sort();

        let mut index = BlockIndex::default();
        for file in &files {
            let bytes = fs::read(file)?;
            let block = Block::decode(bytes.as_slice()).map_err(|source| LedgerError::Decode {
                path: file.clone(),
                source,
            })?;
            index.insert(suite, block);
        }

        tracing::info!(path = %path.display(), files = files.len(), blocks = index.by_number.len(), "block files loaded");
        Ok(Self { path: path.to_path_buf(), index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_count(&self) -> usize {
        self.index.by_number.len()
    }

    /// Header hash computed for `number` when it was loaded.
    pub fn header_hash(&self, number: u64) -> Option<&[u8]> {
        self.index.hash_of.get(&number).map(Vec::as_slice)
    }
}

impl LedgerQuery for FileLedger {
    fn query_chain_info(&self) -> Result<ChainInfo, LedgerError> {
        Ok(self.index.chain_info())
    }

    fn query_block_by_hash(&self, hash: &[u8]) -> Result<Block, LedgerError> {
        self.index.by_hash(hash)
    }

    fn query_block_by_number(&self, number: u64) -> Result<Block, LedgerError> {
        self.index.by_number(number)
    }
}

pub fn is_block_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == BLOCK_FILE_EXTENSION)
}

/// Write `block` as `<dir>/<number>.block`.
pub fn write_block_file(dir: &Path, block: &Block) -> Result<PathBuf, LedgerError> {
    let number = block.header.as_ref().map_or(0, |h| h.number);
    let path = dir.join(format!("{:08}.{}", number, BLOCK_FILE_EXTENSION));
    fs::write(&path, block.encode_to_vec())?;
    Ok(path)
}

/// Ledger over blocks held in memory.
#[derive(Debug)]
pub struct MemoryLedger {
    index: BlockIndex,
}

impl MemoryLedger {
    pub fn new(suite: &dyn CryptoSuite, blocks: impl IntoIterator<Item = Block>) -> Self {
        let mut index = BlockIndex::default();
        for block in blocks {
            index.insert(suite, block);
        }
        Self { index }
    }

    pub fn header_hash(&self, number: u64) -> Option<&[u8]> {
        self.index.hash_of.get(&number).map(Vec::as_slice)
    }
}

impl LedgerQuery for MemoryLedger {
    fn query_chain_info(&self) -> Result<ChainInfo, LedgerError> {
        Ok(self.index.chain_info())
    }

    fn query_block_by_hash(&self, hash: &[u8]) -> Result<Block, LedgerError> {
        self.index.by_hash(hash)
    }

    fn query_block_by_number(&self, number: u64) -> Result<Block, LedgerError> {
        self.index.by_number(number)
    }
}
