// File: src/browser.rs
// Version: 1.0.0 - Backward channel traversal with configurable stop conditions
//
// A traversal is strictly sequential: the next block's hash is only known
// once the current block has been fetched. Cancellation is checked between
// fetches, never inside a block decode.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::block::decode_block;
use crate::crypto::{block_header_hash, CryptoSuite};
use crate::error::{BrowseError, LedgerError};
use crate::model::{BlockInfoWithTx, BrowseConfig, ChainInfo, ChannelSummary, StopCondition};
use crate::protos::Block;

/// Ledger queries a traversal depends on. Timeouts and retries belong to the implementor.
pub trait LedgerQuery {
    fn query_chain_info(&self) -> Result<ChainInfo, LedgerError>;
    fn query_block_by_hash(&self, hash: &[u8]) -> Result<Block, LedgerError>;
    fn query_block_by_number(&self, number: u64) -> Result<Block, LedgerError>;
}

impl<L: LedgerQuery + ?Sized> LedgerQuery for &L {
    fn query_chain_info(&self) -> Result<ChainInfo, LedgerError> {
        (**self).query_chain_info()
    }

    fn query_block_by_hash(&self, hash: &[u8]) -> Result<Block, LedgerError> {
        (**self).query_block_by_hash(hash)
    }

    fn query_block_by_number(&self, number: u64) -> Result<Block, LedgerError> {
        (**self).query_block_by_number(number)
    }
}

impl<L: LedgerQuery + ?Sized> LedgerQuery for Arc<L> {
    fn query_chain_info(&self) -> Result<ChainInfo, LedgerError> {
        (**self).query_chain_info()
    }

    fn query_block_by_hash(&self, hash: &[u8]) -> Result<Block, LedgerError> {
        (**self).query_block_by_hash(hash)
    }

    fn query_block_by_number(&self, number: u64) -> Result<Block, LedgerError> {
        (**self).query_block_by_number(number)
    }
}

/// Shared flag a caller flips to stop a running traversal at the next block boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Walk the channel from its tip by header hash.
pub fn browse_channel<L: LedgerQuery + ?Sized>(ledger: &L, config: &BrowseConfig) -> Result<ChannelSummary, BrowseError> {
    ChannelBrowser::new(ledger).browse(config)
}

pub struct ChannelBrowser<'a, L: ?Sized> {
    ledger: &'a L,
    cancel: Option<CancelToken>,
}

/// Accumulated traversal results.
struct Accumulator {
    summary: ChannelSummary,
    fetched: u64,
}

impl Accumulator {
    fn new(height: u64) -> Self {
        Self {
            summary: ChannelSummary { block_height: height, ..ChannelSummary::default() },
            fetched: 0,
        }
    }

    fn push(&mut self, block: BlockInfoWithTx) {
        self.fetched += 1;
        self.summary.transaction_total += block.basic.transaction_count;
        self.summary.transactions.extend(block.transactions.iter().cloned());
        self.summary.block_basics.push(block.basic.clone());
        self.summary.blocks.push(block);
    }
}

impl<'a, L: LedgerQuery + ?Sized> ChannelBrowser<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger, cancel: None }
    }

    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Follow previous-hash links from the tip until a stop condition or genesis.
    pub fn browse(&self, config: &BrowseConfig) -> Result<ChannelSummary, BrowseError> {
        config.validate()?;

        let info = self.ledger.query_chain_info().map_err(BrowseError::ChainInfo)?;
        tracing::info!(height = info.height, stop = ?config.stop, "browsing channel by hash");

        let mut acc = Accumulator::new(info.height);
        let mut pointer = info.current_block_hash;
        let mut expected_number = info.height.checked_sub(1);

        loop {
            self.check_cancelled(acc.fetched)?;
            if should_stop(config, acc.fetched, &pointer, expected_number) || pointer.is_empty() {
                break;
            }

            let block = self.ledger.query_block_by_hash(&pointer).map_err(|source| BrowseError::Fetch {
                target: format!("hash {}", hex::encode(&pointer)),
                source,
            })?;
            let decoded = decode_block(&block, &pointer).map_err(|source| BrowseError::Decode {
                number: block_number(&block),
                source,
            })?;

            if let Some(expected) = expected_number {
                if expected != decoded.basic.number {
                    tracing::warn!(expected, actual = decoded.basic.number, "block number out of sequence");
                }
            }
            expected_number = decoded.basic.number.checked_sub(1);
            pointer = block.header.map(|h| h.previous_hash).unwrap_or_default();
            acc.push(decoded);
        }

        tracing::info!(
            blocks = acc.fetched,
            transactions = acc.summary.transaction_total,
            "channel browse complete"
        );
        Ok(acc.summary)
    }

    /// Walk down from `height - 1` by number, hashing each header with `suite`.
    pub fn browse_by_number(&self, suite: &dyn CryptoSuite, config: &BrowseConfig) -> Result<ChannelSummary, BrowseError> {
        config.validate()?;

        let info = self.ledger.query_chain_info().map_err(BrowseError::ChainInfo)?;
        tracing::info!(height = info.height, stop = ?config.stop, suite = suite.name(), "browsing channel by number");

        let mut acc = Accumulator::new(info.height);
        let mut next = info.height.checked_sub(1);
        let mut pointer = info.current_block_hash;

        while let Some(number) = next {
            self.check_cancelled(acc.fetched)?;
            if should_stop(config, acc.fetched, &pointer, Some(number)) || pointer.is_empty() {
                break;
            }

            let block = self.ledger.query_block_by_number(number).map_err(|source| BrowseError::Fetch {
                target: format!("number {}", number),
                source,
            })?;
            let header_hash = block.header.as_ref().map(|h| block_header_hash(suite, h)).unwrap_or_default();
            let decoded = decode_block(&block, &header_hash).map_err(|source| BrowseError::Decode { number, source })?;

            pointer = block.header.map(|h| h.previous_hash).unwrap_or_default();
            next = number.checked_sub(1);
            acc.push(decoded);
        }

        tracing::info!(
            blocks = acc.fetched,
            transactions = acc.summary.transaction_total,
            "channel browse complete"
        );
        Ok(acc.summary)
    }

    fn check_cancelled(&self, fetched: u64) -> Result<(), BrowseError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(BrowseError::Cancelled { blocks: fetched }),
            _ => Ok(()),
        }
    }
}

/// The configured stop condition, evaluated before fetching the block under `pointer`.
fn should_stop(config: &BrowseConfig, fetched: u64, pointer: &[u8], number: Option<u64>) -> bool {
    match &config.stop {
        StopCondition::BlockCountLimit(limit) => *limit > 0 && fetched >= *limit,
        StopCondition::TargetPreviousHash(target) => pointer == target.as_slice(),
        StopCondition::TargetBlockNumber(target) => number == Some(*target),
    }
}

fn block_number(block: &Block) -> u64 {
    block.header.as_ref().map_or(0, |h| h.number)
}
