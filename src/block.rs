// File: src/block.rs
// Version: 1.0.0 - Decode every transaction slot of a block

use crate::error::{DecodeError, Layer};
use crate::model::{BlockInfoBasic, BlockInfoWithTx};
use crate::protos::{metadata_index, Block};
use crate::transaction::assemble_transaction;

/// Decode `block`, whose header hash is supplied by the caller.
///
/// Fails on the first transaction slot that does not decode; the error names
/// the block number and slot index.
pub fn decode_block(block: &Block, current_header_hash: &[u8]) -> Result<BlockInfoWithTx, DecodeError> {
    let header = block
        .header
        .as_ref()
        .ok_or(DecodeError::MissingField { layer: Layer::Block, field: "header" })?;
    let data = block
        .data
        .as_ref()
        .ok_or(DecodeError::MissingField { layer: Layer::Block, field: "data" })?;

    tracing::debug!(number = header.number, transactions = data.data.len(), "decoding block");

    let validation_codes = transaction_filter(block);
    let mut transactions = Vec::with_capacity(data.data.len());

    for (index, raw) in data.data.iter().enumerate() {
        let mut info = assemble_transaction(raw).map_err(|source| DecodeError::InTransaction {
            block: header.number,
            index,
            source: Box::new(source),
        })?;
        info.validation_code = validation_codes.and_then(|codes| codes.get(index).copied());
        transactions.push(info);
    }

    Ok(BlockInfoWithTx {
        basic: BlockInfoBasic {
            number: header.number,
            block_hash: hex::encode(current_header_hash),
            previous_hash: hex::encode(&header.previous_hash),
            transaction_count: transactions.len() as u64,
        },
        transactions,
    })
}

/// Per-transaction validation codes, if the committer wrote them.
fn transaction_filter(block: &Block) -> Option<&[u8]> {
    let metadata = block.metadata.as_ref()?;
    let filter = metadata.metadata.get(metadata_index::TRANSACTIONS_FILTER)?;
    if filter.is_empty() { None } else { Some(filter.as_slice()) }
}
