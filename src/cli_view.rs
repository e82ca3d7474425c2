// File: src/cli_view.rs
// Version: v2.0.0 - Boxed table renderings for blocks and transactions

use fabric_ledger_inspector::model::{BlockInfoBasic, BlockInfoWithTx, TransactionInfo};

/// Print blocks in a formatted table
pub fn render_block_table(blocks: &[BlockInfoBasic]) {
    println!();
    println!("╭─{:─<8}─┬─{:─<64}─┬─{:─<6}─╮", "", "", "");
    println!("│ {:^8} │ {:^64} │ {:^6} │", "Number", "Hash", "TXs");
    println!("├─{:─<8}─┼─{:─<64}─┼─{:─<6}─┤", "", "", "");
    for block in blocks {
        println!(
            "│ {:>8} │ {:<64} │ {:>6} │",
            block.number,
            truncate_hash(&block.block_hash, 64),
            block.transaction_count
        );
    }
    println!("╰─{:─<8}─┴─{:─<64}─┴─{:─<6}─╯", "", "", "");
}

/// Print detailed block information
pub fn render_block_detail(block: &BlockInfoWithTx) {
    println!();
    println!("🔍 Block Detail View");
    println!("╭─{:─<70}─╮", "");
    println!("│ Number: {:>8}  Transactions: {:>6}{:>38} │", block.basic.number, block.basic.transaction_count, "");
    println!("│ Hash:     {:<60} │", truncate_hash(&block.basic.block_hash, 60));
    println!("│ Previous: {:<60} │", truncate_hash(&block.basic.previous_hash, 60));
    println!("├─{:─<70}─┤", "");

    for (i, tx) in block.transactions.iter().enumerate() {
        render_transaction_section(i + 1, tx);
    }
    println!("╰─{:─<70}─╯", "");
}

/// Print one transaction's fields and read/write sets
pub fn render_transaction(tx: &TransactionInfo) {
    println!();
    println!("╭─{:─<70}─╮", "");
    render_transaction_section(1, tx);
    println!("╰─{:─<70}─╯", "");
}

fn render_transaction_section(position: usize, tx: &TransactionInfo) {
    println!("│ {:>3}. {:<65} │", position, truncate_hash(&tx.tx_id, 65));
    println!("│      Created: {:<19}  Type: {:>3}  Channel: {:<16} │", tx.created_at, tx.tx_type, tx.channel_id);
    if !tx.chaincode_id.is_empty() {
        println!("│      Chaincode: {:<55}│", format!("{} {}", tx.chaincode_id, tx.chaincode_version));
        println!("│      Args: {:<60}│", format!("{:?}", tx.args));
    }
    println!(
        "│      Caller: {:<58}│",
        format!("{} / {} / {}", tx.caller_msp_id, tx.caller_name, tx.caller_ou)
    );
    if let Some(code) = tx.validation_code {
        let status = if code == 0 { "✅ VALID".to_string() } else { format!("❌ code {}", code) };
        println!("│      Validation: {:<54}│", status);
    }
    for read in tx.reads.iter().take(5) {
        println!("│      📥 {:<63}│", format!("{}:{} @ {}:{}", read.namespace, read.key, read.block_num, read.tx_num));
    }
    if tx.reads.len() > 5 {
        println!("│      ... and {} more reads{:<44}│", tx.reads.len() - 5, "");
    }
    for write in tx.writes.iter().take(5) {
        let value = if write.is_delete { "<deleted>".to_string() } else { truncate_hash(&write.value, 32) };
        println!("│      📤 {:<63}│", format!("{}:{} = {}", write.namespace, write.key, value));
    }
    if tx.writes.len() > 5 {
        println!("│      ... and {} more writes{:<43}│", tx.writes.len() - 5, "");
    }
    println!("├─{:─<70}─┤", "");
}

/// Truncate hash string to specified length
pub fn truncate_hash(hash: &str, max_len: usize) -> String {
    if hash.chars().count() > max_len {
        hash.chars().take(max_len).collect()
    } else {
        hash.to_string()
    }
}
