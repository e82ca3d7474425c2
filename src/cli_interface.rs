// File: src/cli_interface.rs
// CLI interface: channel browsing, block detail and transaction lookup

use anyhow::{Context, Result};

use fabric_ledger_inspector::block::decode_block;
use fabric_ledger_inspector::browser::{ChannelBrowser, LedgerQuery};
use fabric_ledger_inspector::crypto::block_header_hash;
use fabric_ledger_inspector::ledger_store::FileLedger;
use fabric_ledger_inspector::model::{BrowseConfig, ChannelSummary};

use crate::cli_view::{render_block_detail, render_block_table, render_transaction};
use crate::data_models::AppConfig;

/// Options collected from `cli` subcommand flags
#[derive(Debug, Default)]
pub struct CliOptions {
    pub count: u64,
    pub until_hash: Option<String>,
    pub until_number: Option<u64>,
    pub by_number: bool,
    pub detail: Option<u64>,
    pub tx: Option<String>,
    pub json: bool,
}

/// Execute CLI mode operations
pub async fn run_cli_mode(config: &AppConfig, options: CliOptions) -> Result<()> {
    let ledger = config
        .open_ledger()
        .with_context(|| format!("failed to open ledger at {}", config.ledger_path.display()))?;

    match (&options.detail, &options.tx) {
        (Some(number), None) => show_block_detail(config, &ledger, *number, options.json),
        (None, Some(tx_id)) => show_transaction(&ledger, tx_id, options.json),
        (None, None) => show_channel(config, &ledger, &options),
        (Some(_), Some(_)) => anyhow::bail!("Cannot specify both --detail and --tx options"),
    }
}

/// Create the browse configuration from CLI arguments
pub fn create_browse_config(count: u64, until_hash: Option<&str>, until_number: Option<u64>) -> Result<BrowseConfig> {
    match (until_hash, until_number) {
        (Some(hash), None) => Ok(BrowseConfig::target_previous_hash(hash)?),
        (None, Some(number)) => Ok(BrowseConfig::target_block_number(number)),
        (None, None) => Ok(BrowseConfig::block_count_limit(count)),
        (Some(_), Some(_)) => anyhow::bail!("Cannot specify both --until-hash and --until-number options"),
    }
}

/// Browse the channel and print the traversed blocks
fn show_channel(config: &AppConfig, ledger: &FileLedger, options: &CliOptions) -> Result<()> {
    let browse_config = create_browse_config(options.count, options.until_hash.as_deref(), options.until_number)?;
    let browser = ChannelBrowser::new(ledger);

    let summary = if options.by_number {
        browser.browse_by_number(config.crypto_suite.as_ref(), &browse_config)?
    } else {
        browser.browse(&browse_config)?
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.blocks.is_empty() {
        println!("No blocks found matching the criteria.");
        return Ok(());
    }

    render_block_table(&summary.block_basics);
    print_channel_statistics(&summary);
    Ok(())
}

/// Display detailed information for a specific block
fn show_block_detail(config: &AppConfig, ledger: &FileLedger, number: u64, json: bool) -> Result<()> {
    let block = ledger.query_block_by_number(number)?;
    let header_hash = match ledger.header_hash(number) {
        Some(hash) => hash.to_vec(),
        None => block
            .header
            .as_ref()
            .map(|h| block_header_hash(config.crypto_suite.as_ref(), h))
            .unwrap_or_default(),
    };
    let detail = decode_block(&block, &header_hash).with_context(|| format!("failed to decode block {}", number))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        render_block_detail(&detail);
    }
    Ok(())
}

/// Find a transaction anywhere in the channel
fn show_transaction(ledger: &FileLedger, tx_id: &str, json: bool) -> Result<()> {
    let summary = ChannelBrowser::new(ledger).browse(&BrowseConfig::unlimited())?;
    let Some(tx) = summary.find_transaction(tx_id) else {
        anyhow::bail!("Transaction {} not found in {} blocks", tx_id, summary.blocks.len());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(tx)?);
    } else {
        render_transaction(tx);
    }
    Ok(())
}

/// Print channel statistics summary
fn print_channel_statistics(summary: &ChannelSummary) {
    let writes: usize = summary.transactions.iter().map(|tx| tx.writes.len()).sum();
    let reads: usize = summary.transactions.iter().map(|tx| tx.reads.len()).sum();

    println!();
    println!("📊 Channel height: {}", summary.block_height);
    println!("  📦 Blocks traversed:     {:>8}", summary.blocks.len());
    println!("  ⚡ Transactions:         {:>8}", summary.transaction_total);
    println!("  📥 Reads:                {:>8}", reads);
    println!("  📤 Writes:               {:>8}", writes);
}
