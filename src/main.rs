// File: src/main.rs
// Version: 4.0.0 - Multi-interface Hyperledger Fabric ledger explorer with block structure inspection

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use fabric_ledger_inspector::browser::LedgerQuery;
use fabric_ledger_inspector::crypto::{CryptoSuite, Sha2Suite};

mod block_inspector;
mod cli_interface;
mod cli_view;
mod data_models;
mod tui_dashboard;
mod web_server;

use crate::cli_interface::CliOptions;
use crate::data_models::AppConfig;

/// Command-line interface definition for the Fabric Ledger Inspector
#[derive(Parser)]
#[command(name = "fabric-ledger-inspector")]
#[command(about = "Multi-interface Hyperledger Fabric ledger explorer with TUI and Web dashboards")]
#[command(version)]
pub struct Cli {
    /// Directory of serialized blocks (`*.block`, as written by `peer channel fetch`)
    #[arg(short, long, value_name = "LEDGER_DIR")]
    pub ledger: PathBuf,

    /// Hash family used for block header hashes
    #[arg(long, value_enum, default_value_t = HashAlgorithm::Sha256)]
    pub hash: HashAlgorithm,

    /// Interface mode selection
    #[command(subcommand)]
    pub mode: InterfaceMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
}

impl HashAlgorithm {
    fn suite(self) -> Arc<dyn CryptoSuite> {
        match self {
            HashAlgorithm::Sha256 => Arc::new(Sha2Suite::sha256()),
            HashAlgorithm::Sha384 => Arc::new(Sha2Suite::sha384()),
        }
    }
}

/// Available interface modes
#[derive(Subcommand)]
pub enum InterfaceMode {
    /// Classic CLI interface: walk the channel backward from its tip
    Cli {
        /// Show last N blocks (0 = all)
        #[arg(short, long, default_value = "3")]
        count: u64,

        /// Stop before the block with this header hash (hex)
        #[arg(long, value_name = "HASH")]
        until_hash: Option<String>,

        /// Stop before the block with this number
        #[arg(long, value_name = "NUMBER")]
        until_number: Option<u64>,

        /// Fetch blocks by number instead of by hash
        #[arg(long)]
        by_number: bool,

        /// Show specific block with transaction details
        #[arg(short, long)]
        detail: Option<u64>,

        /// Show a single transaction by ID
        #[arg(short, long)]
        tx: Option<String>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Terminal UI dashboard (ratatui)
    Tui {
        /// Refresh interval in seconds
        #[arg(short, long, default_value = "5")]
        refresh: u64,
    },

    /// Web server with dashboard (axum + WebSocket)
    Web {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Bind address
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,

        /// Enable CORS for development
        #[arg(short, long)]
        cors: bool,
    },

    /// Dump block structure layer by layer (debugging tool)
    Inspect {
        /// Block number to investigate
        #[arg(short, long)]
        block: Option<u64>,

        /// Investigate every block in the ledger
        #[arg(short, long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so only warnings make it to stderr there
    let default_filter = match cli.mode {
        InterfaceMode::Tui { .. } => "warn",
        _ => "fabric_ledger_inspector=info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    if !cli.ledger.is_dir() {
        anyhow::bail!("Ledger path is not a directory: {:?}", cli.ledger);
    }

    let config = AppConfig {
        ledger_path: cli.ledger,
        crypto_suite: cli.hash.suite(),
    };

    match cli.mode {
        InterfaceMode::Cli { count, until_hash, until_number, by_number, detail, tx, json } => {
            if !json {
                println!("🔍 Fabric Ledger Inspector - CLI Mode");
            }
            let options = CliOptions { count, until_hash, until_number, by_number, detail, tx, json };
            cli_interface::run_cli_mode(&config, options).await
        }

        InterfaceMode::Tui { refresh } => tui_dashboard::run_tui_mode(&config, refresh).await,

        InterfaceMode::Web { port, bind, cors } => {
            println!("🌐 Fabric Ledger Inspector - Web Server Mode");
            web_server::run_web_mode(&config, &bind, port, cors).await
        }

        InterfaceMode::Inspect { block, all } => {
            println!("🔍 Fabric Ledger Inspector - Block Structure Investigation");
            run_inspector_mode(&config, block, all)
        }
    }
}

/// Run the block structure investigation mode
fn run_inspector_mode(config: &AppConfig, block: Option<u64>, all: bool) -> Result<()> {
    println!("📋 Checking ledger availability...");
    block_inspector::check_ledger_availability(&config.ledger_path)?;

    let ledger = config.open_ledger()?;
    let suite = config.crypto_suite.as_ref();

    if all {
        return block_inspector::inspect_all_blocks(&ledger, suite);
    }

    match block {
        Some(number) => block_inspector::inspect_block(&ledger, suite, number),
        None => {
            // Default to the tip
            let height = ledger.query_chain_info()?.height;
            if height == 0 {
                anyhow::bail!("Ledger holds no blocks");
            }
            block_inspector::inspect_block(&ledger, suite, height - 1)?;

            println!("\n💡 INVESTIGATION COMPLETE");
            println!("Next steps:");
            println!("  • Use -b/--block <NUMBER> to investigate a specific block");
            println!("  • Use -a/--all to investigate every block");
            Ok(())
        }
    }
}
