// File: src/tui_dashboard.rs
// Terminal UI dashboard using ratatui

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};
use tokio::time::sleep;

use fabric_ledger_inspector::browser::ChannelBrowser;
use fabric_ledger_inspector::model::{BlockInfoWithTx, BrowseConfig, ChannelSummary};

use crate::cli_view::truncate_hash;
use crate::data_models::{AppConfig, ChainStats, DashboardData};

/// Blocks loaded per refresh
const DASHBOARD_WINDOW: u64 = 20;

/// Application state for TUI
pub struct TuiApp {
    pub config: AppConfig,
    pub dashboard_data: DashboardData,
    pub summary: ChannelSummary,
    pub table_state: TableState,
    pub refresh_interval: u64,
    pub last_update: Instant,
    pub last_error: Option<String>,
    pub should_quit: bool,
}

impl TuiApp {
    pub fn new(config: AppConfig, refresh_interval: u64) -> Self {
        Self {
            config,
            dashboard_data: DashboardData::default(),
            summary: ChannelSummary::default(),
            table_state: TableState::default(),
            refresh_interval,
            last_update: Instant::now(),
            last_error: None,
            should_quit: false,
        }
    }

    /// Reload the most recent blocks from the ledger directory
    pub async fn update_data(&mut self) -> Result<()> {
        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || load_summary(&config))
            .await
            .context("ledger load task failed")?;

        match result {
            Ok(summary) => {
                self.dashboard_data = DashboardData::from_summary(&summary, self.config.crypto_suite.name());
                self.summary = summary;
                self.last_error = None;
                let selected = self.table_state.selected().unwrap_or(0);
                self.table_state
                    .select((!self.summary.blocks.is_empty()).then(|| selected.min(self.summary.blocks.len() - 1)));
            }
            // Keep showing the previous window; the ledger may be mid-write
            Err(e) => {
                tracing::warn!(error = %e, "dashboard refresh failed");
                self.last_error = Some(format!("{:#}", e));
            }
        }

        self.last_update = Instant::now();
        Ok(())
    }

    /// Block currently highlighted in the table
    pub fn selected_block(&self) -> Option<&BlockInfoWithTx> {
        self.table_state.selected().and_then(|i| self.summary.blocks.get(i))
    }

    /// Handle keyboard input
    pub fn handle_input(&mut self, key: KeyCode) {
        let len = self.summary.blocks.len();
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                // Force refresh
                self.last_update = Instant::now() - Duration::from_secs(self.refresh_interval);
            }
            KeyCode::Down if len > 0 => {
                let next = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
                self.table_state.select(Some(next));
            }
            KeyCode::Up if len > 0 => {
                let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
                self.table_state.select(Some(prev));
            }
            _ => {}
        }
    }
}

fn load_summary(config: &AppConfig) -> Result<ChannelSummary> {
    let ledger = config.open_ledger()?;
    let summary = ChannelBrowser::new(&ledger).browse(&BrowseConfig::block_count_limit(DASHBOARD_WINDOW))?;
    Ok(summary)
}

/// Run the TUI dashboard
pub async fn run_tui_mode(config: &AppConfig, refresh: u64) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TuiApp::new(config.clone(), refresh);
    let outcome = event_loop(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    println!("👋 Fabric Ledger Inspector - Dashboard closed");
    outcome
}

async fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut TuiApp) -> Result<()> {
    app.update_data().await?;

    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_input(key.code);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }

        if app.last_update.elapsed() >= Duration::from_secs(app.refresh_interval) {
            app.update_data().await?;
        }

        // Small async sleep to prevent busy waiting
        sleep(Duration::from_millis(100)).await;
    }
}

/// Render the UI
fn ui(f: &mut Frame, app: &mut TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),  // Header
            Constraint::Length(3),  // Channel stats
            Constraint::Min(10),    // Blocks and transactions
            Constraint::Length(3),  // Footer
        ])
        .split(f.area());

    render_header(f, chunks[0], app);
    render_chain_stats(f, chunks[1], &app.dashboard_data.chain_stats);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    render_recent_blocks(f, body[0], app);
    render_block_transactions(f, body[1], app.selected_block());

    render_footer(f, chunks[3], app.last_error.as_deref());
}

/// Render header section
fn render_header(f: &mut Frame, area: Rect, app: &TuiApp) {
    let stats = &app.dashboard_data.chain_stats;
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("🔍 ", Style::default().fg(Color::Yellow)),
            Span::styled("Fabric Ledger Inspector", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled(" - Terminal Dashboard", Style::default().fg(Color::Gray)),
        ]),
        Line::from(vec![
            Span::styled("Ledger: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{:?}", app.config.ledger_path), Style::default().fg(Color::White)),
            Span::styled("  Channel: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.channel_id.clone().unwrap_or_else(|| "-".to_string()), Style::default().fg(Color::White)),
            Span::styled("  Hash: ", Style::default().fg(Color::Gray)),
            Span::styled(stats.hash_suite.clone(), Style::default().fg(Color::White)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Fabric Channel Explorer"));

    f.render_widget(header, area);
}

/// Render channel statistics
fn render_chain_stats(f: &mut Frame, area: Rect, stats: &ChainStats) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(33), Constraint::Percentage(33), Constraint::Percentage(34)])
        .split(area);

    let height = Paragraph::new(format!("{} (loaded {})", stats.block_height, stats.blocks_loaded))
        .block(Block::default().borders(Borders::ALL).title("📦 Height"));
    f.render_widget(height, chunks[0]);

    let txs = Paragraph::new(stats.transactions_loaded.to_string())
        .block(Block::default().borders(Borders::ALL).title("⚡ Transactions"));
    f.render_widget(txs, chunks[1]);

    let checked = stats.valid_transactions + stats.invalid_transactions;
    let percent = if checked == 0 { 0 } else { (stats.valid_transactions * 100 / checked) as u16 };
    let valid_gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("✅ Valid"))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(percent)
        .label(format!("{}/{}", stats.valid_transactions, checked));
    f.render_widget(valid_gauge, chunks[2]);
}

/// Render recent blocks
fn render_recent_blocks(f: &mut Frame, area: Rect, app: &mut TuiApp) {
    let header_cells = ["Number", "Hash", "Created", "TXs"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = app.dashboard_data.recent_blocks.iter().map(|block| {
        let hash_short = if block.hash.len() > 16 { format!("{}...", &block.hash[..16]) } else { block.hash.clone() };
        let created = block
            .created_at
            .as_deref()
            .and_then(|at| at.split(' ').nth(1))
            .unwrap_or("-")
            .to_string();

        Row::new(vec![
            Cell::from(block.number.to_string()),
            Cell::from(hash_short),
            Cell::from(created),
            Cell::from(block.transaction_count.to_string()),
        ])
    });

    let widths = [Constraint::Length(8), Constraint::Length(20), Constraint::Length(10), Constraint::Length(5)];

    let table = Table::new(rows, widths)
        .header(header)
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title("📊 Recent Blocks"));

    f.render_stateful_widget(table, area, &mut app.table_state);
}

/// Render the transactions of the selected block
fn render_block_transactions(f: &mut Frame, area: Rect, block: Option<&BlockInfoWithTx>) {
    let title = block.map_or_else(|| "⚡ Transactions".to_string(), |b| format!("⚡ Block {} Transactions", b.basic.number));

    let header_cells = ["TxID", "Chaincode", "Caller", "R/W", "Valid"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = block.into_iter().flat_map(|b| b.transactions.iter()).map(|tx| {
        let tx_short = if tx.tx_id.chars().count() > 12 { format!("{}...", truncate_hash(&tx.tx_id, 12)) } else { tx.tx_id.clone() };
        let chaincode = if tx.chaincode_id.is_empty() { format!("type {}", tx.tx_type) } else { tx.chaincode_id.clone() };
        let (valid, style) = match tx.is_valid() {
            Some(true) => ("yes", Style::default().fg(Color::Green)),
            Some(false) => ("no", Style::default().fg(Color::Red)),
            None => ("-", Style::default().fg(Color::Gray)),
        };

        Row::new(vec![
            Cell::from(tx_short),
            Cell::from(chaincode),
            Cell::from(format!("{}/{}", tx.caller_msp_id, tx.caller_name)),
            Cell::from(format!("{}/{}", tx.reads.len(), tx.writes.len())),
            Cell::from(valid).style(style),
        ])
    });

    let widths = [
        Constraint::Length(16),
        Constraint::Length(14),
        Constraint::Min(16),
        Constraint::Length(7),
        Constraint::Length(5),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(table, area);
}

/// Render footer
fn render_footer(f: &mut Frame, area: Rect, last_error: Option<&str>) {
    let footer = match last_error {
        Some(e) => Paragraph::new(format!("⚠️  {}", e)).style(Style::default().fg(Color::Red)),
        None => Paragraph::new("Press 'q' to quit, 'r' to refresh, ↑/↓ to select a block")
            .style(Style::default().fg(Color::Gray)),
    }
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}
