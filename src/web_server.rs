// File: src/web_server.rs
// Web server with dashboard and WebSocket API - Channel monitoring

use anyhow::{Context, Result};
use axum::{
    extract::{ws::Message, ws::WebSocket, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, Router},
    Json,
};
use futures::{sink::SinkExt, stream::StreamExt};
use notify::{Event, RecursiveMode, Watcher};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::{broadcast, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use fabric_ledger_inspector::block::decode_block;
use fabric_ledger_inspector::browser::{ChannelBrowser, LedgerQuery};
use fabric_ledger_inspector::error::{BrowseError, LedgerError};
use fabric_ledger_inspector::ledger_store::{FileLedger, BLOCK_FILE_EXTENSION};
use fabric_ledger_inspector::model::{BlockInfoWithTx, BrowseConfig, ChannelSummary, RawBrowseConfig, TransactionInfo};

use crate::data_models::{AppConfig, DashboardData, WebSocketMessage};

/// Blocks shown on the dashboard
const DASHBOARD_WINDOW: u64 = 200;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ledger: Arc<RwLock<Arc<FileLedger>>>,
    pub dashboard_data: Arc<RwLock<DashboardData>>,
    pub update_broadcaster: broadcast::Sender<DashboardData>,
}

type ApiError = (StatusCode, String);

/// Run the web server with channel monitoring
pub async fn run_web_mode(config: &AppConfig, bind: &str, port: u16, enable_cors: bool) -> Result<()> {
    // Create broadcast channel for dashboard updates
    let (update_tx, _update_rx) = broadcast::channel(100);

    let ledger = load_ledger(config.clone()).await?;
    let app_state = AppState {
        config: config.clone(),
        ledger: Arc::new(RwLock::new(ledger)),
        dashboard_data: Arc::new(RwLock::new(DashboardData::default())),
        update_broadcaster: update_tx,
    };

    update_dashboard_data(&app_state).await?;

    let mut app = Router::new()
        .route("/", get(dashboard_html))
        .route("/api/dashboard", get(get_dashboard_data))
        .route("/api/channel", get(get_channel))
        .route("/api/block/:number", get(get_block_detail))
        .route("/api/tx/:tx_id", get(get_transaction))
        .route("/ws", get(websocket_handler))
        .with_state(app_state.clone());

    // Add CORS if enabled
    if enable_cors {
        app = app.layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(tower_http::cors::Any)
                    .allow_methods(tower_http::cors::Any)
                    .allow_headers(tower_http::cors::Any),
            ),
        );
    }

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;

    println!("🌐 Web dashboard available at: http://{}", addr);
    println!("🔌 WebSocket endpoint: ws://{}/ws", addr);
    println!("📊 API endpoints:");
    println!("   GET /api/dashboard - Dashboard data");
    println!("   GET /api/channel?limit_type=0&block_count_limit=N - Channel traversal");
    println!("   GET /api/block/:number - Block details");
    println!("   GET /api/tx/:tx_id - Transaction details");

    let watch_state = app_state.clone();
    tokio::spawn(async move {
        start_ledger_file_watcher(watch_state).await;
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// File system watcher for new or rewritten block files
async fn start_ledger_file_watcher(state: AppState) {
    let ledger_path = state.config.ledger_path.clone();
    tracing::info!(path = %ledger_path.display(), "watching ledger directory");

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
        Ok(event) => {
            if event.kind.is_create() || event.kind.is_modify() {
                let has_block_files = event
                    .paths
                    .iter()
                    .any(|p| p.extension().is_some_and(|ext| ext == BLOCK_FILE_EXTENSION));

                if has_block_files {
                    if let Err(e) = tx.blocking_send(()) {
                        tracing::warn!(error = %e, "failed to forward file change event");
                    }
                }
            }
        }
        Err(e) => tracing::warn!(error = ?e, "file watch error"),
    });

    let mut watcher = match watcher {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::error!(error = %e, "failed to create file watcher, manual refresh only");
            return;
        }
    };

    if let Err(e) = watcher.watch(&ledger_path, RecursiveMode::NonRecursive) {
        tracing::error!(error = %e, "failed to start file watcher");
        return;
    }

    let mut debounce_handle: Option<tokio::task::JoinHandle<()>> = None;

    while rx.recv().await.is_some() {
        // Cancel any pending update
        if let Some(handle) = debounce_handle.take() {
            handle.abort();
        }

        let update_state = state.clone();
        debounce_handle = Some(tokio::spawn(async move {
            // Wait for writes to complete
            tokio::time::sleep(Duration::from_millis(500)).await;

            if let Err(e) = reload_ledger(&update_state).await {
                tracing::error!(error = %format!("{:#}", e), "ledger reload failed");
                return;
            }
            if let Err(e) = update_dashboard_data(&update_state).await {
                tracing::error!(error = %format!("{:#}", e), "dashboard update failed");
                return;
            }

            let data = update_state.dashboard_data.read().await.clone();
            // No subscribers is not an error
            let _ = update_state.update_broadcaster.send(data);
            tracing::info!("dashboard updated after block file change");
        }));
    }

    drop(watcher);
}

async fn load_ledger(config: AppConfig) -> Result<Arc<FileLedger>> {
    let ledger = tokio::task::spawn_blocking(move || config.open_ledger())
        .await
        .context("ledger load task failed")??;
    Ok(Arc::new(ledger))
}

async fn reload_ledger(state: &AppState) -> Result<()> {
    let ledger = load_ledger(state.config.clone()).await?;
    *state.ledger.write().await = ledger;
    Ok(())
}

/// Run a traversal on the blocking pool against the current ledger snapshot
async fn browse(state: &AppState, config: BrowseConfig) -> Result<ChannelSummary, ApiError> {
    let ledger = state.ledger.read().await.clone();
    tokio::task::spawn_blocking(move || ChannelBrowser::new(ledger.as_ref()).browse(&config))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(browse_error_response)
}

fn browse_error_response(err: BrowseError) -> ApiError {
    let status = match &err {
        BrowseError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// Serve the main dashboard HTML page
async fn dashboard_html() -> Html<&'static str> {
    Html(include_str!("dashboard.html"))
}

/// Get dashboard data via REST API
async fn get_dashboard_data(State(state): State<AppState>) -> Json<DashboardData> {
    let data = state.dashboard_data.read().await;
    Json(data.clone())
}

/// Traverse the channel with the legacy numeric query form
async fn get_channel(
    Query(raw): Query<RawBrowseConfig>,
    State(state): State<AppState>,
) -> Result<Json<ChannelSummary>, ApiError> {
    let config = BrowseConfig::try_from(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(browse(&state, config).await?))
}

/// Get block details via REST API
async fn get_block_detail(
    Path(number): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<BlockInfoWithTx>, ApiError> {
    Ok(Json(read_block(&state, number).await?))
}

/// Get a transaction by ID via REST API
async fn get_transaction(
    Path(tx_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionInfo>, ApiError> {
    Ok(Json(find_transaction(&state, &tx_id).await?))
}

async fn read_block(state: &AppState, number: u64) -> Result<BlockInfoWithTx, ApiError> {
    let ledger = state.ledger.read().await.clone();
    tokio::task::spawn_blocking(move || {
        let block = ledger.query_block_by_number(number).map_err(|e| match e {
            LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;
        let hash = ledger.header_hash(number).map(<[u8]>::to_vec).unwrap_or_default();
        decode_block(&block, &hash).map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
}

async fn find_transaction(state: &AppState, tx_id: &str) -> Result<TransactionInfo, ApiError> {
    let summary = browse(state, BrowseConfig::unlimited()).await?;
    summary
        .find_transaction(tx_id)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("transaction {} not found", tx_id)))
}

/// WebSocket connection handler
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle individual WebSocket connections
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Send initial dashboard data
    let message = WebSocketMessage::DashboardData { data: state.dashboard_data.read().await.clone() };
    if let Ok(json) = serde_json::to_string(&message) {
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    let mut update_receiver = state.update_broadcaster.subscribe();

    loop {
        tokio::select! {
            update = update_receiver.recv() => {
                let data = match update {
                    Ok(data) => data,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if let Ok(json) = serde_json::to_string(&WebSocketMessage::DashboardData { data }) {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                let Some(Ok(msg)) = msg else {
                    break;
                };

                match msg {
                    Message::Text(text) => {
                        let response = match serde_json::from_str::<WebSocketMessage>(&text) {
                            Ok(request) => handle_websocket_message(request, &state).await,
                            Err(e) => WebSocketMessage::Error { message: format!("Invalid message: {}", e) },
                        };

                        if let Ok(json) = serde_json::to_string(&response) {
                            if sender.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }
}

/// Handle individual WebSocket messages
async fn handle_websocket_message(message: WebSocketMessage, state: &AppState) -> WebSocketMessage {
    match message {
        WebSocketMessage::GetDashboard => {
            let data = state.dashboard_data.read().await;
            WebSocketMessage::DashboardData { data: data.clone() }
        }

        WebSocketMessage::GetBlockDetail { number } => match read_block(state, number).await {
            Ok(block) => WebSocketMessage::BlockDetail { block },
            Err((_, message)) => WebSocketMessage::Error { message: format!("Failed to get block {}: {}", number, message) },
        },

        WebSocketMessage::GetTransaction { tx_id } => match find_transaction(state, &tx_id).await {
            Ok(transaction) => WebSocketMessage::TransactionDetail { transaction },
            Err((_, message)) => WebSocketMessage::Error { message },
        },

        WebSocketMessage::Ping => WebSocketMessage::Pong,

        _ => WebSocketMessage::Error { message: "Unsupported message type".to_string() },
    }
}

/// Rebuild dashboard data from the current ledger snapshot
async fn update_dashboard_data(state: &AppState) -> Result<()> {
    let summary = browse(state, BrowseConfig::block_count_limit(DASHBOARD_WINDOW))
        .await
        .map_err(|(_, message)| anyhow::anyhow!(message))?;

    let data = DashboardData::from_summary(&summary, state.config.crypto_suite.name());
    tracing::info!(
        height = data.chain_stats.block_height,
        blocks = data.chain_stats.blocks_loaded,
        "dashboard data refreshed"
    );

    *state.dashboard_data.write().await = data;
    Ok(())
}
