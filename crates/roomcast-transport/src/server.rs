//! WebSocket transport server using Axum.
//!
//! Handles HTTP upgrade to WebSocket, connection ids, heartbeat pings, and
//! hands every text frame to the chat handler.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use roomcast_protocol::ConnectionId;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::client::ClientConnection;
use crate::peers::PeerTable;

/// Implemented by the chat server. The transport calls it for every
/// connection lifecycle step and every inbound text frame.
///
/// Calls must not block; anything sent back goes through the [`PeerTable`].
pub trait EventHandler: Send + Sync + 'static {
    /// A connection was accepted and its outbound queue is live.
    fn on_connect(&self, id: &ConnectionId, display_name: Option<&str>);

    /// A text frame arrived.
    fn on_frame(&self, id: &ConnectionId, text: &str);

    /// A frame arrived that cannot be read as text.
    fn on_malformed(&self, id: &ConnectionId, reason: &str);

    /// The connection is gone. Called exactly once per connection.
    fn on_disconnect(&self, id: &ConnectionId);
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Ping interval; a client silent for two intervals is dropped
    pub heartbeat_interval: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 7070,
            hostname: "127.0.0.1".into(),
            enable_cors: false,
            max_connections: Some(256),
            heartbeat_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: EventHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    peers: PeerTable,
    /// Claimed connection slots (for health check and the limit)
    client_count: Arc<AtomicUsize>,
}

/// The transport server: accepts WebSocket connections and pumps frames.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
    client_count: Arc<AtomicUsize>,
}

impl TransportServer {
    /// Bind and start serving. `peers` must be the same table the handler
    /// delivers through.
    pub async fn start<H: EventHandler>(
        config: TransportConfig,
        handler: Arc<H>,
        peers: PeerTable,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let client_count = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
            peers,
            client_count: client_count.clone(),
        });

        let mut app = Router::new()
            .route("/ws", get(ws_upgrade_handler::<H>))
            .route("/health", get(health_handler::<H>))
            .with_state(state);
        if config.enable_cors {
            app = app.layer(CorsLayer::permissive());
        }

        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Roomcast transport listening on ws://{}:{}/ws", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
            client_count,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Roomcast transport server stopped");
    }
}

/// One claimed place under `max_connections`. Released on drop, so a
/// handshake that never completes gives its slot back.
struct ConnectionSlot {
    count: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    fn claim(count: &Arc<AtomicUsize>, max: Option<usize>) -> Option<Self> {
        count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match max {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .ok()?;
        Some(Self {
            count: count.clone(),
        })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConnectParams {
    name: Option<String>,
}

async fn ws_upgrade_handler<H: EventHandler>(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    let Some(slot) = ConnectionSlot::claim(&state.client_count, state.config.max_connections)
    else {
        warn!(
            "Connection rejected: max connections reached ({})",
            state.config.max_connections.unwrap_or_default()
        );
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, slot, params.name))
        .into_response()
}

async fn health_handler<H: EventHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.client_count.load(Ordering::Relaxed),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection<H: EventHandler>(
    socket: WebSocket,
    state: Arc<AppState<H>>,
    slot: ConnectionSlot,
    display_name: Option<String>,
) {
    let mut client = ClientConnection::new(ConnectionId::generate());
    let client_id = client.id.clone();
    info!("Client connected: {client_id}");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound queue must be in the table before the handler greets the client
    let (peer_tx, mut peer_rx) = mpsc::unbounded_channel();
    state.peers.insert(client_id.clone(), peer_tx);
    state.handler.on_connect(&client_id, display_name.as_deref());

    let heartbeat = state.config.heartbeat_interval;
    let mut ticker = heartbeat
        .map(|every| tokio::time::interval_at(tokio::time::Instant::now() + every, every));

    loop {
        let tick = async {
            match ticker.as_mut() {
                Some(t) => {
                    t.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            // Incoming WebSocket message
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        client.touch();
                        state.handler.on_frame(&client_id, text.as_str());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        client.touch();
                        match std::str::from_utf8(&data) {
                            Ok(text) => state.handler.on_frame(&client_id, text),
                            Err(e) => {
                                debug!("Non-UTF-8 binary frame from {client_id}: {e}");
                                let reason = "Binary frame is not UTF-8";
                                state.handler.on_malformed(&client_id, reason);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        client.touch();
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        client.touch();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed connection: {client_id}");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {client_id}: {e}");
                        break;
                    }
                }
            }

            // Frames queued for this client by the chat handler
            outbound = peer_rx.recv() => {
                match outbound {
                    Some(frame) => {
                        if let Err(e) = ws_tx.send(frame).await {
                            warn!("Failed to send to {client_id}: {e}");
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Heartbeat
            _ = tick => {
                let every = heartbeat.unwrap_or_default();
                if client.is_stale(every * 2) {
                    warn!("Heartbeat timeout for client {client_id}");
                    break;
                }
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    state.peers.remove(&client_id);
    state.handler.on_disconnect(&client_id);

    drop(slot);
    info!(
        "Client disconnected: {client_id} (total: {}, connected for {:?})",
        state.client_count.load(Ordering::Relaxed),
        client.connected_at.elapsed()
    );
}
