//! `RelayServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use relay_core::SessionId;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics as m;
use crate::page::{PageError, Pages};
use crate::relay::Relay;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{Heartbeat, run_ws_session};

const SCRIPT_JS: &str = include_str!("../assets/script.js");

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The relay hub.
    pub relay: Arc<Relay>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`.
    pub metrics: PrometheusHandle,
    /// `/` body with the server name filled in.
    pub index_html: Arc<str>,
    /// One permit per allowed WebSocket connection.
    pub permits: Arc<Semaphore>,
}

/// The relay's web server.
pub struct RelayServer {
    config: Arc<ServerConfig>,
    relay: Arc<Relay>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: PrometheusHandle,
    index_html: Arc<str>,
    permits: Arc<Semaphore>,
}

impl RelayServer {
    /// Create a new server around an existing hub.
    ///
    /// Renders the chat page once; fails only if the bundled template is broken.
    pub fn new(
        config: ServerConfig,
        relay: Arc<Relay>,
        metrics: PrometheusHandle,
    ) -> Result<Self, PageError> {
        let index_html = Pages::new()?.index(&config.server_name)?.into();
        let permits = Arc::new(Semaphore::new(config.max_connections));
        Ok(Self {
            config: Arc::new(config),
            relay,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
            index_html,
            permits,
        })
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            relay: Arc::clone(&self.relay),
            config: Arc::clone(&self.config),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            index_html: Arc::clone(&self.index_html),
            permits: Arc::clone(&self.permits),
        };

        Router::new()
            .route("/", get(index_handler))
            .route("/static/js/script.js", get(script_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), std::io::Error> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, server_name = %self.config.server_name, "relay server listening");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "server stopped with error");
            }
        });
        Ok((addr, handle))
    }

    /// The relay hub.
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.index_html.to_string())
}

/// GET /static/js/script.js
async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SCRIPT_JS,
    )
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.relay).await)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        m::render(&state.metrics),
    )
}

/// GET /ws: upgrade if a connection slot is free, otherwise 503.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Ok(permit) = Arc::clone(&state.permits).try_acquire_owned() else {
        warn!(
            max_connections = state.config.max_connections,
            "connection limit reached, refusing upgrade"
        );
        metrics::counter!(m::WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };

    let heartbeat = Heartbeat {
        interval: Duration::from_secs(state.config.heartbeat_interval_secs),
        timeout: Duration::from_secs(state.config.heartbeat_timeout_secs),
    };
    let send_queue_size = state.config.send_queue_size;
    let relay = Arc::clone(&state.relay);
    let token = state.shutdown.token();

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            run_ws_session(
                socket,
                SessionId::new(),
                relay,
                heartbeat,
                send_queue_size,
                token,
            )
            .await;
            drop(permit);
        })
}
