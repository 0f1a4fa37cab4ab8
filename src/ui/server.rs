//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::domain::MessagePusher;
use crate::usecase::{EventDispatcher, PersistenceGateway, SessionRegistry};

use super::{
    handler::{get_user_locations, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket location relay server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(dispatcher, registry, gateway, message_pusher);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// EventDispatcher（インバウンドイベント処理の統括）
    dispatcher: Arc<EventDispatcher>,
    /// SessionRegistry（接続とユーザー識別の対応）
    registry: Arc<SessionRegistry>,
    /// PersistenceGateway（位置情報の永続化と読み戻し）
    gateway: Arc<PersistenceGateway>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl Server {
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        registry: Arc<SessionRegistry>,
        gateway: Arc<PersistenceGateway>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            dispatcher,
            registry,
            gateway,
            message_pusher,
        }
    }

    /// Build the axum router (shared between `run` and in-process tests)
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            dispatcher: self.dispatcher.clone(),
            registry: self.registry.clone(),
            gateway: self.gateway.clone(),
            message_pusher: self.message_pusher.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/locations/{user_id}", get(get_user_locations))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the location relay server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        // Start the server
        tracing::info!(
            "Location relay server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
