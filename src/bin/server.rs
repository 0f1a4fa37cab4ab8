//! Real-time location relay server.
//!
//! Receives location updates from clients over WebSocket and fans them out to
//! subscribed sessions, persisting each update to Postgres (or an in-memory
//! cache when the database is unavailable).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin ashiato-server
//! cargo run --bin ashiato-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use ashiato::{
    common::{logger::setup_logger, time::SystemClock},
    config::Config,
    infrastructure::{
        pusher::WebSocketMessagePusher,
        store::{MemoryLocationStore, PostgresLocationStore},
    },
    ui::Server,
    usecase::{EventDispatcher, PersistenceGateway, RoomRouter, SessionRegistry},
};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser, Debug)]
#[command(name = "ashiato-server")]
#[command(about = "Real-time location relay server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,
}

/// 耐久ストアへの接続を試みる
///
/// 接続・マイグレーション・疎通確認のいずれかに失敗した場合は None を返し、
/// サーバーはキャッシュのみで起動します（可用性を耐久性より優先）。
async fn connect_durable_store(config: &Config) -> Option<Arc<PostgresLocationStore>> {
    if !config.use_database {
        tracing::info!("Durable store disabled by configuration, running cache-only");
        return None;
    }
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, running cache-only");
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Failed to connect to Postgres, running cache-only: {}", e);
            return None;
        }
    };

    let store = PostgresLocationStore::new(pool);
    if let Err(e) = store.migrate().await {
        tracing::warn!("Failed to run migrations, running cache-only: {}", e);
        return None;
    }
    if let Err(e) = store.probe().await {
        tracing::warn!("Postgres probe failed, running cache-only: {}", e);
        return None;
    }

    tracing::info!("Connected to Postgres");
    Some(Arc::new(store))
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = Config::from_env();

    // Initialize dependencies in order:
    // 1. Stores (durable + cache) and gateway
    // 2. MessagePusher
    // 3. Router / Registry / Dispatcher
    // 4. Server

    // 1. Create the persistence gateway
    let cache = Arc::new(MemoryLocationStore::new(config.cache_capacity));
    let gateway = match connect_durable_store(&config).await {
        Some(durable) => Arc::new(PersistenceGateway::with_durable(durable, cache)),
        None => Arc::new(PersistenceGateway::cache_only(cache)),
    };

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create the relay components
    let router = Arc::new(RoomRouter::new(message_pusher.clone()));
    let registry = Arc::new(SessionRegistry::new(router.clone()));
    let dispatcher = Arc::new(EventDispatcher::new(
        registry.clone(),
        router,
        gateway.clone(),
        message_pusher.clone(),
        Arc::new(SystemClock),
        config.broadcast_global,
    ));

    // 4. Create and run the server
    let server = Server::new(dispatcher, registry, gateway, message_pusher);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
