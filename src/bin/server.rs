//! Process entry point: loads config, wires the round actor to an
//! in-memory wallet/persistence pair, and serves the gateway over HTTP +
//! WebSocket.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crash_engine::config::Config;
use crash_engine::events::EventBus;
use crash_engine::gateway::{run_private_balance_router, websocket_handler, AppState};
use crash_engine::gateway::connection::ConnectionRegistry;
use crash_engine::persistence::LoggingPersistence;
use crash_engine::rng::seed::RngEngine;
use crash_engine::round::RoundActor;
use crash_engine::wallet::InMemoryWallet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "crash_engine=info,tower_http=info".into()))
        .init();

    let config = Config::load()?;
    tracing::info!(?config, "loaded configuration");

    let wallet = Arc::new(InMemoryWallet::new());
    let persistence = Arc::new(LoggingPersistence);
    let rng = Arc::new(RngEngine::new(config.house_edge, config.max_crash_point));
    let events = Arc::new(EventBus::default());

    let round = RoundActor::spawn(config.clone(), rng.clone(), wallet, persistence, events.clone());

    let state = AppState {
        config: Arc::new(config.clone()),
        round,
        rng,
        events: events.clone(),
        connections: Arc::new(ConnectionRegistry::new()),
    };

    tokio::spawn(run_private_balance_router(events, state.connections.clone()));

    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/ws", get(websocket_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr.as_str()).await?;
    tracing::info!(addr = %config.listen_addr, "crash engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}
