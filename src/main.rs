//! Process entrypoint. Grounded on the teacher's `main.rs` bootstrap
//! order (env load, tracing init, config, state, router, graceful
//! shutdown) with the Telegram bot and Redis pool construction dropped.

use std::net::SocketAddr;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use lobby_core::config::AppConfig;
use lobby_core::keepalive::KeepAliveSupervisor;
use lobby_core::middleware::{WsUpgradeRateLimit, ws_upgrade_rate_limit};
use lobby_core::state::AppState;
use lobby_core::ws::ws_handler;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();

    let state = AppState::new(config).await.expect("failed to initialize app state");

    state.presence.clone().spawn_sweeper();
    state.spawn_stale_sweeper();
    KeepAliveSupervisor::new(state.games.clone(), state.rooms.clone()).spawn();

    let cors = build_cors(&allowed_origins);
    let ws_rate_limit = WsUpgradeRateLimit::new();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(from_fn_with_state(ws_rate_limit, ws_upgrade_rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|err| panic!("failed to bind port {port}: {err}"));

    tracing::info!(%port, "lobby core listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");
}

fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET])
        .allow_headers([axum::http::header::AUTHORIZATION])
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
