//! Dashboard — Axum JSON API for a browser front end.
//!
//! Exposes desk snapshots and the bot, session and wallet actions.
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use routes::AppState;

/// Bind the dashboard port and serve in a background task.
///
/// Binding happens before spawning so a busy port is reported to the
/// caller.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    }))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Reads
        .route("/api/desk", get(routes::get_desk))
        .route("/api/summary", get(routes::get_summary))
        .route("/api/games", get(routes::get_games))
        .route("/api/bets", get(routes::get_bets))
        .route("/api/logs", get(routes::get_logs))
        .route("/api/balance-history", get(routes::get_balance_history))
        .route("/api/recommender", get(routes::get_recommender))
        .route("/api/session", get(routes::get_session))
        .route("/api/wallet/transactions", get(routes::get_transactions))
        // Bot
        .route("/api/bot/start", post(routes::start_bot))
        .route("/api/bot/stop", post(routes::stop_bot))
        .route("/api/bot/stake", post(routes::set_stake))
        .route("/api/bot/scan", post(routes::scan_now))
        // Session
        .route("/api/auth/register", post(routes::register))
        .route("/api/auth/login", post(routes::login))
        .route("/api/auth/verify", post(routes::verify))
        .route("/api/auth/logout", post(routes::logout))
        // Wallet
        .route("/api/wallet/deposit", post(routes::deposit))
        .route("/api/wallet/withdraw", post(routes::withdraw))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
