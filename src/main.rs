use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod lifecycle;
mod models;
mod notify;
mod otp;
mod reward;
mod seed;

use crate::config::Config;
use crate::notify::Notifier;

/// Shared application state — cheap to clone (all heap behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub notifier: Arc<Notifier>,
    pub jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reloop_service=debug".parse().unwrap()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ReLoop Returns Service — Rust+Axum  ║");
    info!("║  submit · verify · reward · redeem   ║");
    info!("╚══════════════════════════════════════╝");

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await?;
    info!("Database connection pool established.");

    // Run pending migrations
    info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations complete.");

    let state = AppState {
        db: pool.clone(),
        notifier: Arc::new(Notifier::new(pool)),
        jwt_secret: config.jwt_secret.clone(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on http://{}", addr);
    info!("Quick-start: POST http://{}/api/seed  →  then submit a return at POST http://{}/api/returns", addr, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Return lifecycle ────────────────────────────────────────────────
        .route(
            "/api/returns",
            get(handlers::returns::list_own_returns).post(handlers::returns::submit_return),
        )
        .route(
            "/api/returns/pending",
            get(handlers::returns::list_pending_returns),
        )
        .route(
            "/api/returns/status/:status",
            get(handlers::returns::list_returns_by_status),
        )
        .route(
            "/api/returns/history",
            get(handlers::returns::retailer_history),
        )
        .route(
            "/api/returns/history/export/csv",
            get(handlers::returns::export_history_csv),
        )
        .route("/api/returns/:id", get(handlers::returns::get_return))
        .route(
            "/api/returns/:id/code",
            post(handlers::returns::request_confirmation_code),
        )
        .route(
            "/api/returns/:id/approve",
            post(handlers::returns::confirm_approval),
        )
        .route(
            "/api/returns/:id/direct-approve",
            post(handlers::returns::direct_approve),
        )
        .route(
            "/api/returns/:id/reject",
            post(handlers::returns::reject_return),
        )

        // ── Users & rewards ─────────────────────────────────────────────────
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/leaderboard", get(handlers::users::leaderboard))
        .route("/api/redeem", post(handlers::redeem::redeem_points))
        .route("/api/redeem/history", get(handlers::redeem::redeem_history))

        // ── Notifications ───────────────────────────────────────────────────
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/stream",
            get(handlers::notifications::stream),
        )
        .route(
            "/api/notifications/:id/read",
            post(handlers::notifications::mark_read),
        )

        // ── Demo seed ───────────────────────────────────────────────────────
        .route("/api/seed", post(handlers::demo::seed_data))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
