use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{error::AppResult, seed, AppState};

#[derive(Debug, Deserialize)]
pub struct SeedParams {
    /// Demo users to create (default: 25, max: 1000)
    pub users: Option<usize>,
    /// Demo retailers to create (default: 5, max: 100)
    pub retailers: Option<usize>,
    /// Package descriptors to create (default: 50, max: 10 000)
    pub packages: Option<usize>,
}

// ── POST /api/seed ────────────────────────────────────────────────────────────

pub async fn seed_data(
    State(state): State<AppState>,
    Query(params): Query<SeedParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let users = params.users.unwrap_or(25).min(1_000);
    let retailers = params.retailers.unwrap_or(5).min(100);
    let packages = params.packages.unwrap_or(50).min(10_000);

    let summary = seed::seed_demo(&state.db, users, retailers, packages).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "seeded": summary })),
    ))
}
