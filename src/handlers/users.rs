use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{auth::Principal, db, error::AppError, error::AppResult, AppState};

/// Profile of the authenticated user with lifetime return/reward stats.
pub async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user = db::fetch_user_by_id(&state.db, principal.user_id).await?;
    let (total, approved, rejected) = db::count_returns_by_outcome(&state.db, user.id).await?;
    let cashback_earned = db::sum_cashback_earned(&state.db, user.id).await?;

    let retailer = match db::fetch_retailer_by_user(&state.db, user.id).await {
        Ok(r) => Some(r),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "green_points": user.green_points,
            "retailer": retailer,
            "total_returns": total,
            "total_approved": approved,
            "total_rejected": rejected,
            "cashback_earned": cashback_earned,
        })),
    ))
}

/// Top recyclers by accumulated green points.
pub async fn leaderboard(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let entries = db::fetch_leaderboard(&state.db, 10).await?;

    info!(count = entries.len(), "Served leaderboard");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": entries,
            "count": entries.len(),
        })),
    ))
}
