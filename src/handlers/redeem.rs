use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::{
    auth::Principal,
    db,
    error::{AppError, AppResult},
    models::RedeemRequest,
    AppState,
};

/// 1 green point redeems for 1 unit of cashback.
const CASHBACK_PER_POINT: f64 = 1.0;

/// Exchange green points for cashback. The balance check and deduction are
/// one conditional update, so two concurrent redemptions can never overdraw.
pub async fn redeem_points(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<RedeemRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if !payload.points.is_finite() || payload.points <= 0.0 {
        return Err(AppError::BadRequest(
            "points must be a positive number".to_string(),
        ));
    }

    let new_balance = db::deduct_green_points(&state.db, principal.user_id, payload.points)
        .await?
        .ok_or_else(|| AppError::Conflict("insufficient green points".to_string()))?;

    let cashback = payload.points * CASHBACK_PER_POINT;
    let record =
        db::insert_redeem_record(&state.db, principal.user_id, payload.points, cashback).await?;

    info!(
        user_id = %principal.user_id,
        points = payload.points,
        cashback,
        "Points redeemed"
    );

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("Redeemed {} points for {} cashback", payload.points, cashback),
            "data": record,
            "new_balance": new_balance,
        })),
    ))
}

pub async fn redeem_history(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let records = db::fetch_redeem_history(&state.db, principal.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": records,
            "count": records.len(),
        })),
    ))
}
