use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::AppResult,
    lifecycle,
    models::{ReturnWithContext, StatusFilter, SubmitReturn},
    AppState,
};

// ── Submission & user views ───────────────────────────────────────────────────

pub async fn submit_return(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<SubmitReturn>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let request = lifecycle::submit(&state, principal, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "data": request })),
    ))
}

pub async fn list_own_returns(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let returns = lifecycle::list_own(&state, principal).await?;

    info!(user_id = %principal.user_id, count = returns.len(), "Listed own returns");

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": returns,
            "count": returns.len(),
        })),
    ))
}

pub async fn get_return(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let request = lifecycle::get_visible(&state, principal, id).await?;

    Ok((StatusCode::OK, Json(serde_json::json!({ "data": request }))))
}

// ── Retailer queue & history ──────────────────────────────────────────────────

pub async fn list_pending_returns(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let returns = lifecycle::list_by_status(&state, principal, StatusFilter::Pending).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": returns,
            "count": returns.len(),
        })),
    ))
}

pub async fn list_returns_by_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(status): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let filter: StatusFilter = status.parse()?;
    let returns = lifecycle::list_by_status(&state, principal, filter).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": returns,
            "count": returns.len(),
        })),
    ))
}

pub async fn retailer_history(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let returns = lifecycle::history(&state, principal).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": returns,
            "count": returns.len(),
        })),
    ))
}

pub async fn export_history_csv(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, [(header::HeaderName, &'static str); 2], String)> {
    let returns = lifecycle::history(&state, principal).await?;
    let csv = history_to_csv(&returns)?;

    info!(user_id = %principal.user_id, rows = returns.len(), "Exported history CSV");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"return_history.csv\"",
            ),
        ],
        csv,
    ))
}

fn history_to_csv(returns: &[ReturnWithContext]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "id",
        "user_name",
        "user_email",
        "package_name",
        "category",
        "material",
        "size",
        "weight_kg",
        "barcode",
        "status",
        "submitted_at",
        "action_at",
    ])?;

    for r in returns {
        wtr.write_record([
            r.id.to_string(),
            r.user_name.clone(),
            r.user_email.clone(),
            r.package_name.clone(),
            r.category.clone(),
            r.material.clone().unwrap_or_else(|| "Unknown".to_string()),
            r.size.clone(),
            r.weight_kg.to_string(),
            r.barcode.clone(),
            r.status.to_string(),
            r.submitted_at.to_rfc3339(),
            r.updated_at.to_rfc3339(),
        ])?;
    }

    let data = wtr.into_inner().context("flushing CSV writer")?;
    String::from_utf8(data).context("CSV output was not valid UTF-8")
}

// ── Transitions ───────────────────────────────────────────────────────────────

pub async fn request_confirmation_code(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let (request, code) = lifecycle::request_code(&state, principal, id).await?;

    // Demo-mode delivery: the code goes back to the caller instead of
    // out-of-band to the submitting user.
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": request,
            "code": code,
            "expires_at": request.otp_expiry,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmApproval {
    pub code: String,
}

pub async fn confirm_approval(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmApproval>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let outcome = lifecycle::confirm_approval(&state, principal, id, &payload.code).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("Return approved – earned {} Green Points", outcome.reward.points),
            "data": outcome.request,
            "reward": outcome.reward,
            "new_balance": outcome.new_balance,
        })),
    ))
}

pub async fn direct_approve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let outcome = lifecycle::direct_approve(&state, principal, id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("Return approved – earned {} Green Points", outcome.reward.points),
            "data": outcome.request,
            "reward": outcome.reward,
            "new_balance": outcome.new_balance,
        })),
    ))
}

pub async fn reject_return(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let request = lifecycle::reject(&state, principal, id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Return rejected",
            "data": request,
        })),
    ))
}
