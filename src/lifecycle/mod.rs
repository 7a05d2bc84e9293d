//! The return lifecycle engine: every state transition a return request can
//! make, with its authorization gate, concurrency guard and reward side
//! effects in one place. Handlers stay thin transport adapters.
//!
//! A return moves `initiated` → `approved` | `rejected`; both ends are
//! terminal. While initiated it may temporarily hold a one-time confirmation
//! code; the code is cleared by every terminal transition so it can never be
//! replayed.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{ReturnRequest, ReturnStatus, ReturnWithContext, StatusFilter, SubmitReturn};
use crate::notify::NotificationEvent;
use crate::otp;
use crate::reward::{self, RewardBreakdown};
use crate::AppState;

/// Result of a successful approval: the finalized record, how the reward was
/// computed, and the user's balance after crediting.
#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    pub request: ReturnRequest,
    pub reward: RewardBreakdown,
    pub new_balance: f64,
}

/// Create a new return in `initiated` state, resolving the package
/// descriptor by barcode (created on first sight).
pub async fn submit(
    state: &AppState,
    principal: Principal,
    payload: SubmitReturn,
) -> AppResult<ReturnRequest> {
    payload.validate()?;

    let package = db::resolve_package_by_barcode(&state.db, &payload.barcode, &payload.size).await?;
    let request = db::insert_return(&state.db, principal.user_id, package.id, &payload).await?;

    info!(
        id = %request.id,
        user_id = %principal.user_id,
        barcode = %request.barcode,
        "Return submitted"
    );

    emit(state, principal.user_id, NotificationEvent::ReturnSubmitted {
        return_id: request.id,
        package_name: request.package_name.clone(),
    });

    Ok(request)
}

/// Issue a fresh confirmation code for an initiated return with no live
/// code. The code is handed back to the caller (demo-mode delivery).
pub async fn request_code(
    state: &AppState,
    principal: Principal,
    return_id: Uuid,
) -> AppResult<(ReturnRequest, String)> {
    principal.require_retailer()?;

    let existing = db::fetch_return_by_id(&state.db, return_id).await?;
    existing.ensure_open()?;

    let now = Utc::now();
    if existing.has_live_code(now) {
        return Err(AppError::Conflict(
            "a confirmation code is already pending for this return".to_string(),
        ));
    }

    let mut rng = StdRng::from_entropy();
    let code = otp::generate(&mut rng);
    let expiry = otp::expiry_from(now);

    let updated = db::issue_confirmation_code(&state.db, return_id, &code, expiry, now)
        .await?
        .ok_or_else(|| {
            // someone else finalized the record or issued a code in between
            AppError::Conflict("return changed while issuing the code, retry".to_string())
        })?;

    info!(id = %return_id, expiry = %expiry, "Confirmation code issued");

    Ok((updated, code))
}

/// Code-gated approval: verify the supplied code, finalize the record, and
/// credit the reward.
pub async fn confirm_approval(
    state: &AppState,
    principal: Principal,
    return_id: Uuid,
    supplied_code: &str,
) -> AppResult<ApprovalOutcome> {
    principal.require_retailer()?;
    let retailer = db::fetch_retailer_by_user(&state.db, principal.user_id).await?;

    let existing = db::fetch_return_by_id(&state.db, return_id).await?;
    let now = Utc::now();
    existing.ensure_confirmable(supplied_code, now)?;

    let updated =
        db::approve_return_with_code(&state.db, return_id, retailer.id, supplied_code, now)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("return was finalized by a concurrent request".to_string())
            })?;

    finalize_approval(state, updated).await
}

/// Code-free approval used by the alternate flow; same terminal effects as
/// the code-gated path.
pub async fn direct_approve(
    state: &AppState,
    principal: Principal,
    return_id: Uuid,
) -> AppResult<ApprovalOutcome> {
    principal.require_retailer()?;
    let retailer = db::fetch_retailer_by_user(&state.db, principal.user_id).await?;

    let existing = db::fetch_return_by_id(&state.db, return_id).await?;
    existing.ensure_open()?;

    let updated = db::approve_return_direct(&state.db, return_id, retailer.id)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("return was finalized by a concurrent request".to_string())
        })?;

    finalize_approval(state, updated).await
}

/// Shared tail of both approval paths: count the user's approved returns
/// (now including this one), compute and credit the reward, notify.
async fn finalize_approval(state: &AppState, request: ReturnRequest) -> AppResult<ApprovalOutcome> {
    let material = match request.package_id {
        Some(package_id) => db::fetch_package_by_id(&state.db, package_id).await?.material,
        None => "Unknown".to_string(),
    };

    let approved_count = db::count_approved_returns(&state.db, request.user_id).await?;
    let breakdown = reward::compute(&material, &request.size, request.weight_kg, approved_count);
    let new_balance =
        db::increment_green_points(&state.db, request.user_id, breakdown.points).await?;

    info!(
        id = %request.id,
        user_id = %request.user_id,
        points = breakdown.points,
        approved_count,
        "Return approved"
    );

    emit(state, request.user_id, NotificationEvent::ReturnApproved {
        return_id: request.id,
        points: breakdown.points,
    });

    Ok(ApprovalOutcome {
        request,
        reward: breakdown,
        new_balance,
    })
}

/// Reject an initiated return. Binds the acting retailer, clears any pending
/// code, no reward.
pub async fn reject(
    state: &AppState,
    principal: Principal,
    return_id: Uuid,
) -> AppResult<ReturnRequest> {
    principal.require_retailer()?;
    let retailer = db::fetch_retailer_by_user(&state.db, principal.user_id).await?;

    let existing = db::fetch_return_by_id(&state.db, return_id).await?;
    existing.ensure_open()?;

    let updated = db::reject_return(&state.db, return_id, retailer.id)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("return was finalized by a concurrent request".to_string())
        })?;

    info!(id = %return_id, retailer_id = %retailer.id, "Return rejected");

    Ok(updated)
}

/// Retailer-facing listing. The pending queue is unclaimed and visible to
/// every retailer; approved/rejected are scoped to the requesting retailer's
/// own history.
pub async fn list_by_status(
    state: &AppState,
    principal: Principal,
    filter: StatusFilter,
) -> AppResult<Vec<ReturnWithContext>> {
    principal.require_retailer()?;

    match filter {
        StatusFilter::Pending => db::fetch_unclaimed_returns(&state.db).await,
        StatusFilter::Approved | StatusFilter::Rejected => {
            let retailer = db::fetch_retailer_by_user(&state.db, principal.user_id).await?;
            let status = if filter == StatusFilter::Approved {
                ReturnStatus::Approved
            } else {
                ReturnStatus::Rejected
            };
            db::fetch_returns_for_retailer(&state.db, retailer.id, Some(status)).await
        }
    }
}

/// A retailer's full approval/rejection history, newest first.
pub async fn history(
    state: &AppState,
    principal: Principal,
) -> AppResult<Vec<ReturnWithContext>> {
    principal.require_retailer()?;
    let retailer = db::fetch_retailer_by_user(&state.db, principal.user_id).await?;
    db::fetch_returns_for_retailer(&state.db, retailer.id, None).await
}

/// The submitting user's own returns, newest first.
pub async fn list_own(state: &AppState, principal: Principal) -> AppResult<Vec<ReturnRequest>> {
    db::fetch_returns_for_user(&state.db, principal.user_id).await
}

/// Fetch one return, visible to its owner and to retailers.
pub async fn get_visible(
    state: &AppState,
    principal: Principal,
    return_id: Uuid,
) -> AppResult<ReturnRequest> {
    let request = db::fetch_return_by_id(&state.db, return_id).await?;
    if request.user_id != principal.user_id && principal.role != Role::Retailer {
        return Err(AppError::Forbidden(
            "you cannot view another user's return".to_string(),
        ));
    }
    Ok(request)
}

/// Fire-and-forget notification: never blocks the transition and never
/// propagates failure to the caller.
fn emit(state: &AppState, user_id: Uuid, event: NotificationEvent) {
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        notifier.notify(user_id, event).await;
    });
}
