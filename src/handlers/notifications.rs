use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use uuid::Uuid;

use crate::{auth::Principal, db, error::AppResult, AppState};

pub async fn list_notifications(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let notifications = db::fetch_notifications_for_user(&state.db, principal.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "data": notifications,
            "count": notifications.len(),
        })),
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    db::mark_notification_read(&state.db, id, principal.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Notification marked read", "id": id })),
    ))
}

/// Live event stream for the authenticated user. Lagged or closed receivers
/// simply drop events; the engine never waits on this path.
pub async fn stream(
    State(state): State<AppState>,
    principal: Principal,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.subscribe(principal.user_id).await;

    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        msg.ok()
            .and_then(|event| Event::default().json_data(&event).ok())
            .map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
