pub mod demo;
pub mod notifications;
pub mod redeem;
pub mod returns;
pub mod users;

use axum::{http::StatusCode, Json};
use serde_json::json;

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "service": "reloop-service" })))
}
