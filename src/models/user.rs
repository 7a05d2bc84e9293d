use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Accumulated reward balance; grows on approvals, shrinks only through
    /// cashback redemption.
    pub green_points: f64,
    pub created_at: DateTime<Utc>,
}

/// A retailer's store record, linked one-to-one to its login user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Retailer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub name: String,
    pub green_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RedeemRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub points: f64,
    pub cashback_amount: f64,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub points: f64,
}
