use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized record of a physical packaging item, keyed by barcode.
/// Created on demand the first time a barcode is seen; `material` feeds the
/// reward formula once known.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PackageDescriptor {
    pub id: Uuid,
    pub kind: String,
    pub material: String,
    pub size: String,
    pub barcode: String,
    pub recyclable: bool,
    pub biodegradable: bool,
    pub created_at: DateTime<Utc>,
}
