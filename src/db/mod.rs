use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::*;

// ── Users & retailers ─────────────────────────────────────────────────────────

pub async fn fetch_user_by_id(pool: &PgPool, id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, name, email, role, green_points, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

/// Resolve the retailer record behind an acting principal.
pub async fn fetch_retailer_by_user(pool: &PgPool, user_id: Uuid) -> AppResult<Retailer> {
    sqlx::query_as::<_, Retailer>(
        "SELECT id, user_id, store_name, phone, created_at FROM retailers WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No retailer record for user {}", user_id)))
}

/// Atomic in-database increment; safe under concurrent approvals for the
/// same user. Returns the new balance.
pub async fn increment_green_points(pool: &PgPool, user_id: Uuid, points: f64) -> AppResult<f64> {
    let row: (f64,) = sqlx::query_as(
        "UPDATE users SET green_points = green_points + $2 WHERE id = $1 RETURNING green_points",
    )
    .bind(user_id)
    .bind(points)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(row.0)
}

/// Conditional decrement: only succeeds while the balance covers the amount.
/// `None` means insufficient points (or unknown user).
pub async fn deduct_green_points(
    pool: &PgPool,
    user_id: Uuid,
    points: f64,
) -> AppResult<Option<f64>> {
    let row: Option<(f64,)> = sqlx::query_as(
        r#"
        UPDATE users
        SET green_points = green_points - $2
        WHERE id = $1 AND green_points >= $2
        RETURNING green_points
        "#,
    )
    .bind(user_id)
    .bind(points)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0))
}

pub async fn fetch_leaderboard(pool: &PgPool, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
    let entries = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT name, green_points
        FROM users
        WHERE role = 'user'
        ORDER BY green_points DESC, name ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

// ── Packages ──────────────────────────────────────────────────────────────────

/// Look up a package descriptor by barcode, creating a placeholder record
/// when the barcode has never been seen. Two concurrent submissions with the
/// same new barcode both land on the single row the UNIQUE constraint keeps.
pub async fn resolve_package_by_barcode(
    pool: &PgPool,
    barcode: &str,
    size: &str,
) -> AppResult<PackageDescriptor> {
    sqlx::query(
        r#"
        INSERT INTO packages (kind, material, size, barcode, recyclable, biodegradable)
        VALUES ('Unknown', 'Unknown', $2, $1, TRUE, FALSE)
        ON CONFLICT (barcode) DO NOTHING
        "#,
    )
    .bind(barcode)
    .bind(size)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, PackageDescriptor>(
        "SELECT id, kind, material, size, barcode, recyclable, biodegradable, created_at
         FROM packages WHERE barcode = $1",
    )
    .bind(barcode)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Package with barcode {} not found", barcode)))
}

pub async fn fetch_package_by_id(pool: &PgPool, id: Uuid) -> AppResult<PackageDescriptor> {
    sqlx::query_as::<_, PackageDescriptor>(
        "SELECT id, kind, material, size, barcode, recyclable, biodegradable, created_at
         FROM packages WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Package {} not found", id)))
}

// ── Return requests ───────────────────────────────────────────────────────────

const RETURN_COLUMNS: &str =
    "id, user_id, package_id, retailer_id, package_name, category, size, \
     weight_kg, photo, scanned_code, barcode, status, otp_code, otp_expiry, \
     submitted_at, updated_at";

const RETURN_CONTEXT_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, u.email AS user_email,
           r.package_name, r.category, p.material AS material, r.size,
           r.weight_kg, r.barcode, r.status, r.submitted_at, r.updated_at
    FROM return_requests r
    JOIN users u ON u.id = r.user_id
    LEFT JOIN packages p ON p.id = r.package_id
"#;

pub async fn insert_return(
    pool: &PgPool,
    user_id: Uuid,
    package_id: Uuid,
    payload: &SubmitReturn,
) -> AppResult<ReturnRequest> {
    let request = sqlx::query_as::<_, ReturnRequest>(&format!(
        r#"
        INSERT INTO return_requests
            (user_id, package_id, package_name, category, size, weight_kg,
             photo, scanned_code, barcode, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'initiated')
        RETURNING {RETURN_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(package_id)
    .bind(&payload.package_name)
    .bind(&payload.category)
    .bind(&payload.size)
    .bind(payload.weight_kg)
    .bind(payload.photo.as_deref())
    .bind(payload.scanned_code.as_deref())
    .bind(&payload.barcode)
    .fetch_one(pool)
    .await?;

    Ok(request)
}

pub async fn fetch_return_by_id(pool: &PgPool, id: Uuid) -> AppResult<ReturnRequest> {
    sqlx::query_as::<_, ReturnRequest>(&format!(
        "SELECT {RETURN_COLUMNS} FROM return_requests WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Return {} not found", id)))
}

pub async fn fetch_returns_for_user(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<ReturnRequest>> {
    let returns = sqlx::query_as::<_, ReturnRequest>(&format!(
        "SELECT {RETURN_COLUMNS} FROM return_requests
         WHERE user_id = $1 ORDER BY submitted_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(returns)
}

/// The unclaimed queue: initiated returns no retailer has acted on, visible
/// to every retailer.
pub async fn fetch_unclaimed_returns(pool: &PgPool) -> AppResult<Vec<ReturnWithContext>> {
    let returns = sqlx::query_as::<_, ReturnWithContext>(&format!(
        "{RETURN_CONTEXT_SELECT}
         WHERE r.status = 'initiated' AND r.retailer_id IS NULL
         ORDER BY r.submitted_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(returns)
}

/// Terminal returns bound to one retailer, optionally narrowed to a single
/// status.
pub async fn fetch_returns_for_retailer(
    pool: &PgPool,
    retailer_id: Uuid,
    status: Option<ReturnStatus>,
) -> AppResult<Vec<ReturnWithContext>> {
    let returns = sqlx::query_as::<_, ReturnWithContext>(&format!(
        "{RETURN_CONTEXT_SELECT}
         WHERE r.retailer_id = $1
           AND r.status IN ('approved', 'rejected')
           AND ($2::return_status IS NULL OR r.status = $2)
         ORDER BY r.submitted_at DESC"
    ))
    .bind(retailer_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(returns)
}

/// Approved-return count for a user. Taken *after* the approving update, so
/// the freshly approved record is included.
pub async fn count_approved_returns(pool: &PgPool, user_id: Uuid) -> AppResult<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM return_requests WHERE user_id = $1 AND status = 'approved'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

pub async fn count_returns_by_outcome(pool: &PgPool, user_id: Uuid) -> AppResult<(i64, i64, i64)> {
    let row: (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'approved'),
               COUNT(*) FILTER (WHERE status = 'rejected')
        FROM return_requests
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

// ── Conditional transitions ───────────────────────────────────────────────────
//
// Every state-changing write below is a single compare-and-set UPDATE keyed
// on `status = 'initiated'`. Under concurrent attempts exactly one statement
// matches the row; the losers see zero rows and get `None`.

/// Store a fresh confirmation code, only while the record is still initiated
/// and holds no live code.
pub async fn issue_confirmation_code(
    pool: &PgPool,
    id: Uuid,
    code: &str,
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<Option<ReturnRequest>> {
    let updated = sqlx::query_as::<_, ReturnRequest>(&format!(
        r#"
        UPDATE return_requests
        SET otp_code = $2, otp_expiry = $3, updated_at = $4
        WHERE id = $1
          AND status = 'initiated'
          AND (otp_code IS NULL OR otp_expiry <= $4)
        RETURNING {RETURN_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(code)
    .bind(expiry)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

/// Code-gated approval: transition + code check + code clear + retailer
/// binding in one statement.
pub async fn approve_return_with_code(
    pool: &PgPool,
    id: Uuid,
    retailer_id: Uuid,
    code: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<ReturnRequest>> {
    let updated = sqlx::query_as::<_, ReturnRequest>(&format!(
        r#"
        UPDATE return_requests
        SET status = 'approved', otp_code = NULL, otp_expiry = NULL,
            retailer_id = $2, updated_at = $4
        WHERE id = $1
          AND status = 'initiated'
          AND otp_code = $3
          AND otp_expiry > $4
        RETURNING {RETURN_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(retailer_id)
    .bind(code)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

/// Code-free approval used by the direct flow. Clears any pending code so it
/// can never be replayed.
pub async fn approve_return_direct(
    pool: &PgPool,
    id: Uuid,
    retailer_id: Uuid,
) -> AppResult<Option<ReturnRequest>> {
    let updated = sqlx::query_as::<_, ReturnRequest>(&format!(
        r#"
        UPDATE return_requests
        SET status = 'approved', otp_code = NULL, otp_expiry = NULL,
            retailer_id = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'initiated'
        RETURNING {RETURN_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(retailer_id)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

pub async fn reject_return(
    pool: &PgPool,
    id: Uuid,
    retailer_id: Uuid,
) -> AppResult<Option<ReturnRequest>> {
    let updated = sqlx::query_as::<_, ReturnRequest>(&format!(
        r#"
        UPDATE return_requests
        SET status = 'rejected', otp_code = NULL, otp_expiry = NULL,
            retailer_id = $2, updated_at = NOW()
        WHERE id = $1 AND status = 'initiated'
        RETURNING {RETURN_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(retailer_id)
    .fetch_optional(pool)
    .await?;

    Ok(updated)
}

// ── Notifications ─────────────────────────────────────────────────────────────

pub async fn insert_notification(
    pool: &PgPool,
    user_id: Uuid,
    message: &str,
    kind: &str,
    link: Option<&str>,
) -> AppResult<Notification> {
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, message, kind, link)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, message, kind, link, read, created_at
        "#,
    )
    .bind(user_id)
    .bind(message)
    .bind(kind)
    .bind(link)
    .fetch_one(pool)
    .await?;

    Ok(notification)
}

pub async fn fetch_notifications_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> AppResult<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT id, user_id, message, kind, link, read, created_at
         FROM notifications WHERE user_id = $1
         ORDER BY created_at DESC LIMIT 200",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Mark one of the user's notifications read; scoped by owner so one user
/// cannot touch another's rows.
pub async fn mark_notification_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Notification {} not found", id)));
    }
    Ok(())
}

// ── Redemption ────────────────────────────────────────────────────────────────

pub async fn insert_redeem_record(
    pool: &PgPool,
    user_id: Uuid,
    points: f64,
    cashback_amount: f64,
) -> AppResult<RedeemRecord> {
    let record = sqlx::query_as::<_, RedeemRecord>(
        r#"
        INSERT INTO redeem_history (user_id, points, cashback_amount, kind)
        VALUES ($1, $2, $3, 'cashback')
        RETURNING id, user_id, points, cashback_amount, kind, created_at
        "#,
    )
    .bind(user_id)
    .bind(points)
    .bind(cashback_amount)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

pub async fn fetch_redeem_history(pool: &PgPool, user_id: Uuid) -> AppResult<Vec<RedeemRecord>> {
    let records = sqlx::query_as::<_, RedeemRecord>(
        "SELECT id, user_id, points, cashback_amount, kind, created_at
         FROM redeem_history WHERE user_id = $1
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

pub async fn sum_cashback_earned(pool: &PgPool, user_id: Uuid) -> AppResult<f64> {
    let row: (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(cashback_amount), 0)
         FROM redeem_history WHERE user_id = $1 AND kind = 'cashback'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}
