use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::otp;

/// Lifecycle status. `Initiated` is the only open state; `Approved` and
/// `Rejected` are terminal and never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "return_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Initiated,
    Approved,
    Rejected,
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReturnStatus::Initiated => "initiated",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Retailer-facing listing filter. "pending" and "initiated" are two names
/// for the same unclaimed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Approved,
    Rejected,
}

impl FromStr for StatusFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" | "initiated" => Ok(StatusFilter::Pending),
            "approved" => Ok(StatusFilter::Approved),
            "rejected" => Ok(StatusFilter::Rejected),
            other => Err(AppError::BadRequest(format!(
                "invalid status filter '{}' (expected pending, approved or rejected)",
                other
            ))),
        }
    }
}

/// Central entity: one packaging-return request from submission to its
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReturnRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub package_id: Option<Uuid>,
    /// Null until a retailer approves or rejects; set exactly once.
    pub retailer_id: Option<Uuid>,
    pub package_name: String,
    pub category: String,
    pub size: String,
    pub weight_kg: f64,
    pub photo: Option<String>,
    pub scanned_code: Option<String>,
    pub barcode: String,
    pub status: ReturnStatus,
    #[serde(skip_serializing)]
    pub otp_code: Option<String>,
    pub otp_expiry: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnRequest {
    pub fn is_terminal(&self) -> bool {
        self.status != ReturnStatus::Initiated
    }

    /// Guard for any transition attempt: terminal records never move again.
    pub fn ensure_open(&self) -> AppResult<()> {
        if self.is_terminal() {
            return Err(AppError::AlreadyFinalized);
        }
        Ok(())
    }

    /// True when a confirmation code is stored and still inside its window.
    pub fn has_live_code(&self, now: DateTime<Utc>) -> bool {
        match (&self.otp_code, self.otp_expiry) {
            (Some(_), Some(expiry)) => !otp::is_expired(expiry, now),
            _ => false,
        }
    }

    /// Full precondition check for code-gated approval, yielding the precise
    /// failure cause. Checked in order: terminal, no code, expired, mismatch.
    pub fn ensure_confirmable(&self, supplied: &str, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_open()?;

        let (code, expiry) = match (&self.otp_code, self.otp_expiry) {
            (Some(code), Some(expiry)) => (code, expiry),
            _ => return Err(AppError::CodeNotIssued),
        };
        if otp::is_expired(expiry, now) {
            return Err(AppError::CodeExpired);
        }
        if code != supplied {
            return Err(AppError::CodeMismatch);
        }
        Ok(())
    }
}

/// Submission payload. Photo is an opaque reference produced by the upload
/// layer; this service never touches file contents.
#[derive(Debug, Deserialize)]
pub struct SubmitReturn {
    pub package_name: String,
    pub category: String,
    pub size: String,
    pub weight_kg: f64,
    pub photo: Option<String>,
    pub scanned_code: Option<String>,
    pub barcode: String,
}

impl SubmitReturn {
    pub fn validate(&self) -> AppResult<()> {
        if self.package_name.trim().is_empty() {
            return Err(AppError::BadRequest("package_name must not be empty".to_string()));
        }
        if self.category.trim().is_empty() {
            return Err(AppError::BadRequest("category must not be empty".to_string()));
        }
        if self.size.trim().is_empty() {
            return Err(AppError::BadRequest("size must not be empty".to_string()));
        }
        if self.barcode.trim().is_empty() {
            return Err(AppError::BadRequest("barcode must not be empty".to_string()));
        }
        if !self.weight_kg.is_finite() || self.weight_kg < 0.0 {
            return Err(AppError::BadRequest(
                "weight_kg must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Return joined with submitter and package info for retailer-facing lists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReturnWithContext {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub package_name: String,
    pub category: String,
    pub material: Option<String>,
    pub size: String,
    pub weight_kg: f64,
    pub barcode: String,
    pub status: ReturnStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make(status: ReturnStatus, code: Option<&str>, expiry: Option<DateTime<Utc>>) -> ReturnRequest {
        ReturnRequest {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            package_id: Some(Uuid::new_v4()),
            retailer_id: None,
            package_name: "Shoe box".to_string(),
            category: "Footwear".to_string(),
            size: "medium".to_string(),
            weight_kg: 0.4,
            photo: None,
            scanned_code: None,
            barcode: "RL-0001".to_string(),
            status,
            otp_code: code.map(|c| c.to_string()),
            otp_expiry: expiry,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ── Transition guards ─────────────────────────────────────────────────────

    #[test]
    fn terminal_record_rejects_any_transition() {
        for status in [ReturnStatus::Approved, ReturnStatus::Rejected] {
            let r = make(status, None, None);
            assert!(matches!(r.ensure_open(), Err(AppError::AlreadyFinalized)));
            assert!(matches!(
                r.ensure_confirmable("1234", Utc::now()),
                Err(AppError::AlreadyFinalized)
            ));
        }
    }

    #[test]
    fn confirm_without_code_is_code_not_issued() {
        let r = make(ReturnStatus::Initiated, None, None);
        assert!(matches!(
            r.ensure_confirmable("1234", Utc::now()),
            Err(AppError::CodeNotIssued)
        ));
    }

    #[test]
    fn confirm_at_exact_expiry_is_expired() {
        let now = Utc::now();
        let r = make(ReturnStatus::Initiated, Some("0042"), Some(now));
        assert!(matches!(
            r.ensure_confirmable("0042", now),
            Err(AppError::CodeExpired)
        ));
    }

    #[test]
    fn confirm_one_second_before_expiry_succeeds() {
        let now = Utc::now();
        let r = make(
            ReturnStatus::Initiated,
            Some("0042"),
            Some(now + Duration::seconds(1)),
        );
        assert!(r.ensure_confirmable("0042", now).is_ok());
    }

    #[test]
    fn wrong_code_is_mismatch() {
        let now = Utc::now();
        let r = make(
            ReturnStatus::Initiated,
            Some("0042"),
            Some(now + Duration::minutes(5)),
        );
        assert!(matches!(
            r.ensure_confirmable("0043", now),
            Err(AppError::CodeMismatch)
        ));
    }

    #[test]
    fn live_code_window() {
        let now = Utc::now();
        let live = make(ReturnStatus::Initiated, Some("0001"), Some(now + Duration::minutes(1)));
        let stale = make(ReturnStatus::Initiated, Some("0001"), Some(now - Duration::minutes(1)));
        let none = make(ReturnStatus::Initiated, None, None);
        assert!(live.has_live_code(now));
        assert!(!stale.has_live_code(now));
        assert!(!none.has_live_code(now));
    }

    // ── Status filter parsing ─────────────────────────────────────────────────

    #[test]
    fn pending_and_initiated_are_the_same_queue() {
        assert_eq!("pending".parse::<StatusFilter>().unwrap(), StatusFilter::Pending);
        assert_eq!("initiated".parse::<StatusFilter>().unwrap(), StatusFilter::Pending);
        assert_eq!("Approved".parse::<StatusFilter>().unwrap(), StatusFilter::Approved);
        assert_eq!("REJECTED".parse::<StatusFilter>().unwrap(), StatusFilter::Rejected);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert!(matches!(
            "shipped".parse::<StatusFilter>(),
            Err(AppError::BadRequest(_))
        ));
    }

    // ── Submission validation ─────────────────────────────────────────────────

    fn payload() -> SubmitReturn {
        SubmitReturn {
            package_name: "Cereal box".to_string(),
            category: "Food".to_string(),
            size: "large".to_string(),
            weight_kg: 0.3,
            photo: None,
            scanned_code: None,
            barcode: "RL-1234".to_string(),
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut p = payload();
        p.weight_kg = -0.1;
        assert!(matches!(p.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn nan_weight_is_rejected() {
        let mut p = payload();
        p.weight_kg = f64::NAN;
        assert!(matches!(p.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn zero_weight_is_allowed() {
        let mut p = payload();
        p.weight_kg = 0.0;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        for field in ["package_name", "category", "size", "barcode"] {
            let mut p = payload();
            match field {
                "package_name" => p.package_name = "  ".to_string(),
                "category" => p.category = String::new(),
                "size" => p.size = String::new(),
                _ => p.barcode = String::new(),
            }
            assert!(p.validate().is_err(), "{} should be required", field);
        }
    }
}
