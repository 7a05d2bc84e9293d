use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Claims carried by the bearer token. Token issuance lives in the identity
/// service; this service only verifies and extracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: String,
    /// Expiration (unix seconds), enforced by the decoder
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Retailer,
}

/// The resolved identity every operation receives. Role checks happen inside
/// the lifecycle operations, not per route.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn require_retailer(&self) -> Result<(), AppError> {
        if self.role != Role::Retailer {
            return Err(AppError::Forbidden(
                "this action requires the retailer role".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("malformed Authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a Bearer token".to_string()))?;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {}", e)))?
        .claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("invalid user id in token".to_string()))?;

        let role = match claims.role.as_str() {
            "retailer" => Role::Retailer,
            "user" => Role::User,
            other => {
                return Err(AppError::Unauthorized(format!(
                    "unknown role '{}' in token",
                    other
                )))
            }
        };

        Ok(Principal { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retailer_gate() {
        let retailer = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Retailer,
        };
        let user = Principal {
            user_id: Uuid::new_v4(),
            role: Role::User,
        };
        assert!(retailer.require_retailer().is_ok());
        assert!(matches!(
            user.require_retailer(),
            Err(AppError::Forbidden(_))
        ));
    }
}
