use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_token(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Config(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims.sub)
            .map_err(|e| {
                warn!("Rejected bearer token: {}", e);
                AppError::Unauthorized
            })
    }
}

/// The authenticated caller. Every ownership-scoped query takes `user_id` from here.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let user_id = state.jwt.verify(token)?;
        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_verifies_to_same_user() {
        let keys = JwtKeys::new("test-secret");
        let user = Uuid::new_v4();
        let token = keys.issue_token(user, Duration::hours(1)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), user);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtKeys::new("one-secret");
        let verifier = JwtKeys::new("another-secret");
        let token = issuer.issue_token(Uuid::new_v4(), Duration::hours(1)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        let token = keys.issue_token(Uuid::new_v4(), Duration::hours(-2)).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        assert!(matches!(keys.verify("not-a-jwt"), Err(AppError::Unauthorized)));
    }
}
