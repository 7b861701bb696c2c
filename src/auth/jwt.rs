use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::Role;
use crate::state::AppState;

/// Session JWT payload: subject id and role, time-boxed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Why a token was rejected. Callers must treat every variant as
/// unauthenticated; the split exists for logging and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
}

#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let session = &state.config.session;
        Self {
            encoding: EncodingKey::from_secret(session.secret.as_bytes()),
            decoding: DecodingKey::from_secret(session.secret.as_bytes()),
            ttl: Duration::from_secs((session.ttl_days as u64) * 24 * 60 * 60),
        }
    }
}

impl SessionKeys {
    pub fn issue(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token issued");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            },
        )?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> SessionKeys {
        SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    #[test]
    fn issue_and_validate_round_trip() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, Role::Artist).expect("issue");
        let claims = keys.validate(&token).expect("validate");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Artist);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_classified_expired() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keys = make_keys("dev-secret");
        let token = keys.issue(Uuid::new_v4(), Role::User).expect("issue");
        let (rest, sig) = token.rsplit_once('.').unwrap();
        let mut flipped = sig.to_string();
        let last = flipped.pop().unwrap();
        flipped.push(if last == 'A' { 'B' } else { 'A' });
        let tampered = format!("{rest}.{flipped}");
        assert_eq!(
            keys.validate(&tampered).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let keys = make_keys("dev-secret");
        let other = make_keys("another-secret");
        let token = other.issue(Uuid::new_v4(), Role::User).expect("issue");
        assert_eq!(
            keys.validate(&token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret");
        assert_eq!(
            keys.validate("not-a-jwt-at-all").unwrap_err(),
            TokenError::Malformed
        );
    }
}
