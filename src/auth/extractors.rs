use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use uuid::Uuid;

use crate::auth::jwt::SessionKeys;
use crate::auth::repo_types::Role;
use crate::auth::SESSION_COOKIE;
use crate::error::ApiError;

/// Token-verifying gate. Reads the session cookie first, then falls back to
/// an `Authorization: Bearer` header, and attaches `{id, role}` on success.
#[derive(Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);

        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get(axum::http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::to_string)
            })
            .ok_or(ApiError::Unauthenticated("Unauthorized"))?;

        let claims = keys.validate(&token).map_err(|e| {
            debug!(error = %e, "session token rejected");
            ApiError::Unauthenticated("Invalid or expired token")
        })?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::{header, Request, StatusCode};
    use axum::response::IntoResponse;

    fn parts_with_headers(headers: &[(header::HeaderName, String)]) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        for (name, value) in headers {
            builder = builder.header(name, value.as_str());
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn accepts_token_from_cookie() {
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, Role::Artist).unwrap();

        let mut parts =
            parts_with_headers(&[(header::COOKIE, format!("token={token}"))]);
        let auth = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("cookie token should authenticate");
        assert_eq!(auth.id, user_id);
        assert_eq!(auth.role, Role::Artist);
    }

    #[tokio::test]
    async fn falls_back_to_bearer_header() {
        let state = AppState::fake();
        let keys = SessionKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, Role::User).unwrap();

        let mut parts =
            parts_with_headers(&[(header::AUTHORIZATION, format!("Bearer {token}"))]);
        let auth = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("bearer token should authenticate");
        assert_eq!(auth.id, user_id);
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let state = AppState::fake();
        let mut parts = parts_with_headers(&[]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_401() {
        let state = AppState::fake();
        let mut parts =
            parts_with_headers(&[(header::COOKIE, "token=garbage".to_string())]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
