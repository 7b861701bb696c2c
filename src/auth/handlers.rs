use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MeResponse, MessageResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        jwt::SessionKeys,
        password::{hash_password, verify_password},
        repo_types::User,
        OAUTH_STATE_COOKIE, SESSION_COOKIE,
    },
    broker::{UserCreatedEvent, USER_CREATED_QUEUE},
    error::ApiError,
    state::AppState,
};

pub fn routes(google_enabled: bool) -> Router<AppState> {
    let mut router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me));
    if google_enabled {
        router = router
            .route("/google", get(google_auth))
            .route("/google/callback", get(google_callback));
    }
    router
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn session_cookie(token: String, production: bool, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .path("/")
        .max_age(time::Duration::days(ttl_days))
        .build()
}

fn clear_session_cookie(production: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .path("/")
        .build()
}

fn oauth_state_cookie(state: String, production: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, state))
        .http_only(true)
        .secure(production)
        .same_site(SameSite::Lax)
        .path("/api/auth")
        .max_age(time::Duration::minutes(10))
        .build()
}

/// Publish the `user.created` event. Failures are logged and swallowed: the
/// account already exists, so broker trouble must not fail the request.
async fn publish_user_created(state: &AppState, user: &User) {
    let event = UserCreatedEvent::from_user(user);
    let payload = match serde_json::to_value(&event) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "serialize user.created event failed");
            return;
        }
    };
    if let Err(e) = state.broker.publish(USER_CREATED_QUEUE, &payload).await {
        error!(error = %e, user_id = %user.id, "publish user.created failed");
    }
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let fullname = payload
        .fullname
        .ok_or(ApiError::Validation("Missing required fields"))?;
    if payload.email.is_empty()
        || payload.password.is_empty()
        || fullname.first_name.trim().is_empty()
        || fullname.last_name.trim().is_empty()
    {
        return Err(ApiError::Validation("Missing required fields"));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email"));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create_local(&state.db, &payload.email, &fullname, &hash).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id, user.role)?;
    let jar = jar.add(session_cookie(
        token,
        state.config.production,
        state.config.session.ttl_days,
    ));

    publish_user_created(&state, &user).await;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "User created successfully!",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Missing credentials"));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    // A Google-created account has no password hash; fail the same way a
    // wrong password does.
    let ok = match &user.password_hash {
        Some(hash) => verify_password(&payload.password, hash)?,
        None => false,
    };
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id, user.role)?;
    let jar = jar.add(session_cookie(
        token,
        state.config.production,
        state.config.session.ttl_days,
    ));

    info!(user_id = %user.id, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful!",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(clear_session_cookie(state.config.production));
    (
        jar,
        Json(MessageResponse {
            message: "Logged out",
        }),
    )
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser { id, .. }: AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(MeResponse {
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, jar))]
pub async fn google_auth(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let google = state
        .google
        .as_ref()
        .ok_or(ApiError::NotFound("Google sign-in is not configured"))?;
    let (url, csrf) = google.authorization_url();
    let jar = jar.add(oauth_state_cookie(
        csrf.secret().clone(),
        state.config.production,
    ));
    Ok((jar, Redirect::temporary(url.as_str())))
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Browser-navigated leg of the OAuth flow: every outcome is a redirect back
/// to the frontend, never an API error body.
#[instrument(skip(state, jar, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> (CookieJar, Redirect) {
    let client_url = state.config.client_url.clone();
    let fail = Redirect::temporary(&format!("{client_url}/?oauth=fail"));
    let error = Redirect::temporary(&format!("{client_url}/?oauth=error"));

    let google = match state.google.as_ref() {
        Some(g) => g,
        None => return (jar, error),
    };

    if let Some(e) = query.error {
        warn!(error = %e, "google consent denied or failed");
        return (jar, fail);
    }

    let state_matches = match (jar.get(OAUTH_STATE_COOKIE), query.state.as_deref()) {
        (Some(cookie), Some(sent)) => cookie.value() == sent,
        _ => false,
    };
    let jar = jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path("/api/auth").build());
    if !state_matches {
        warn!("oauth state mismatch");
        return (jar, fail);
    }

    let code = match query.code {
        Some(c) => c,
        None => return (jar, fail),
    };

    let profile = match google.fetch_identity(code).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "google identity fetch failed");
            return (jar, error);
        }
    };

    let (user, created) = match User::find_or_create_from_google(&state.db, &profile).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "google user reconciliation failed");
            return (jar, error);
        }
    };

    let keys = SessionKeys::from_ref(&state);
    let token = match keys.issue(user.id, user.role) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "session token issue failed");
            return (jar, error);
        }
    };
    let jar = jar.add(session_cookie(
        token,
        state.config.production,
        state.config.session.ttl_days,
    ));

    if created {
        publish_user_created(&state, &user).await;
        info!(user_id = %user.id, "user created via google");
    } else {
        info!(user_id = %user.id, "user logged in via google");
    }

    (jar, Redirect::temporary(&client_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn session_cookie_is_hardened_in_production() {
        let cookie = session_cookie("tok".into(), true, 7);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn session_cookie_is_lax_in_development() {
        let cookie = session_cookie("tok".into(), false, 7);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn oauth_state_cookie_is_scoped_and_short_lived() {
        let cookie = oauth_state_cookie("csrf".into(), false);
        assert_eq!(cookie.name(), "oauth_state");
        assert_eq!(cookie.path(), Some("/api/auth"));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(10)));
        assert_eq!(cookie.http_only(), Some(true));
    }
}
