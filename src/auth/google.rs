use anyhow::Context;
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::GoogleConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Identity asserted by Google for a consenting user.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

/// Authorization-code client for Google sign-in. Constructed once at startup
/// when credentials are configured.
pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(AUTH_URL.to_string()).context("google auth url")?,
            Some(TokenUrl::new(TOKEN_URL.to_string()).context("google token url")?),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.callback_url.clone()).context("google callback url")?,
        );
        Ok(Self {
            client,
            http: reqwest::Client::new(),
        })
    }

    /// Consent-screen URL requesting the profile and email scopes, plus the
    /// CSRF state to round-trip through the browser.
    pub fn authorization_url(&self) -> (Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url()
    }

    /// Exchange the callback code for an access token and fetch the profile.
    pub async fn fetch_identity(&self, code: String) -> anyhow::Result<GoogleProfile> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .context("exchange authorization code")?;

        let profile: GoogleProfile = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .context("fetch google userinfo")?
            .error_for_status()
            .context("google userinfo status")?
            .json()
            .await
            .context("decode google userinfo")?;

        debug!(google_id = %profile.id, "google identity fetched");
        Ok(profile)
    }
}
