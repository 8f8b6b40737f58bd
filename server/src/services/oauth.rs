//! Google OAuth: authorize URL, code exchange, profile fetch.

use crate::frame::ErrorCode;
use crate::services::owner::OAuthIdentity;

const AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Google OAuth configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl GoogleConfig {
    /// Load from `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`.
    /// Returns `None` if any are missing (Google sign-in will be disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI").ok()?;
        Some(Self { client_id, client_secret, redirect_uri })
    }

    /// Build the Google authorization URL carrying the CSRF `state`.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{AUTHORIZE_ENDPOINT}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&prompt=select_account",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        )
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

impl From<GoogleProfile> for OAuthIdentity {
    fn from(profile: GoogleProfile) -> Self {
        Self { subject: profile.sub, email: profile.email, name: profile.name }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("google token exchange failed: {0}")]
    TokenExchange(String),
    #[error("google api error: {0}")]
    GoogleApi(String),
    #[error("google account email is not verified")]
    UnverifiedEmail,
}

impl ErrorCode for OAuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::TokenExchange(_) => "E_OAUTH_EXCHANGE",
            Self::GoogleApi(_) => "E_OAUTH_PROFILE",
            Self::UnverifiedEmail => "E_OAUTH_UNVERIFIED",
        }
    }

    fn retryable(&self) -> bool {
        !matches!(self, Self::UnverifiedEmail)
    }
}

/// Exchange an OAuth code for an access token.
pub async fn exchange_code(config: &GoogleConfig, code: &str) -> Result<String, OAuthError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(TOKEN_ENDPOINT)
        .header("Accept", "application/json")
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

    let body = resp
        .text()
        .await
        .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;
    let token_resp: TokenResponse =
        serde_json::from_str(&body).map_err(|_| OAuthError::TokenExchange(format!("unexpected response: {body}")))?;
    Ok(token_resp.access_token)
}

/// Fetch the signed-in Google account's profile.
pub async fn fetch_profile(access_token: &str) -> Result<GoogleProfile, OAuthError> {
    let client = reqwest::Client::new();
    let resp = client
        .get(USERINFO_ENDPOINT)
        .header("Authorization", format!("Bearer {access_token}"))
        .send()
        .await
        .map_err(|e| OAuthError::GoogleApi(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(OAuthError::GoogleApi(format!("{status}: {body}")));
    }

    let profile = resp
        .json::<GoogleProfile>()
        .await
        .map_err(|e| OAuthError::GoogleApi(e.to_string()))?;
    if !profile.email_verified {
        return Err(OAuthError::UnverifiedEmail);
    }
    Ok(profile)
}
