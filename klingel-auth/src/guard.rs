//! Credential guard: hands out valid access tokens and refreshes them.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{AuthError, Result, Unauthorized};
use crate::token::{TokenFile, TokenSet};

/// Google OAuth token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";

/// OAuth client registration used for refreshing tokens
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl OAuthClient {
    /// Client talking to the Google token endpoint
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Point the client at a different token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

/// Successful response of the token endpoint
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<u64>,
    refresh_token: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Holds the current credentials and keeps the access token valid
///
/// All state sits behind a mutex, so a guard can be shared between threads
/// through an `Arc`. Concurrent callers that find the token expired wait for
/// a single refresh instead of racing.
pub struct CredentialGuard {
    client: OAuthClient,
    store: TokenFile,
    tokens: Mutex<TokenSet>,
    http: reqwest::blocking::Client,
    expiry_skew: Duration,
}

impl CredentialGuard {
    /// Default margin before expiry at which a token is already refreshed
    pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(60);

    /// Load credentials from the token file
    pub fn load(client: OAuthClient, store: TokenFile) -> Result<Self> {
        let tokens = store.load()?;
        tracing::debug!("Loaded credentials from {}", store.path().display());
        Self::with_tokens(client, store, tokens)
    }

    /// Build a guard from an already loaded token set
    pub fn with_tokens(client: OAuthClient, store: TokenFile, tokens: TokenSet) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            store,
            tokens: Mutex::new(tokens),
            http,
            expiry_skew: Self::DEFAULT_EXPIRY_SKEW,
        })
    }

    /// Change the margin before expiry at which tokens are refreshed
    pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    /// Snapshot of the current credentials
    pub fn tokens(&self) -> TokenSet {
        self.tokens.lock().clone()
    }

    /// Return a usable access token, refreshing it first if it is expired or
    /// about to expire
    pub fn ensure_valid_access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock();
        let now = unix_now();

        if tokens.is_expired(now, self.expiry_skew) {
            tracing::info!("Token expired, refreshing");
            self.refresh_locked(&mut tokens)?;
        } else {
            tracing::debug!("Token still valid for {}s", tokens.remaining_secs(now));
        }

        Ok(tokens.access_token.clone())
    }

    /// Unconditionally refresh the access token and persist the new credentials
    pub fn refresh(&self) -> Result<String> {
        let mut tokens = self.tokens.lock();
        self.refresh_locked(&mut tokens)?;
        Ok(tokens.access_token.clone())
    }

    /// Run an authenticated call with one refresh-and-retry on 401.
    ///
    /// `call` receives the bearer token. If it fails with an unauthorized
    /// error, the token is refreshed and `call` runs exactly once more; the
    /// outcome of that second attempt is returned as is.
    pub fn authorized<T, E, F>(&self, mut call: F) -> std::result::Result<T, E>
    where
        F: FnMut(&str) -> std::result::Result<T, E>,
        E: From<AuthError> + Unauthorized,
    {
        let token = self.ensure_valid_access_token()?;
        match call(&token) {
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("Request was unauthorized, refreshing token and retrying once");
                let token = self.refresh()?;
                call(&token)
            }
            other => other,
        }
    }

    fn refresh_locked(&self, tokens: &mut TokenSet) -> Result<()> {
        if tokens.refresh_token.is_empty() {
            return Err(AuthError::Refresh("no refresh token stored".to_string()));
        }

        let response = self
            .http
            .post(&self.client.token_url)
            .form(&[
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("refresh_token", tokens.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .map_err(|e| AuthError::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!("Error while refreshing token: HTTP {} {}", status.as_u16(), body);
            return Err(AuthError::Refresh(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let renewed: RefreshResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(format!("Invalid token response: {}", e)))?;

        let mut updated = TokenSet {
            access_token: renewed.access_token,
            refresh_token: renewed
                .refresh_token
                .unwrap_or_else(|| tokens.refresh_token.clone()),
            expires_in: renewed.expires_in.unwrap_or(tokens.expires_in),
            generated_at: unix_now(),
            extra: tokens.extra.clone(),
        };
        updated.extra.extend(renewed.extra);

        self.store.save(&updated)?;
        *tokens = updated;
        tracing::info!("Token refreshed");
        Ok(())
    }
}

impl std::fmt::Debug for CredentialGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGuard")
            .field("client_id", &self.client.client_id)
            .field("token_url", &self.client.token_url)
            .field("store", &self.store.path())
            .field("expiry_skew", &self.expiry_skew)
            .finish_non_exhaustive()
    }
}

/// Current wall-clock time as fractional unix seconds
fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
