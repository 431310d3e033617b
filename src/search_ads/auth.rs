use crate::search_ads::jwt::{load_private_key, sign_client_assertion};
use crate::search_ads::token_storage::{load_cached_token, save_cached_token, TokenRecord};
use crate::search_ads::types::{ApiError, AsaError, Credentials};
use chrono::Utc;
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::Mutex;

/// Identity provider token endpoint
pub const TOKEN_URL: &str = "https://appleid.apple.com/auth/oauth2/token";

/// Scope requested in the client-credentials grant
pub const TOKEN_SCOPE: &str = "searchadsorg";

/// Timeout applied to every HTTP request (connect, TLS and body read)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can hand out a bearer token
///
/// The authenticating transport only depends on this trait, so tests can
/// swap the real [`TokenProvider`] for a fixed token or a failing source.
pub trait TokenSource: Send + Sync {
    /// Return a usable bearer token, exchanging credentials if needed
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<String, AsaError>> + Send + '_>>;
}

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Error body of the token endpoint; only the short code is surfaced
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Default)]
struct CacheState {
    record: Option<TokenRecord>,
    disk_checked: bool,
}

/// Exchanges API credentials for access tokens and caches them
///
/// One provider exists per configuration profile. It is constructed
/// explicitly and shared by reference (usually `Arc`) with every component
/// that sends requests.
///
/// # Concurrency
///
/// [`get_token`](Self::get_token) holds an async mutex across the whole
/// read-cache / exchange / write-cache sequence. Concurrent callers queue on
/// the lock and the ones arriving after a successful exchange simply read
/// the fresh record, so at most one exchange is ever in flight.
#[derive(Debug)]
pub struct TokenProvider {
    credentials: Credentials,
    token_url: String,
    cache_path: Option<PathBuf>,
    http: reqwest::Client,
    state: Mutex<CacheState>,
}

impl TokenProvider {
    /// Create a provider for `credentials`
    ///
    /// `cache_path` is the per-profile token cache file. `None` keeps tokens
    /// in memory only.
    pub fn new(credentials: Credentials, cache_path: Option<PathBuf>) -> Result<Self, AsaError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                AsaError::Transport(ApiError::Request(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            credentials,
            token_url: TOKEN_URL.to_string(),
            cache_path,
            http,
            state: Mutex::new(CacheState::default()),
        })
    }

    /// Point the provider at a different token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Return a bearer token, exchanging credentials only when necessary
    ///
    /// 1. Load the on-disk cache the first time this provider is used
    /// 2. Return the cached token if it outlives the 5 minute safety margin
    /// 3. Otherwise sign a fresh assertion and exchange it
    /// 4. Store the new record in memory and on disk
    ///
    /// Failures are never retried here.
    pub async fn get_token(&self) -> Result<String, AsaError> {
        let mut state = self.state.lock().await;

        if !state.disk_checked {
            state.disk_checked = true;
            if let Some(path) = &self.cache_path {
                state.record = load_cached_token(path).await;
            }
        }

        if let Some(record) = &state.record {
            if record.is_usable() {
                tracing::debug!("Using cached access token (expires_at={})", record.expires_at);
                return Ok(record.access_token.clone());
            }
            tracing::debug!("Cached access token expires at {}, refreshing", record.expires_at);
        }

        let record = self.exchange().await?;

        if let Some(path) = &self.cache_path {
            if let Err(e) = save_cached_token(path, &record).await {
                tracing::warn!("Failed to persist token cache: {}", e);
            }
        }

        let token = record.access_token.clone();
        state.record = Some(record);
        Ok(token)
    }

    /// Perform one client-credentials exchange
    async fn exchange(&self) -> Result<TokenRecord, AsaError> {
        let key = load_private_key(&self.credentials.private_key_path)
            .map_err(|e| e.context("generating client secret"))?;
        let now = Utc::now();
        let client_secret = sign_client_assertion(&self.credentials, &key, now)
            .map_err(|e| e.context("generating client secret"))?;

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", TOKEN_SCOPE),
        ];

        tracing::info!("Exchanging client credentials for an access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Token exchange request failed: {}", e);
                AsaError::TokenExchange(format!("token exchange failed: {}", ApiError::from(e)))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            AsaError::TokenExchange(format!(
                "token exchange failed: reading token response: {}",
                ApiError::from(e)
            ))
        })?;

        if !status.is_success() {
            let code = serde_json::from_slice::<TokenErrorResponse>(&body)
                .ok()
                .map(|e| e.error)
                .filter(|e| !e.is_empty());
            tracing::error!("Token exchange rejected: HTTP {}", status.as_u16());
            return Err(AsaError::TokenExchange(match code {
                Some(code) => format!(
                    "token exchange failed (HTTP {}): {}",
                    status.as_u16(),
                    code
                ),
                None => format!("token exchange failed (HTTP {})", status.as_u16()),
            }));
        }

        let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            AsaError::TokenExchange(format!(
                "token exchange failed: parsing token response: {}",
                e
            ))
        })?;

        let expires_in = parsed.expires_in;
        let record = TokenRecord::new(
            parsed.access_token,
            parsed.token_type,
            expires_in,
            Utc::now(),
        )
        .ok_or_else(|| {
            tracing::error!("Token response carried an unusable expires_in: {}", expires_in);
            AsaError::TokenExchange(format!(
                "token exchange failed: invalid expires_in {}",
                expires_in
            ))
        })?;
        tracing::info!("Access token obtained: expires_at={}", record.expires_at);
        Ok(record)
    }
}

impl TokenSource for TokenProvider {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<String, AsaError>> + Send + '_>> {
        Box::pin(self.get_token())
    }
}

/// A token source that always returns the same token
///
/// Handy for tools that already hold a token and for tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token(&self) -> Pin<Box<dyn Future<Output = Result<String, AsaError>> + Send + '_>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_defaults_token_type() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","expires_in":3600}"#).unwrap();
        assert_eq!(parsed.token_type, "Bearer");
        assert_eq!(parsed.expires_in, 3600);
    }

    #[test]
    fn test_token_error_response_parses_code_only() {
        let parsed: TokenErrorResponse = serde_json::from_str(
            r#"{"error":"invalid_client","error_description":"secret stuff"}"#,
        )
        .unwrap();
        assert_eq!(parsed.error, "invalid_client");
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = StaticToken("fixed".to_string());
        assert_eq!(source.token().await.unwrap(), "fixed");
    }

    #[tokio::test]
    async fn test_bad_key_fails_before_network() {
        let dir = tempfile::TempDir::new().unwrap();
        let key_path = dir.path().join("key.pem");
        std::fs::write(&key_path, "garbage").unwrap();

        let provider = TokenProvider::new(
            Credentials {
                client_id: "c".to_string(),
                team_id: "t".to_string(),
                key_id: "k".to_string(),
                private_key_path: key_path,
                org_id: None,
            },
            None,
        )
        .unwrap()
        // Nothing listens here; reaching the network would be a transport error.
        .with_token_url("http://127.0.0.1:9/token");

        let err = provider.get_token().await.unwrap_err();
        assert!(matches!(err, AsaError::Config(_)));
        assert!(err.to_string().contains("generating client secret"));
    }
}
