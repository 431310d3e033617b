use crate::search_ads::transport::AuthTransport;
use crate::search_ads::types::{ApiError, AsaError, ErrorEnvelope};
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Search Ads Campaign Management API base URL
pub const BASE_URL: &str = "https://api.searchads.apple.com/api/v5";

/// Pagination metadata attached to list and find responses
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageDetail {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub start_index: u64,
    #[serde(default)]
    pub items_per_page: u64,
}

/// Unwrapped `{data, pagination}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    /// `None` for single-resource responses
    #[serde(default)]
    pub pagination: Option<PageDetail>,
}

/// Generic Search Ads REST client
///
/// Every request goes through the [`AuthTransport`]. Successful bodies are
/// unwrapped from the response envelope; failures are classified as
/// structured API errors, bare HTTP errors or transport errors.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    transport: AuthTransport,
}

impl ApiClient {
    /// Create a client against the production API
    pub fn new(transport: AuthTransport) -> Self {
        Self::with_base_url(BASE_URL, transport)
    }

    /// Create a client against another base URL
    ///
    /// # Example
    ///
    /// ```no_run
    /// use asa_cli::{ApiClient, AuthTransport, StaticToken};
    /// use std::sync::Arc;
    ///
    /// let transport = AuthTransport::new(Arc::new(StaticToken("token".to_string()))).unwrap();
    /// let client = ApiClient::with_base_url("http://localhost:8080/api/v5", transport);
    /// ```
    pub fn with_base_url(base_url: impl Into<String>, transport: AuthTransport) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("Creating ApiClient with base URL: {}", base_url);
        Self {
            base_url,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &AuthTransport {
        &self.transport
    }

    /// GET `path` and unwrap the envelope
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, AsaError> {
        let body = self.send::<()>(Method::GET, path, None).await?;
        decode_envelope(&body)
    }

    /// POST a JSON body to `path` and unwrap the envelope
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, AsaError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(Method::POST, path, Some(body)).await?;
        decode_envelope(&body)
    }

    /// PUT a JSON body to `path` and unwrap the envelope
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, AsaError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.send(Method::PUT, path, Some(body)).await?;
        decode_envelope(&body)
    }

    /// DELETE `path`; any 2xx status is success regardless of body
    pub async fn delete(&self, path: &str) -> Result<(), AsaError> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Issue one request and return the raw body of a 2xx response
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, AsaError> {
        let url = self.url(path);

        let mut builder = self
            .transport
            .http()
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let request = builder
            .build()
            .map_err(|e| AsaError::Transport(ApiError::Request(e.to_string())))?;

        let response = self.transport.execute(request).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            tracing::error!("Failed to read response body from {}: {}", url, e);
            AsaError::Transport(ApiError::from(e))
        })?;

        if !status.is_success() {
            tracing::error!("{} {} failed: HTTP {}", method, url, status.as_u16());
            return Err(error_from_body(status, &bytes));
        }

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status.as_u16(), bytes.len());
        Ok(bytes.to_vec())
    }
}

fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<ApiResponse<T>, AsaError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse response envelope: {}", e);
        AsaError::Transport(ApiError::Parse(format!("Failed to parse response: {}", e)))
    })
}

/// Classify a non-2xx body
///
/// A parseable, non-empty `{errors: [...]}` envelope becomes
/// [`AsaError::Api`]; anything else is a bare `HTTP <status>` error.
pub(crate) fn error_from_body(status: StatusCode, body: &[u8]) -> AsaError {
    let entries = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(ErrorEnvelope::into_entries)
        .unwrap_or_default();

    match entries {
        errors if !errors.is_empty() => AsaError::Api {
            status: status.as_u16(),
            errors,
        },
        _ => AsaError::Transport(ApiError::Http {
            status: status.as_u16(),
            message: format!("HTTP {}", status.as_u16()),
        }),
    }
}
