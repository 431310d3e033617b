use crate::search_ads::auth::{TokenSource, REQUEST_TIMEOUT};
use crate::search_ads::types::{ApiError, AsaError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::sync::Arc;

/// Organization context header
pub const ORG_CONTEXT_HEADER: &str = "X-AP-Context";

const REDACTED_AUTHORIZATION: &str = "Bearer ***";
const REDACTED_ORG_CONTEXT: &str = "orgId=***";

/// HTTP transport that authenticates every outbound request
///
/// Before sending, a token is fetched from the [`TokenSource`] (which may
/// trigger an exchange) and the `Authorization` and `X-AP-Context` headers
/// are set. If no token can be obtained the request is dropped unsent.
#[derive(Clone)]
pub struct AuthTransport {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    org_id: Option<String>,
    verbose: bool,
}

impl std::fmt::Debug for AuthTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTransport")
            .field("org_id", &self.org_id.as_ref().map(|_| "***"))
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl AuthTransport {
    /// Create a transport with the default 30 second timeout
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self, AsaError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                AsaError::Transport(ApiError::Request(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;
        Ok(Self::with_client(http, tokens))
    }

    /// Wrap an existing `reqwest::Client`
    pub fn with_client(http: reqwest::Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            tokens,
            org_id: None,
            verbose: false,
        }
    }

    /// Scope every request to this organization
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        let org_id = org_id.into();
        self.org_id = if org_id.is_empty() { None } else { Some(org_id) };
        self
    }

    /// Print redacted request/response traces to stderr
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn org_id(&self) -> Option<&str> {
        self.org_id.as_deref()
    }

    /// Underlying client, used to build requests
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Authenticate and send one request
    pub async fn execute(&self, mut request: reqwest::Request) -> Result<reqwest::Response, AsaError> {
        let token = self.tokens.token().await.map_err(|e| e.context("auth"))?;

        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer_value(&token)?);
        if let Some(org_id) = &self.org_id {
            let value = HeaderValue::from_str(&format!("orgId={}", org_id)).map_err(|e| {
                AsaError::Config(format!("invalid organization id: {}", e))
            })?;
            headers.insert(HeaderName::from_static("x-ap-context"), value);
        }

        if self.verbose {
            for line in trace_request(&request) {
                eprintln!("{}", line);
            }
        }

        tracing::debug!("{} {}", request.method(), request.url());

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::error!("Request failed: {}", e);
            AsaError::Transport(ApiError::from(e))
        })?;

        if self.verbose {
            eprintln!("{}", trace_response(&response));
        }

        Ok(response)
    }
}

fn bearer_value(token: &str) -> Result<HeaderValue, AsaError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| AsaError::TokenExchange(format!("access token is not a valid header: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Request trace lines with the token and org id replaced by placeholders
pub fn trace_request(request: &reqwest::Request) -> Vec<String> {
    let mut lines = vec![format!("> {} {}", request.method(), request.url())];
    lines.extend(trace_headers(request.headers()));
    lines
}

fn trace_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                REDACTED_AUTHORIZATION.to_string()
            } else if name.as_str().eq_ignore_ascii_case(ORG_CONTEXT_HEADER) {
                REDACTED_ORG_CONTEXT.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            format!("> {}: {}", name, shown)
        })
        .collect()
}

/// Response status line trace
pub fn trace_response(response: &reqwest::Response) -> String {
    format!("< {} {:?}", response.status(), response.version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT;

    #[test]
    fn test_trace_redacts_token_and_org() {
        let client = reqwest::Client::new();
        let mut request = client
            .get("https://api.searchads.apple.com/api/v5/campaigns")
            .build()
            .unwrap();
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret-token"));
        headers.insert(
            HeaderName::from_static("x-ap-context"),
            HeaderValue::from_static("orgId=123456"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let lines = trace_request(&request);
        let joined = lines.join("\n");

        assert_eq!(lines[0], "> GET https://api.searchads.apple.com/api/v5/campaigns");
        assert!(joined.contains("> authorization: Bearer ***"));
        assert!(joined.contains("> x-ap-context: orgId=***"));
        assert!(joined.contains("> accept: application/json"));
        assert!(!joined.contains("secret-token"));
        assert!(!joined.contains("123456"));
    }

    #[test]
    fn test_empty_org_id_means_no_context() {
        let transport = AuthTransport::with_client(
            reqwest::Client::new(),
            Arc::new(crate::search_ads::auth::StaticToken("t".to_string())),
        )
        .with_org_id("");
        assert!(transport.org_id().is_none());
    }

    #[test]
    fn test_debug_hides_org_id() {
        let transport = AuthTransport::with_client(
            reqwest::Client::new(),
            Arc::new(crate::search_ads::auth::StaticToken("t".to_string())),
        )
        .with_org_id("987654");
        assert!(!format!("{:?}", transport).contains("987654"));
    }
}
