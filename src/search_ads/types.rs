use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Search Ads error type
///
/// Every layer of the request pipeline returns one of these kinds, adding
/// context about which operation failed before passing it up.
#[derive(Debug)]
pub enum AsaError {
    /// Missing credential field, unreadable private key or bad config file
    Config(String),
    /// The identity provider rejected or garbled the token exchange
    TokenExchange(String),
    /// Network, timeout, or unstructured HTTP failure
    Transport(ApiError),
    /// Structured error envelope returned by the Search Ads API
    Api {
        status: u16,
        errors: Vec<ApiErrorEntry>,
    },
    /// Zero or several organizations and none was configured
    AmbiguousOrg(String),
    /// Writing configuration or cache files failed
    Storage(String),
}

impl fmt::Display for AsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsaError::Config(msg) => write!(f, "{}", msg),
            AsaError::TokenExchange(msg) => write!(f, "{}", msg),
            AsaError::Transport(err) => write!(f, "{}", err),
            AsaError::Api { status, errors } => {
                let joined = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "API error (HTTP {}): {}", status, joined)
            }
            AsaError::AmbiguousOrg(msg) => write!(f, "{}", msg),
            AsaError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for AsaError {}

impl From<ApiError> for AsaError {
    fn from(err: ApiError) -> Self {
        AsaError::Transport(err)
    }
}

impl AsaError {
    /// Prefix the message with the operation that failed
    ///
    /// Structured API errors keep their entries; everything else is
    /// re-wrapped in the same kind with `"<context>: <message>"`.
    pub fn context(self, context: &str) -> Self {
        match self {
            AsaError::Config(msg) => AsaError::Config(format!("{}: {}", context, msg)),
            AsaError::TokenExchange(msg) => {
                AsaError::TokenExchange(format!("{}: {}", context, msg))
            }
            AsaError::Transport(err) => AsaError::Transport(err.context(context)),
            AsaError::AmbiguousOrg(msg) => AsaError::AmbiguousOrg(msg),
            AsaError::Storage(msg) => AsaError::Storage(format!("{}: {}", context, msg)),
            api @ AsaError::Api { .. } => api,
        }
    }
}

/// Transport-level errors
#[derive(Debug)]
pub enum ApiError {
    /// Network error (connection, timeout, TLS, etc.)
    Network(String),
    /// HTTP error with status code and no usable error envelope
    Http { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Request building failed
    Request(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { message, .. } => write!(f, "{}", message),
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Request(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn context(self, context: &str) -> Self {
        match self {
            ApiError::Network(msg) => ApiError::Network(format!("{}: {}", context, msg)),
            ApiError::Http { status, message } => ApiError::Http {
                status,
                message: format!("{}: {}", context, message),
            },
            ApiError::Parse(msg) => ApiError::Parse(format!("{}: {}", context, msg)),
            ApiError::Request(msg) => ApiError::Request(format!("{}: {}", context, msg)),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timeout".to_string())
        } else if err.is_connect() {
            ApiError::Network(format!("Connection failed: {}", err))
        } else if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: format!("HTTP {}", status.as_u16()),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// One entry of the provider's `{errors: [...]}` envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub message_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl fmt::Display for ApiErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.message_code.is_empty() {
            write!(f, " ({})", self.message_code)?;
        }
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, " [field: {}]", field),
            _ => Ok(()),
        }
    }
}

/// Error envelope returned on non-2xx responses
///
/// The entries appear either at the top level (`{errors: [...]}`) or nested
/// under `error` (`{error: {errors: [...]}}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
    #[serde(default)]
    error: Option<Box<ErrorEnvelope>>,
}

impl ErrorEnvelope {
    pub(crate) fn into_entries(self) -> Vec<ApiErrorEntry> {
        let mut entries = self.errors;
        if let Some(nested) = self.error {
            entries.extend(nested.into_entries());
        }
        entries
    }
}

/// API user credentials for one configuration profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub client_id: String,
    pub team_id: String,
    pub key_id: String,
    pub private_key_path: PathBuf,
    pub org_id: Option<String>,
}

impl Credentials {
    /// Check that every field except the org id is present
    ///
    /// Runs before any network call. The private key file must also exist;
    /// parsing it is left to the signer.
    pub fn validate(&self) -> Result<(), AsaError> {
        let mut missing = Vec::new();
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.team_id.trim().is_empty() {
            missing.push("team_id");
        }
        if self.key_id.trim().is_empty() {
            missing.push("key_id");
        }
        if self.private_key_path.as_os_str().is_empty() {
            missing.push("private_key_path");
        }
        if !missing.is_empty() {
            return Err(AsaError::Config(format!(
                "missing required config: {}\nRun 'asa-cli configure' to set up credentials",
                missing.join(", ")
            )));
        }

        if !self.private_key_path.exists() {
            return Err(AsaError::Config(format!(
                "private key file not found: {}",
                self.private_key_path.display()
            )));
        }

        Ok(())
    }
}
