use crate::search_ads::types::AsaError;
use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the per-profile token cache
pub const TOKEN_CACHE_FILE: &str = "token_cache.json";

/// Tokens this close to expiry are treated as already expired
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 5 * 60;

/// Access token issued by the identity provider
///
/// This is also the on-disk cache format:
/// `{access_token, token_type, expires_at}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    /// The bearer token string
    pub access_token: String,
    /// Token type reported by the provider (normally "Bearer")
    pub token_type: String,
    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Create a record expiring `expires_in` seconds after `now`
    ///
    /// Returns `None` when the expiry falls outside the representable range.
    pub fn new(
        access_token: String,
        token_type: String,
        expires_in: i64,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let expires_at = TimeDelta::try_seconds(expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))?;
        Some(Self {
            access_token,
            token_type,
            expires_at,
        })
    }

    /// Usable only while `now + 5 minutes` is still before expiry
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS) < self.expires_at
    }

    /// [`is_usable_at`](Self::is_usable_at) against the current time
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }
}

/// Load a cached token record
///
/// A missing, unreadable or corrupt file yields `None`; the caller then
/// performs a fresh exchange.
pub async fn load_cached_token(path: &Path) -> Option<TokenRecord> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!("No cached token at {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_slice::<TokenRecord>(&data) {
        Ok(record) => {
            tracing::debug!(
                "Loaded cached token: expires_at={}, usable={}",
                record.expires_at,
                record.is_usable()
            );
            Some(record)
        }
        Err(e) => {
            tracing::warn!("Ignoring corrupt token cache {:?}: {}", path, e);
            None
        }
    }
}

/// Persist a token record, replacing any previous file
///
/// The parent directory is created with 0700 and the file written with 0600
/// permissions on Unix.
pub async fn save_cached_token(path: &Path, record: &TokenRecord) -> Result<(), AsaError> {
    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| AsaError::Storage(format!("serializing token cache: {}", e)))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AsaError::Storage(format!("creating {:?}: {}", parent, e)))?;
        set_permissions(parent, 0o700).await?;
    }

    tokio::fs::write(path, json)
        .await
        .map_err(|e| AsaError::Storage(format!("writing {:?}: {}", path, e)))?;
    set_permissions(path, 0o600).await?;

    tracing::debug!("Token cache written to {:?}", path);
    Ok(())
}

#[cfg(unix)]
async fn set_permissions(path: &Path, mode: u32) -> Result<(), AsaError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| AsaError::Storage(format!("setting permissions on {:?}: {}", path, e)))
}

#[cfg(not(unix))]
async fn set_permissions(_path: &Path, _mode: u32) -> Result<(), AsaError> {
    Ok(())
}
