use crate::search_ads::types::{AsaError, Credentials};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, PrivateKeyInfo, SecretDocument};
use p256::SecretKey;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audience the identity provider expects in client assertions
pub const ASSERTION_AUDIENCE: &str = "https://appleid.apple.com";

/// Longest assertion lifetime the identity provider accepts (180 days)
pub const ASSERTION_LIFETIME_DAYS: i64 = 180;

/// Claims of the client assertion presented as `client_secret`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientAssertionClaims {
    /// Issuer - the team ID
    pub iss: String,
    /// Subject - the client ID
    pub sub: String,
    /// Audience - fixed identity provider URL
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl ClientAssertionClaims {
    /// Build the claim set for `credentials` issued at `now`
    pub fn new(credentials: &Credentials, now: DateTime<Utc>) -> Self {
        let issued_at = now.timestamp();
        Self {
            iss: credentials.team_id.clone(),
            sub: credentials.client_id.clone(),
            aud: ASSERTION_AUDIENCE.to_string(),
            iat: issued_at,
            exp: (now + Duration::days(ASSERTION_LIFETIME_DAYS)).timestamp(),
        }
    }
}

/// Load a P-256 private key from a PEM file
///
/// PKCS#8 (`BEGIN PRIVATE KEY`) is tried first, then SEC1
/// (`BEGIN EC PRIVATE KEY`). A well-formed PKCS#8 container holding some
/// other algorithm is rejected without trying SEC1.
pub fn load_private_key(path: &Path) -> Result<SecretKey, AsaError> {
    let pem = std::fs::read_to_string(path).map_err(|e| {
        AsaError::Config(format!(
            "reading private key file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_private_key_pem(&pem)
}

/// Parse a PEM-encoded P-256 private key (PKCS#8 or SEC1)
pub fn parse_private_key_pem(pem: &str) -> Result<SecretKey, AsaError> {
    if !pem.contains("-----BEGIN ") {
        return Err(AsaError::Config(
            "no PEM block found in private key file".to_string(),
        ));
    }

    match SecretKey::from_pkcs8_pem(pem) {
        Ok(key) => {
            tracing::debug!("Loaded PKCS#8 EC private key");
            return Ok(key);
        }
        Err(e) => {
            tracing::debug!("Private key is not a PKCS#8 P-256 key: {}", e);
            if is_foreign_pkcs8(pem) {
                return Err(AsaError::Config(
                    "unparseable private key: PKCS#8 key is not an ECDSA P-256 key".to_string(),
                ));
            }
        }
    }

    match SecretKey::from_sec1_pem(pem) {
        Ok(key) => {
            tracing::debug!("Loaded SEC1 EC private key");
            Ok(key)
        }
        Err(e) => {
            tracing::debug!("Private key is not a SEC1 key: {}", e);
            Err(AsaError::Config(
                "unparseable private key (tried PKCS#8 and SEC1 formats)".to_string(),
            ))
        }
    }
}

/// True when the PEM holds a valid PKCS#8 structure for a non-P-256 algorithm
fn is_foreign_pkcs8(pem: &str) -> bool {
    match SecretDocument::from_pem(pem) {
        Ok((label, doc)) => label == "PRIVATE KEY" && doc.decode_msg::<PrivateKeyInfo<'_>>().is_ok(),
        Err(_) => false,
    }
}

/// Sign a fresh ES256 client assertion
///
/// The header carries `kid` = key ID; claims come from
/// [`ClientAssertionClaims::new`]. Assertions are never cached.
pub fn sign_client_assertion(
    credentials: &Credentials,
    key: &SecretKey,
    now: DateTime<Utc>,
) -> Result<String, AsaError> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| AsaError::Config(format!("encoding private key: {}", e)))?;
    let encoding_key = EncodingKey::from_ec_der(der.as_bytes());

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(credentials.key_id.clone());

    let claims = ClientAssertionClaims::new(credentials, now);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| AsaError::Config(format!("signing client assertion: {}", e)))
}
