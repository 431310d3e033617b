//! Apple Search Ads SDK and CLI core
//!
//! A Rust library for talking to the Apple Search Ads Campaign Management API.
//!
//! This crate provides:
//! - ES256 client assertion signing from PKCS#8 or SEC1 EC private keys
//! - OAuth client-credentials token exchange with a per-profile disk cache
//! - An authenticating HTTP transport that injects bearer and org headers
//! - A generic REST client that unwraps `{data, pagination}` envelopes
//! - A filter/sort mini-language and an auto-paginator for `find` endpoints
//! - YAML configuration profiles with environment overrides
//!
//! # Example
//!
//! ```no_run
//! use asa_cli::{
//!     config::Config,
//!     ApiClient, AuthTransport, CampaignService, Selector, TokenProvider,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load credentials for the default profile
//! let config = Config::load(None).await?;
//! let credentials = config.credentials();
//! credentials.validate()?;
//!
//! // One token provider per profile, shared by every request
//! let provider = TokenProvider::new(credentials, Some(config.token_cache_path()))?;
//! let transport = AuthTransport::new(Arc::new(provider))?.with_org_id("123456");
//! let client = ApiClient::new(transport);
//!
//! // Fetch every enabled campaign, following pagination
//! let selector = Selector::from_tokens(["status=ENABLED"], ["name"], 1000);
//! let campaigns = CampaignService::new(&client).find_all(&selector).await?;
//! println!("{} campaigns", campaigns.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod output;
pub mod search_ads;

// Re-export commonly used types and functions
pub use search_ads::{
    auth::{StaticToken, TokenProvider, TokenSource},
    client::{ApiClient, ApiResponse, PageDetail},
    org::resolve_org_id,
    paginate::{fetch_all, PageSource},
    resources::{
        Campaign, CampaignUpdate, Money, ReportRequest, ReportRow, ReportingDataResponse,
        SpendRow, UserAcl,
    },
    selector::{parse_filters, parse_sorts, Condition, Operator, OrderByItem, Selector, SortOrder},
    services::{AclService, CampaignService, ReportLevel, ReportingService},
    token_storage::TokenRecord,
    transport::AuthTransport,
    types::{ApiError, ApiErrorEntry, AsaError, Credentials},
};
