/// Apple Search Ads API integration module
///
/// This module provides the authenticated request pipeline used by every
/// command: credential signing, token exchange and caching, header injection,
/// the generic REST client and the query/pagination helpers built on it.
///
/// ## Authorization Flow
///
/// 1. The API user's EC private key signs a short client assertion (ES256)
/// 2. The assertion is exchanged at the identity provider for an access token
/// 3. The token is cached in memory and on disk until 5 minutes before expiry
/// 4. Every API request carries `Authorization: Bearer <token>` and, when an
///    organization is selected, `X-AP-Context: orgId=<id>`
pub mod auth;
pub mod client;
pub mod jwt;
pub mod org;
pub mod paginate;
pub mod resources;
pub mod selector;
pub mod services;
pub mod token_storage;
pub mod transport;
pub mod types;

pub use auth::{StaticToken, TokenProvider, TokenSource};
pub use client::{ApiClient, ApiResponse, PageDetail};
pub use jwt::{load_private_key, sign_client_assertion, ClientAssertionClaims};
pub use org::resolve_org_id;
pub use paginate::{fetch_all, PageSource};
pub use resources::*;
pub use selector::{Condition, Operator, OrderByItem, Pagination, Selector, SortOrder};
pub use services::{AclService, CampaignService, ReportLevel, ReportingService};
pub use token_storage::{load_cached_token, save_cached_token, TokenRecord};
pub use transport::AuthTransport;
pub use types::{ApiError, ApiErrorEntry, AsaError, Credentials};
