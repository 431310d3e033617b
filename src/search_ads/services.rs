use crate::search_ads::client::{ApiClient, PageDetail};
use crate::search_ads::paginate::fetch_all;
use crate::search_ads::resources::{
    Campaign, CampaignUpdate, ReportRequest, ReportResponse, ReportingDataResponse,
    UpdateCampaignRequest, UserAcl,
};
use crate::search_ads::selector::Selector;
use crate::search_ads::types::AsaError;

/// Campaign operations
///
/// # Example
///
/// ```no_run
/// use asa_cli::{ApiClient, AuthTransport, CampaignService, Selector, StaticToken};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), asa_cli::AsaError> {
/// let transport = AuthTransport::new(Arc::new(StaticToken("token".to_string())))?
///     .with_org_id("123456");
/// let client = ApiClient::new(transport);
///
/// let selector = Selector::from_tokens(["status=ENABLED"], ["name:asc"], 100);
/// let campaigns = CampaignService::new(&client).find_all(&selector).await?;
/// println!("{} enabled campaigns", campaigns.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CampaignService<'a> {
    client: &'a ApiClient,
}

impl<'a> CampaignService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// One page of campaigns (`GET /campaigns?limit=&offset=`)
    pub async fn list(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Campaign>, Option<PageDetail>), AsaError> {
        let path = format!("/campaigns?limit={}&offset={}", limit, offset);
        let resp = self.client.get::<Vec<Campaign>>(&path).await?;
        Ok((resp.data, resp.pagination))
    }

    pub async fn get(&self, id: i64) -> Result<Campaign, AsaError> {
        let resp = self.client.get(&format!("/campaigns/{}", id)).await?;
        Ok(resp.data)
    }

    /// One page of campaigns matching `selector`
    pub async fn find(
        &self,
        selector: &Selector,
    ) -> Result<(Vec<Campaign>, Option<PageDetail>), AsaError> {
        let resp = self
            .client
            .post::<Selector, Vec<Campaign>>("/campaigns/find", selector)
            .await?;
        Ok((resp.data, resp.pagination))
    }

    /// Every campaign matching `selector`, following pagination
    pub async fn find_all(&self, selector: &Selector) -> Result<Vec<Campaign>, AsaError> {
        fetch_all(self.client, "/campaigns/find", selector).await
    }

    pub async fn create(&self, campaign: &Campaign) -> Result<Campaign, AsaError> {
        let resp = self.client.post("/campaigns", campaign).await?;
        Ok(resp.data)
    }

    /// Update the given fields of a campaign
    pub async fn update(&self, id: i64, update: CampaignUpdate) -> Result<Campaign, AsaError> {
        let body = UpdateCampaignRequest {
            campaign: update,
            ..Default::default()
        };
        let resp = self
            .client
            .put(&format!("/campaigns/{}", id), &body)
            .await?;
        Ok(resp.data)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AsaError> {
        self.client.delete(&format!("/campaigns/{}", id)).await
    }
}

/// Access control lists: the organizations the API user can act for
#[derive(Debug, Clone, Copy)]
pub struct AclService<'a> {
    client: &'a ApiClient,
}

impl<'a> AclService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `GET /acls`; needs no organization context
    pub async fn get_acls(&self) -> Result<Vec<UserAcl>, AsaError> {
        let resp = self.client.get::<Vec<UserAcl>>("/acls").await?;
        Ok(resp.data)
    }
}

/// Which reporting endpoint to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Campaigns,
    AdGroups { campaign_id: i64 },
    Keywords { campaign_id: i64 },
    SearchTerms { campaign_id: i64 },
}

impl ReportLevel {
    pub fn path(&self) -> String {
        match self {
            ReportLevel::Campaigns => "/reports/campaigns".to_string(),
            ReportLevel::AdGroups { campaign_id } => {
                format!("/reports/campaigns/{}/adgroups", campaign_id)
            }
            ReportLevel::Keywords { campaign_id } => {
                format!("/reports/campaigns/{}/keywords", campaign_id)
            }
            ReportLevel::SearchTerms { campaign_id } => {
                format!("/reports/campaigns/{}/searchterms", campaign_id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportingService<'a> {
    client: &'a ApiClient,
}

impl<'a> ReportingService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn report(
        &self,
        level: ReportLevel,
        request: &ReportRequest,
    ) -> Result<ReportingDataResponse, AsaError> {
        let path = level.path();
        tracing::debug!("Requesting report from {}", path);
        let resp = self
            .client
            .post::<ReportRequest, ReportResponse>(&path, request)
            .await?;
        Ok(resp.data.reporting_data_response)
    }
}
