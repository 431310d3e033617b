use crate::search_ads::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Monetary amount as returned by the API (amount is a decimal string)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Organization access entry from `GET /acls`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAcl {
    pub org_id: i64,
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub payment_model: String,
    #[serde(default)]
    pub role_names: Vec<String>,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_org_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Search Ads campaign
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub org_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub adam_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub serving_state_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supply_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_channel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_event: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries_or_regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_or_region_serving_state_reasons: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc_invoice_details: Option<LocInvoiceDetails>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Line-of-credit billing details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocInvoiceDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

/// Updatable campaign fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries_or_regions: Vec<String>,
}

/// `PUT /campaigns/{id}` payload wrapper
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    pub campaign: CampaignUpdate,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clear_geo_targeting_on_country_or_region_change: bool,
}

/// Body of the reporting endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub start_time: String,
    pub end_time: String,
    /// HOURLY, DAILY, WEEKLY or MONTHLY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub return_grand_totals: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub return_records_with_no_metrics: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub return_row_totals: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Reporting response wrapper (`data.reportingDataResponse`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub reporting_data_response: ReportingDataResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportingDataResponse {
    #[serde(default)]
    pub row: Vec<ReportRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grand_totals: Option<ReportRow>,
}

/// Loosely typed metadata value of a report row
///
/// The metadata keys depend on the requested `groupBy` fields, so rows keep
/// them as an ordered map of these values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arrays and objects such as `countriesOrRegions` or `app`
    Other(serde_json::Value),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(v) => write!(f, "{}", v),
            MetadataValue::Integer(v) => write!(f, "{}", v),
            MetadataValue::Float(v) => write!(f, "{}", v),
            MetadataValue::Text(v) => write!(f, "{}", v),
            MetadataValue::Other(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub other: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<SpendRow>,
    /// Null values are dropped
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_metadata"
    )]
    pub metadata: BTreeMap<String, MetadataValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub granularity: Vec<GranularityRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<InsightData>,
}

fn deserialize_metadata<'de, D>(deserializer: D) -> Result<BTreeMap<String, MetadataValue>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<MetadataValue>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect())
}

/// Metrics of a report row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SpendRow {
    pub impressions: i64,
    pub taps: i64,
    pub total_installs: i64,
    pub tap_installs: i64,
    pub view_installs: i64,
    pub total_new_downloads: i64,
    pub tap_new_downloads: i64,
    pub view_new_downloads: i64,
    pub total_redownloads: i64,
    pub tap_redownloads: i64,
    pub view_redownloads: i64,
    pub ttr: f64,
    pub total_install_rate: f64,
    pub tap_install_rate: f64,
    #[serde(rename = "avgCPT")]
    pub avg_cpt: Money,
    #[serde(rename = "avgCPM")]
    pub avg_cpm: Money,
    #[serde(rename = "tapInstallCPI")]
    pub tap_install_cpi: Money,
    #[serde(rename = "totalAvgCPI")]
    pub total_avg_cpi: Money,
    pub local_spend: Money,
}

/// Time-bucketed metrics row
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GranularityRow {
    pub date: String,
    #[serde(flatten)]
    pub metrics: SpendRow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_recommendation: Option<BidRecommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidRecommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_bid_amount: Option<Money>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_campaign_create_payload_omits_unset_fields() {
        let campaign = Campaign {
            name: "Brand".to_string(),
            adam_id: 123,
            daily_budget_amount: Some(Money {
                amount: "50".to_string(),
                currency: "USD".to_string(),
            }),
            countries_or_regions: vec!["US".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&campaign).unwrap();
        assert_eq!(
            json,
            json!({
                "name": "Brand",
                "adamId": 123,
                "dailyBudgetAmount": {"amount": "50", "currency": "USD"},
                "countriesOrRegions": ["US"]
            })
        );
    }

    #[test]
    fn test_report_row_metadata_types() {
        let row: ReportRow = serde_json::from_value(json!({
            "metadata": {
                "campaignId": 42,
                "campaignName": "Brand",
                "deleted": false,
                "bidRatio": 1.5,
                "orgId": null,
                "countriesOrRegions": ["US", "GB"],
                "app": {"appName": "X", "adamId": 9}
            },
            "total": {"impressions": 10, "taps": 2, "localSpend": {"amount": "1.20", "currency": "USD"}}
        }))
        .unwrap();

        assert_eq!(row.metadata["campaignId"], MetadataValue::Integer(42));
        assert_eq!(row.metadata["campaignName"], MetadataValue::Text("Brand".to_string()));
        assert_eq!(row.metadata["deleted"], MetadataValue::Bool(false));
        assert_eq!(row.metadata["bidRatio"], MetadataValue::Float(1.5));
        assert!(!row.metadata.contains_key("orgId"));
        assert_eq!(
            row.metadata["countriesOrRegions"],
            MetadataValue::Other(json!(["US", "GB"]))
        );
        assert_eq!(row.metadata["countriesOrRegions"].to_string(), r#"["US","GB"]"#);
        let app: serde_json::Value =
            serde_json::from_str(&row.metadata["app"].to_string()).unwrap();
        assert_eq!(app, json!({"appName": "X", "adamId": 9}));
        let keys: Vec<&String> = row.metadata.keys().collect();
        assert_eq!(
            keys,
            vec!["app", "bidRatio", "campaignId", "campaignName", "countriesOrRegions", "deleted"]
        );

        let total = row.total.unwrap();
        assert_eq!(total.impressions, 10);
        assert_eq!(total.local_spend.to_string(), "1.20 USD");
    }

    #[test]
    fn test_granularity_row_flattens_metrics() {
        let row: GranularityRow = serde_json::from_value(json!({
            "date": "2025-01-01",
            "impressions": 5,
            "avgCPT": {"amount": "0.50", "currency": "USD"}
        }))
        .unwrap();
        assert_eq!(row.date, "2025-01-01");
        assert_eq!(row.metrics.impressions, 5);
        assert_eq!(row.metrics.avg_cpt.amount, "0.50");
    }

    #[test]
    fn test_user_acl() {
        let acl: UserAcl = serde_json::from_value(json!({
            "orgId": 40669820,
            "orgName": "Example Org",
            "currency": "USD",
            "paymentModel": "LOC",
            "roleNames": ["API Campaign Manager"],
            "timeZone": "America/Los_Angeles"
        }))
        .unwrap();
        assert_eq!(acl.org_id, 40669820);
        assert_eq!(acl.role_names, vec!["API Campaign Manager"]);
    }
}
