use crate::search_ads::client::ApiClient;
use crate::search_ads::resources::UserAcl;
use crate::search_ads::services::AclService;
use crate::search_ads::types::AsaError;

/// Decide which organization requests are scoped to
///
/// Precedence is the explicit `--org-id` value, then the configured one,
/// then auto-detection through `GET /acls` on `client`, which must not carry
/// an organization context itself.
pub async fn resolve_org_id(
    explicit: Option<&str>,
    configured: Option<&str>,
    client: &ApiClient,
) -> Result<String, AsaError> {
    if let Some(org_id) = pick_org_id(explicit, configured)? {
        return Ok(org_id);
    }

    tracing::debug!("No organization configured, resolving from /acls");
    let acls = AclService::new(client)
        .get_acls()
        .await
        .map_err(|e| e.context("fetching organizations"))?;
    select_single_org(&acls)
}

/// Explicit or configured org id, validated as numeric
///
/// Returns `Ok(None)` when neither is set (blank values count as unset).
pub fn pick_org_id(
    explicit: Option<&str>,
    configured: Option<&str>,
) -> Result<Option<String>, AsaError> {
    let chosen = [explicit, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|id| !id.is_empty());

    match chosen {
        Some(id) if id.chars().all(|c| c.is_ascii_digit()) => Ok(Some(id.to_string())),
        Some(id) => Err(AsaError::Config(format!(
            "invalid organization id {:?}: expected a numeric id",
            id
        ))),
        None => Ok(None),
    }
}

/// Pick the only organization in `acls`
///
/// Zero or several entries are an [`AsaError::AmbiguousOrg`] telling the
/// user how to choose.
pub fn select_single_org(acls: &[UserAcl]) -> Result<String, AsaError> {
    match acls {
        [] => Err(AsaError::AmbiguousOrg(
            "no organizations found for this account".to_string(),
        )),
        [only] => {
            tracing::info!("Auto-selected organization {}", only.org_name);
            Ok(only.org_id.to_string())
        }
        many => {
            let lines = many
                .iter()
                .map(|acl| format!("  {} (ID: {})", acl.org_name, acl.org_id))
                .collect::<Vec<_>>()
                .join("\n");
            Err(AsaError::AmbiguousOrg(format!(
                "multiple organizations found. Use --org-id flag or set org_id in config:\n{}",
                lines
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn acl(id: i64, name: &str) -> UserAcl {
        UserAcl {
            org_id: id,
            org_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_wins_over_config() {
        assert_eq!(
            pick_org_id(Some("111"), Some("222")).unwrap(),
            Some("111".to_string())
        );
    }

    #[test]
    fn test_config_used_when_flag_blank() {
        assert_eq!(
            pick_org_id(Some("  "), Some("222")).unwrap(),
            Some("222".to_string())
        );
        assert_eq!(pick_org_id(None, None).unwrap(), None);
    }

    #[test]
    fn test_non_numeric_org_rejected() {
        let err = pick_org_id(Some("acme"), None).unwrap_err();
        assert!(matches!(err, AsaError::Config(_)));
    }

    #[test]
    fn test_single_org_selected() {
        assert_eq!(select_single_org(&[acl(42, "Only")]).unwrap(), "42");
    }

    #[test]
    #[traced_test]
    fn test_auto_selection_logs_org_name_only() {
        select_single_org(&[acl(987654, "Acme Ads")]).unwrap();
        assert!(logs_contain("Auto-selected organization Acme Ads"));
        assert!(!logs_contain("987654"));
    }

    #[test]
    fn test_no_orgs() {
        let err = select_single_org(&[]).unwrap_err();
        assert!(matches!(err, AsaError::AmbiguousOrg(_)));
        assert_eq!(err.to_string(), "no organizations found for this account");
    }

    #[test]
    fn test_multiple_orgs_lists_candidates() {
        let err = select_single_org(&[acl(1, "Alpha"), acl(2, "Beta")]).unwrap_err();
        assert!(matches!(err, AsaError::AmbiguousOrg(_)));
        let msg = err.to_string();
        assert!(msg.contains("--org-id"));
        assert!(msg.contains("  Alpha (ID: 1)"));
        assert!(msg.contains("  Beta (ID: 2)"));
    }
}
