use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EndpointMetadata, Pageable, PaginationData, PortalLink, PortalLinkFilter};

pub use crate::service::PortalLinkRequest;

const PORTAL_PATH: &str = "/portal";

#[derive(Debug, Serialize)]
pub struct PortalLinkResponse {
    pub uid: String,
    pub project_id: String,
    pub name: String,
    pub url: String,
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub endpoints: Vec<String>,
    pub endpoint_count: usize,
    pub can_manage_endpoint: bool,
    pub endpoints_metadata: Vec<EndpointMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub content: Vec<T>,
    pub pagination: PaginationData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPortalLinksParams {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub per_page: Option<u64>,
    #[serde(default)]
    pub endpoint_id: Option<String>,
}

impl ListPortalLinksParams {
    #[must_use]
    pub fn pageable(&self) -> Pageable {
        let defaults = Pageable::default();
        Pageable::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }

    #[must_use]
    pub fn filter(&self) -> PortalLinkFilter {
        PortalLinkFilter {
            endpoint_id: self
                .endpoint_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }
}

/// Builds the externally visible shape of a portal link, including the
/// shareable portal URL.
#[must_use]
pub fn portal_link_response(link: &PortalLink, base_url: &str) -> PortalLinkResponse {
    PortalLinkResponse {
        uid: link.id.clone(),
        project_id: link.project_id.clone(),
        name: link.name.clone(),
        url: format!(
            "{}{PORTAL_PATH}?token={}",
            base_url.trim_end_matches('/'),
            link.token
        ),
        token: link.token.clone(),
        owner_id: link.owner_id.clone(),
        endpoints: link.endpoints.clone(),
        endpoint_count: link.endpoints_metadata.len(),
        can_manage_endpoint: link.can_manage_endpoint,
        endpoints_metadata: link.endpoints_metadata.clone(),
        created_at: link.created_at,
        updated_at: link.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> PortalLink {
        PortalLink {
            id: "pl-1".to_string(),
            project_id: "proj-1".to_string(),
            name: "Acme".to_string(),
            token: "abc-123_XYZ".to_string(),
            owner_id: Some("owner-1".to_string()),
            endpoints: vec!["ep1".to_string()],
            endpoints_metadata: vec![
                EndpointMetadata {
                    id: "ep1".to_string(),
                    name: "orders".to_string(),
                    url: "https://acme.example.com/orders".to_string(),
                    owner_id: Some("owner-1".to_string()),
                },
                EndpointMetadata {
                    id: "ep2".to_string(),
                    name: "refunds".to_string(),
                    url: "https://acme.example.com/refunds".to_string(),
                    owner_id: Some("owner-1".to_string()),
                },
            ],
            can_manage_endpoint: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_portal_link_response_derives_url_and_count() {
        let response = portal_link_response(&link(), "https://dash.example.com/");
        assert_eq!(response.url, "https://dash.example.com/portal?token=abc-123_XYZ");
        assert_eq!(response.endpoint_count, 2);
        assert_eq!(response.endpoints, vec!["ep1"]);
        assert_eq!(response.uid, "pl-1");
        assert!(response.can_manage_endpoint);
    }

    #[test]
    fn test_list_params_defaults() {
        let params = ListPortalLinksParams::default();
        assert_eq!(params.pageable(), Pageable::default());
        assert_eq!(params.filter(), PortalLinkFilter::default());

        let params = ListPortalLinksParams {
            page: Some(3),
            per_page: Some(0),
            endpoint_id: Some("  ".to_string()),
        };
        assert_eq!(params.pageable(), Pageable::new(3, 20));
        assert!(params.filter().endpoint_id.is_none());
    }
}
