use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Permission;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display snapshot of an endpoint inside a portal link's scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMetadata {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl From<&Endpoint> for EndpointMetadata {
    fn from(ep: &Endpoint) -> Self {
        Self {
            id: ep.id.clone(),
            name: ep.name.clone(),
            url: ep.url.clone(),
            owner_id: ep.owner_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard API credential belonging to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectGrant {
    pub user_id: String,
    pub project_id: String,
    pub allow_bits: Permission,
    pub deny_bits: Permission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A scoped, revocable bearer-token delegation to a project's endpoints.
///
/// An empty `endpoints` list never grants project-wide access: such a link
/// must name an `owner_id`, and its scope is the endpoints owned by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalLink {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub token: String,
    pub owner_id: Option<String>,
    pub endpoints: Vec<String>,
    pub endpoints_metadata: Vec<EndpointMetadata>,
    pub can_manage_endpoint: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PortalLink {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalLinkFilter {
    pub endpoint_id: Option<String>,
}
