use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::validation::{require_scope, validate_request};
use crate::auth::{Authorizer, generate_portal_token};
use crate::error::Result;
use crate::store::{EndpointStore, PortalLinkRepository};
use crate::types::{Pageable, PaginationData, Permission, PortalLink, PortalLinkFilter, Project, User};

/// Client-supplied fields of a portal link. Id, token and timestamps are
/// always server-assigned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortalLinkRequest {
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub can_manage_endpoint: bool,
}

/// Issues, updates, revokes and reads portal links.
///
/// Mutations pass the authorization gate before anything is read or written.
pub struct PortalLinkService {
    links: Arc<dyn PortalLinkRepository>,
    endpoints: Arc<dyn EndpointStore>,
    authorizer: Arc<dyn Authorizer>,
}

impl PortalLinkService {
    pub fn new(
        links: Arc<dyn PortalLinkRepository>,
        endpoints: Arc<dyn EndpointStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            links,
            endpoints,
            authorizer,
        }
    }

    pub fn issue(&self, actor: &User, project: &Project, req: &PortalLinkRequest) -> Result<PortalLink> {
        self.authorizer
            .authorize(actor, Permission::PROJECT_MANAGE, project)?;

        let req = validate_request(req)?;
        let endpoints = self.restrict_to_project(project, &req.endpoints)?;
        require_scope(&endpoints, req.owner_id.as_deref())?;

        let now = Utc::now();
        let link = PortalLink {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            name: req.name,
            token: generate_portal_token(),
            owner_id: req.owner_id,
            endpoints,
            endpoints_metadata: Vec::new(),
            can_manage_endpoint: req.can_manage_endpoint,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.links.create_portal_link(&link)?;

        info!(
            project_id = %project.id,
            portal_link_id = %link.id,
            user_id = %actor.id,
            can_manage_endpoint = link.can_manage_endpoint,
            "portal link issued"
        );

        self.links.find_portal_link_by_id(&project.id, &link.id)
    }

    pub fn update(
        &self,
        actor: &User,
        project: &Project,
        link_id: &str,
        req: &PortalLinkRequest,
    ) -> Result<PortalLink> {
        self.authorizer
            .authorize(actor, Permission::PROJECT_MANAGE, project)?;

        let mut link = self.links.find_portal_link_by_id(&project.id, link_id)?;

        let req = validate_request(req)?;
        let endpoints = self.restrict_to_project(project, &req.endpoints)?;
        require_scope(&endpoints, req.owner_id.as_deref())?;

        link.name = req.name;
        link.owner_id = req.owner_id;
        link.endpoints = endpoints;
        link.can_manage_endpoint = req.can_manage_endpoint;

        self.links.update_portal_link(&link)?;

        info!(
            project_id = %project.id,
            portal_link_id = %link.id,
            user_id = %actor.id,
            "portal link updated"
        );

        self.links.find_portal_link_by_id(&project.id, &link.id)
    }

    pub fn revoke(&self, actor: &User, project: &Project, link_id: &str) -> Result<()> {
        self.authorizer
            .authorize(actor, Permission::PROJECT_MANAGE, project)?;

        let link = self.links.find_portal_link_by_id(&project.id, link_id)?;
        self.links.revoke_portal_link(&project.id, &link.id)?;

        info!(
            project_id = %project.id,
            portal_link_id = %link.id,
            user_id = %actor.id,
            "portal link revoked"
        );
        Ok(())
    }

    pub fn get(&self, project: &Project, link_id: &str) -> Result<PortalLink> {
        self.links.find_portal_link_by_id(&project.id, link_id)
    }

    pub fn list(
        &self,
        project: &Project,
        filter: &PortalLinkFilter,
        pageable: &Pageable,
    ) -> Result<(Vec<PortalLink>, PaginationData)> {
        self.links.load_portal_links_paged(&project.id, filter, pageable)
    }

    /// Keeps the requested endpoints that exist in the project, in request order.
    fn restrict_to_project(&self, project: &Project, requested: &[String]) -> Result<Vec<String>> {
        let known: HashSet<String> = self
            .endpoints
            .find_endpoints_by_ids(&project.id, requested)?
            .into_iter()
            .map(|ep| ep.id)
            .collect();

        let endpoints: Vec<String> = requested
            .iter()
            .filter(|id| known.contains(*id))
            .cloned()
            .collect();

        if endpoints.len() < requested.len() {
            debug!(
                project_id = %project.id,
                dropped = requested.len() - endpoints.len(),
                "ignoring endpoints outside the project"
            );
        }

        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use crate::types::Endpoint;

    struct StaticAuthorizer(bool);

    impl Authorizer for StaticAuthorizer {
        fn authorize(&self, _actor: &User, _permission: Permission, _project: &Project) -> Result<()> {
            if self.0 { Ok(()) } else { Err(Error::Forbidden) }
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PortalLinkService,
        actor: User,
        project: Project,
    }

    fn fixture(allow: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for (id, project_id) in [("ep1", "proj-1"), ("ep2", "proj-1"), ("ep3", "proj-2")] {
            store
                .create_endpoint(&Endpoint {
                    id: id.to_string(),
                    project_id: project_id.to_string(),
                    name: id.to_string(),
                    url: format!("https://{id}.example.com"),
                    owner_id: None,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }

        let service = PortalLinkService::new(
            store.clone(),
            store.clone(),
            Arc::new(StaticAuthorizer(allow)),
        );

        Fixture {
            store,
            service,
            actor: User {
                id: "user-1".to_string(),
                name: "alice".to_string(),
                created_at: now,
                updated_at: now,
            },
            project: Project {
                id: "proj-1".to_string(),
                name: "payments".to_string(),
                created_at: now,
            },
        }
    }

    fn request(endpoints: &[&str], can_manage_endpoint: bool) -> PortalLinkRequest {
        PortalLinkRequest {
            name: "Acme portal".to_string(),
            owner_id: None,
            endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
            can_manage_endpoint,
        }
    }

    #[test]
    fn test_issue_then_get_round_trips() {
        let f = fixture(true);
        let issued = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep1", "ep2"], false))
            .unwrap();

        let fetched = f.service.get(&f.project, &issued.id).unwrap();
        assert_eq!(fetched.id, issued.id);
        assert_eq!(fetched.project_id, "proj-1");
        assert_eq!(fetched.token, issued.token);
        assert_eq!(fetched.endpoints, vec!["ep1", "ep2"]);
        assert!(!fetched.can_manage_endpoint);
        assert_eq!(fetched.endpoints_metadata.len(), 2);
    }

    #[test]
    fn test_issue_drops_endpoints_outside_project() {
        let f = fixture(true);
        let issued = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep3", "ep2", "nope"], true))
            .unwrap();
        assert_eq!(issued.endpoints, vec!["ep2"]);
        assert!(issued.can_manage_endpoint);
    }

    #[test]
    fn test_issue_rejects_scope_that_empties_after_restriction() {
        let f = fixture(true);
        let result = f.service.issue(&f.actor, &f.project, &request(&["ep3"], false));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(f.store.link_count(), 0);
    }

    #[test]
    fn test_owner_only_link_is_allowed() {
        let f = fixture(true);
        let mut req = request(&[], false);
        req.owner_id = Some("owner-1".to_string());

        let issued = f.service.issue(&f.actor, &f.project, &req).unwrap();
        assert!(issued.endpoints.is_empty());
        assert_eq!(issued.owner_id.as_deref(), Some("owner-1"));
    }

    #[test]
    fn test_forbidden_short_circuits_before_any_write() {
        let f = fixture(false);
        let result = f.service.issue(&f.actor, &f.project, &request(&["ep1"], false));
        assert!(matches!(result, Err(Error::Forbidden)));
        assert_eq!(f.store.link_count(), 0);

        // Denied before the lookup, so a missing link is not revealed.
        let result = f
            .service
            .update(&f.actor, &f.project, "missing", &request(&["ep1"], false));
        assert!(matches!(result, Err(Error::Forbidden)));
        assert!(matches!(
            f.service.revoke(&f.actor, &f.project, "missing"),
            Err(Error::Forbidden)
        ));
    }

    #[test]
    fn test_update_preserves_identity_and_token() {
        let f = fixture(true);
        let issued = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep1"], false))
            .unwrap();

        let mut req = request(&["ep2"], true);
        req.name = "Renamed".to_string();
        let updated = f
            .service
            .update(&f.actor, &f.project, &issued.id, &req)
            .unwrap();

        assert_eq!(updated.id, issued.id);
        assert_eq!(updated.token, issued.token);
        assert_eq!(updated.project_id, issued.project_id);
        assert_eq!(updated.created_at, issued.created_at);
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.endpoints, vec!["ep2"]);
        assert!(updated.can_manage_endpoint);
    }

    fn add_owned_endpoint(store: &MemoryStore, id: &str, owner_id: &str) {
        let now = Utc::now();
        store
            .create_endpoint(&Endpoint {
                id: id.to_string(),
                project_id: "proj-1".to_string(),
                name: id.to_string(),
                url: format!("https://{id}.example.com"),
                owner_id: Some(owner_id.to_string()),
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn metadata_ids(link: &PortalLink) -> Vec<String> {
        link.endpoints_metadata.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_update_narrows_scope_of_owned_link() {
        let f = fixture(true);
        let mut req = request(&["ep1", "ep2"], false);
        req.owner_id = Some("acme".to_string());
        let issued = f.service.issue(&f.actor, &f.project, &req).unwrap();
        assert_eq!(issued.endpoints_metadata.len(), 2);

        req.endpoints = vec!["ep2".to_string()];
        let updated = f
            .service
            .update(&f.actor, &f.project, &issued.id, &req)
            .unwrap();
        assert_eq!(updated.endpoints, vec!["ep2"]);
        assert_eq!(metadata_ids(&updated), vec!["ep2"]);

        let filter = PortalLinkFilter {
            endpoint_id: Some("ep1".to_string()),
        };
        let (links, _) = f
            .service
            .list(&f.project, &filter, &Pageable::default())
            .unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_links_with_different_owners_keep_their_own_scope() {
        let f = fixture(true);
        add_owned_endpoint(&f.store, "ep-acme-1", "acme");
        add_owned_endpoint(&f.store, "ep-acme-2", "acme");

        let mut acme_req = request(&[], false);
        acme_req.owner_id = Some("acme".to_string());
        let acme = f.service.issue(&f.actor, &f.project, &acme_req).unwrap();
        assert_eq!(metadata_ids(&acme), vec!["ep-acme-1", "ep-acme-2"]);

        let mut globex_req = request(&["ep-acme-1"], false);
        globex_req.owner_id = Some("globex".to_string());
        let globex = f.service.issue(&f.actor, &f.project, &globex_req).unwrap();
        assert_eq!(metadata_ids(&globex), vec!["ep-acme-1"]);

        let acme = f.service.get(&f.project, &acme.id).unwrap();
        assert_eq!(metadata_ids(&acme), vec!["ep-acme-1", "ep-acme-2"]);
    }

    #[test]
    fn test_update_missing_or_revoked_link_is_not_found() {
        let f = fixture(true);
        let result = f
            .service
            .update(&f.actor, &f.project, "missing", &request(&["ep1"], false));
        assert!(matches!(result, Err(Error::NotFound)));

        let issued = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep1"], false))
            .unwrap();
        f.service.revoke(&f.actor, &f.project, &issued.id).unwrap();

        let result = f
            .service
            .update(&f.actor, &f.project, &issued.id, &request(&["ep1"], false));
        assert!(matches!(result, Err(Error::NotFound)));
        assert_eq!(f.store.link_count(), 1);
    }

    #[test]
    fn test_revoke_hides_from_get_and_list() {
        let f = fixture(true);
        let keep = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep1"], false))
            .unwrap();
        let gone = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep2"], false))
            .unwrap();

        f.service.revoke(&f.actor, &f.project, &gone.id).unwrap();

        assert!(matches!(f.service.get(&f.project, &gone.id), Err(Error::NotFound)));
        let (links, pagination) = f
            .service
            .list(&f.project, &PortalLinkFilter::default(), &Pageable::default())
            .unwrap();
        let ids: Vec<_> = links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec![keep.id.as_str()]);
        assert_eq!(pagination.total, 1);

        assert!(matches!(
            f.service.revoke(&f.actor, &f.project, &gone.id),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_get_is_project_scoped() {
        let f = fixture(true);
        let issued = f
            .service
            .issue(&f.actor, &f.project, &request(&["ep1"], false))
            .unwrap();

        let other = Project {
            id: "proj-2".to_string(),
            name: "other".to_string(),
            created_at: Utc::now(),
        };
        assert!(matches!(f.service.get(&other, &issued.id), Err(Error::NotFound)));
    }

    #[test]
    fn test_list_pages_twenty_five_links() {
        let f = fixture(true);
        for _ in 0..25 {
            f.service
                .issue(&f.actor, &f.project, &request(&["ep1"], false))
                .unwrap();
        }

        let filter = PortalLinkFilter::default();
        let (first, first_page) = f.service.list(&f.project, &filter, &Pageable::new(1, 10)).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!((first_page.prev, first_page.next, first_page.total_page), (1, 2, 3));

        let (last, last_page) = f.service.list(&f.project, &filter, &Pageable::new(3, 10)).unwrap();
        assert_eq!(last.len(), 5);
        assert_eq!((last_page.prev, last_page.next, last_page.total_page), (2, 4, 3));
    }

    #[test]
    fn test_issued_tokens_are_distinct() {
        let f = fixture(true);
        let req = request(&["ep1"], false);
        let tokens: HashSet<String> = (0..10_000)
            .map(|_| f.service.issue(&f.actor, &f.project, &req).unwrap().token)
            .collect();
        assert_eq!(tokens.len(), 10_000);
    }
}
