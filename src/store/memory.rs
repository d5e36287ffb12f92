//! In-memory portal link and endpoint storage.
//!
//! Mirrors the SQLite semantics (project scoping, soft delete, zero-row
//! errors, insertion-ordered paging) without a database, so the delegation
//! service can be exercised in isolation.

use std::sync::Mutex;

use chrono::Utc;

use super::{EndpointStore, PortalLinkRepository};
use crate::error::{Error, Result};
use crate::types::*;

#[derive(Default)]
struct State {
    endpoints: Vec<Endpoint>,
    links: Vec<PortalLink>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored links, revoked ones included.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.state().links.len()
    }
}

impl State {
    /// The explicit scope, or the owner's endpoints when there is none.
    fn scope_contains(&self, link: &PortalLink, ep: &Endpoint) -> bool {
        if ep.project_id != link.project_id {
            return false;
        }
        if link.endpoints.is_empty() {
            link.owner_id.is_some() && ep.owner_id == link.owner_id
        } else {
            link.endpoints.contains(&ep.id)
        }
    }

    fn with_scope(&self, link: &PortalLink) -> PortalLink {
        let mut link = link.clone();
        link.endpoints_metadata = if link.endpoints.is_empty() {
            self.endpoints
                .iter()
                .filter(|ep| self.scope_contains(&link, ep))
                .map(EndpointMetadata::from)
                .collect()
        } else {
            link.endpoints
                .iter()
                .filter_map(|id| {
                    self.endpoints
                        .iter()
                        .find(|ep| &ep.id == id && ep.project_id == link.project_id)
                })
                .map(EndpointMetadata::from)
                .collect()
        };
        link
    }

    fn in_scope(&self, link: &PortalLink, endpoint_id: &str) -> bool {
        self.endpoints
            .iter()
            .any(|ep| ep.id == endpoint_id && self.scope_contains(link, ep))
            || link.endpoints.iter().any(|id| id == endpoint_id)
    }
}

impl EndpointStore for MemoryStore {
    fn create_endpoint(&self, endpoint: &Endpoint) -> Result<()> {
        self.state().endpoints.push(endpoint.clone());
        Ok(())
    }

    fn find_endpoints_by_ids(&self, project_id: &str, ids: &[String]) -> Result<Vec<Endpoint>> {
        Ok(self
            .state()
            .endpoints
            .iter()
            .filter(|ep| ep.project_id == project_id && ids.contains(&ep.id))
            .cloned()
            .collect())
    }
}

impl PortalLinkRepository for MemoryStore {
    fn create_portal_link(&self, link: &PortalLink) -> Result<()> {
        let mut state = self.state();
        if state.links.iter().any(|l| l.id == link.id) {
            return Err(Error::NotCreated);
        }
        if state.links.iter().any(|l| l.token == link.token) {
            return Err(Error::TokenCollision);
        }

        let now = Utc::now();
        let mut stored = link.clone();
        stored.endpoints_metadata = Vec::new();
        stored.created_at = now;
        stored.updated_at = now;
        stored.deleted_at = None;

        state.links.push(stored);
        Ok(())
    }

    fn find_portal_link_by_id(&self, project_id: &str, id: &str) -> Result<PortalLink> {
        let state = self.state();
        state
            .links
            .iter()
            .find(|l| l.id == id && l.project_id == project_id && !l.is_revoked())
            .map(|l| state.with_scope(l))
            .ok_or(Error::NotFound)
    }

    fn find_portal_link_by_token(&self, token: &str) -> Result<PortalLink> {
        let state = self.state();
        state
            .links
            .iter()
            .find(|l| l.token == token && !l.is_revoked())
            .map(|l| state.with_scope(l))
            .ok_or(Error::NotFound)
    }

    fn load_portal_links_paged(
        &self,
        project_id: &str,
        filter: &PortalLinkFilter,
        pageable: &Pageable,
    ) -> Result<(Vec<PortalLink>, PaginationData)> {
        let state = self.state();
        let matching: Vec<&PortalLink> = state
            .links
            .iter()
            .filter(|l| l.project_id == project_id && !l.is_revoked())
            .filter(|l| match &filter.endpoint_id {
                Some(endpoint_id) => state.in_scope(l, endpoint_id),
                None => true,
            })
            .collect();

        let page = matching
            .iter()
            .skip(usize::try_from(pageable.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(pageable.limit()).unwrap_or(usize::MAX))
            .map(|l| state.with_scope(l))
            .collect();

        Ok((page, PaginationData::new(pageable, matching.len() as u64)))
    }

    fn update_portal_link(&self, link: &PortalLink) -> Result<()> {
        let mut state = self.state();
        let stored = state
            .links
            .iter_mut()
            .find(|l| l.id == link.id && l.project_id == link.project_id && !l.is_revoked())
            .ok_or(Error::NotUpdated)?;

        stored.name = link.name.clone();
        stored.owner_id = link.owner_id.clone();
        stored.endpoints = link.endpoints.clone();
        stored.can_manage_endpoint = link.can_manage_endpoint;
        stored.updated_at = Utc::now();
        Ok(())
    }

    fn revoke_portal_link(&self, project_id: &str, id: &str) -> Result<()> {
        let mut state = self.state();
        let stored = state
            .links
            .iter_mut()
            .find(|l| l.id == id && l.project_id == project_id && !l.is_revoked())
            .ok_or(Error::NotDeleted)?;

        let now = Utc::now();
        stored.deleted_at = Some(now);
        stored.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(id: &str, token: &str) -> PortalLink {
        PortalLink {
            id: id.to_string(),
            project_id: "proj-1".to_string(),
            name: id.to_string(),
            token: token.to_string(),
            owner_id: None,
            endpoints: vec!["ep1".to_string()],
            endpoints_metadata: Vec::new(),
            can_manage_endpoint: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_duplicate_id_and_token_are_distinct_errors() {
        let store = MemoryStore::new();
        store.create_portal_link(&link("pl-1", "token-1")).unwrap();

        assert!(matches!(
            store.create_portal_link(&link("pl-1", "token-2")),
            Err(Error::NotCreated)
        ));
        assert!(matches!(
            store.create_portal_link(&link("pl-2", "token-1")),
            Err(Error::TokenCollision)
        ));
        assert_eq!(store.link_count(), 1);
    }
}
