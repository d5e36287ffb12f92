pub mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

pub trait ProjectStore: Send + Sync {
    fn create_project(&self, project: &Project) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
}

pub trait EndpointStore: Send + Sync {
    fn create_endpoint(&self, endpoint: &Endpoint) -> Result<()>;
    /// Returns the endpoints among `ids` that exist in the project.
    fn find_endpoints_by_ids(&self, project_id: &str, ids: &[String]) -> Result<Vec<Endpoint>>;
}

pub trait AccessStore: Send + Sync {
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;

    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    fn upsert_project_grant(&self, grant: &ProjectGrant) -> Result<()>;
    fn get_project_grant(&self, user_id: &str, project_id: &str) -> Result<Option<ProjectGrant>>;
}

/// Persistence contract for portal links.
///
/// Every lookup except `find_portal_link_by_token` is scoped by project, and
/// revoked links are invisible to all finds and listings. Writes report
/// zero affected rows as `NotCreated`/`NotUpdated`/`NotDeleted`, distinct from
/// storage failures. Timestamps are maintained here, not by callers.
pub trait PortalLinkRepository: Send + Sync {
    fn create_portal_link(&self, link: &PortalLink) -> Result<()>;
    fn find_portal_link_by_id(&self, project_id: &str, id: &str) -> Result<PortalLink>;
    fn find_portal_link_by_token(&self, token: &str) -> Result<PortalLink>;
    fn load_portal_links_paged(
        &self,
        project_id: &str,
        filter: &PortalLinkFilter,
        pageable: &Pageable,
    ) -> Result<(Vec<PortalLink>, PaginationData)>;
    fn update_portal_link(&self, link: &PortalLink) -> Result<()>;
    fn revoke_portal_link(&self, project_id: &str, id: &str) -> Result<()>;
}

/// Store is the full database interface used by the server and the admin CLI.
pub trait Store: ProjectStore + EndpointStore + AccessStore + PortalLinkRepository {
    fn initialize(&self) -> Result<()>;
}
