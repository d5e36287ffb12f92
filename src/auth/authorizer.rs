use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::AccessStore;
use crate::types::{Permission, Project, User};

/// Decides whether an actor may perform an action on a project.
///
/// Implementations return `Error::Forbidden` when the actor lacks the
/// permission; any other error is a failure to decide.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, actor: &User, permission: Permission, project: &Project) -> Result<()>;
}

/// Authorizer backed by per-project grants. Deny bits win over allow bits.
pub struct GrantAuthorizer {
    store: Arc<dyn AccessStore>,
}

impl GrantAuthorizer {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self { store }
    }
}

impl Authorizer for GrantAuthorizer {
    fn authorize(&self, actor: &User, permission: Permission, project: &Project) -> Result<()> {
        let grant = self.store.get_project_grant(&actor.id, &project.id)?;

        let allowed = grant
            .map(|g| {
                g.allow_bits
                    .expand_implied()
                    .difference(g.deny_bits)
                    .has(permission)
            })
            .unwrap_or(false);

        if !allowed {
            tracing::debug!(
                user_id = %actor.id,
                project_id = %project.id,
                permission = %permission,
                "authorization denied"
            );
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::store::{ProjectStore, SqliteStore, Store};
    use crate::types::ProjectGrant;

    fn setup(allow: Permission, deny: Permission) -> (TempDir, GrantAuthorizer, User, Project) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp.path().join("test.db")).unwrap());
        store.initialize().unwrap();

        let now = Utc::now();
        let project = Project {
            id: "proj-1".to_string(),
            name: "payments".to_string(),
            created_at: now,
        };
        let user = User {
            id: "user-1".to_string(),
            name: "alice".to_string(),
            created_at: now,
            updated_at: now,
        };
        store.create_project(&project).unwrap();
        store.create_user(&user).unwrap();
        store
            .upsert_project_grant(&ProjectGrant {
                user_id: user.id.clone(),
                project_id: project.id.clone(),
                allow_bits: allow,
                deny_bits: deny,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        (temp, GrantAuthorizer::new(store), user, project)
    }

    #[test]
    fn test_manage_grant_allows_read_and_manage() {
        let (_temp, authz, user, project) = setup(Permission::PROJECT_MANAGE, Permission::default());
        assert!(authz.authorize(&user, Permission::PROJECT_MANAGE, &project).is_ok());
        assert!(authz.authorize(&user, Permission::PROJECT_READ, &project).is_ok());
    }

    #[test]
    fn test_read_grant_cannot_manage() {
        let (_temp, authz, user, project) = setup(Permission::PROJECT_READ, Permission::default());
        let result = authz.authorize(&user, Permission::PROJECT_MANAGE, &project);
        assert!(matches!(result, Err(Error::Forbidden)));
    }

    #[test]
    fn test_deny_overrides_allow() {
        let (_temp, authz, user, project) = setup(Permission::PROJECT_MANAGE, Permission::PROJECT_MANAGE);
        assert!(matches!(
            authz.authorize(&user, Permission::PROJECT_MANAGE, &project),
            Err(Error::Forbidden)
        ));
        assert!(authz.authorize(&user, Permission::PROJECT_READ, &project).is_ok());
    }

    #[test]
    fn test_no_grant_is_forbidden() {
        let (_temp, authz, user, mut project) = setup(Permission::PROJECT_MANAGE, Permission::default());
        project.id = "proj-other".to_string();
        assert!(matches!(
            authz.authorize(&user, Permission::PROJECT_READ, &project),
            Err(Error::Forbidden)
        ));
    }
}
