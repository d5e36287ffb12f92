use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use wicket::auth::{TokenGenerator, generate_portal_token};
use wicket::server::{AppState, create_router};
use wicket::store::{
    AccessStore, EndpointStore, PortalLinkRepository, ProjectStore, SqliteStore, Store,
};
use wicket::types::{Endpoint, Permission, PortalLink, Project, ProjectGrant, Token, User};

/// Runs the router in-process on an ephemeral port, backed by a fresh
/// SQLite database that tests seed directly.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub store: Arc<SqliteStore>,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_base_url(None).await
    }

    pub async fn start_with_base_url(public_base_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("wicket.db")).expect("open store");
        store.initialize().expect("initialize schema");
        let store = Arc::new(store);

        let state = Arc::new(AppState::new(store.clone(), public_base_url));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://127.0.0.1:{port}"),
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    pub fn create_project(&self, name: &str) -> String {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_project(&project).expect("create project");
        project.id
    }

    pub fn create_endpoint(&self, project_id: &str, name: &str, owner_id: Option<&str>) -> String {
        let now = Utc::now();
        let endpoint = Endpoint {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            url: format!("https://hooks.example.com/{name}"),
            owner_id: owner_id.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.store.create_endpoint(&endpoint).expect("create endpoint");
        endpoint.id
    }

    /// Creates a user with an API token and returns `(user_id, raw_token)`.
    pub fn create_user(&self, name: &str) -> (String, String) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");

        let (raw_token, lookup, hash) = TokenGenerator::new().generate().expect("generate token");
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            user_id: user.id.clone(),
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };
        self.store.create_token(&token).expect("create token");

        (user.id, raw_token)
    }

    pub fn grant(&self, user_id: &str, project_id: &str, allow: Permission) {
        let now = Utc::now();
        self.store
            .upsert_project_grant(&ProjectGrant {
                user_id: user_id.to_string(),
                project_id: project_id.to_string(),
                allow_bits: allow,
                deny_bits: Permission::default(),
                created_at: now,
                updated_at: now,
            })
            .expect("grant");
    }

    /// Inserts a portal link without going through HTTP.
    pub fn seed_portal_link(&self, project_id: &str, name: &str, endpoints: &[String]) -> String {
        let now = Utc::now();
        let link = PortalLink {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            token: generate_portal_token(),
            owner_id: None,
            endpoints: endpoints.to_vec(),
            endpoints_metadata: Vec::new(),
            can_manage_endpoint: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.store.create_portal_link(&link).expect("seed portal link");
        link.id
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
