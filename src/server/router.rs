use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::portal_links::portal_link_router;
use crate::auth::{Authorizer, GrantAuthorizer, TokenGenerator};
use crate::service::PortalLinkService;
use crate::store::{AccessStore, ProjectStore, Store};

/// Shared state built once at start-up and handed to every handler.
pub struct AppState {
    pub projects: Arc<dyn ProjectStore>,
    pub access: Arc<dyn AccessStore>,
    pub portal_links: PortalLinkService,
    pub authorizer: Arc<dyn Authorizer>,
    pub token_generator: TokenGenerator,
    /// Public base URL used in portal link URLs. If not set, URLs are derived
    /// from request headers.
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new<S: Store + 'static>(store: Arc<S>, public_base_url: Option<String>) -> Self {
        let access: Arc<dyn AccessStore> = store.clone();
        let authorizer: Arc<dyn Authorizer> = Arc::new(GrantAuthorizer::new(access.clone()));
        let portal_links =
            PortalLinkService::new(store.clone(), store.clone(), authorizer.clone());

        Self {
            projects: store,
            access,
            portal_links,
            authorizer,
            token_generator: TokenGenerator::new(),
            public_base_url,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", portal_link_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
