mod access;
mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
};

use crate::server::AppState;

pub fn portal_link_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/{project_id}/portal-links",
            get(handlers::list_portal_links).post(handlers::create_portal_link),
        )
        .route(
            "/projects/{project_id}/portal-links/{id}",
            get(handlers::get_portal_link).put(handlers::update_portal_link),
        )
        .route(
            "/projects/{project_id}/portal-links/{id}/revoke",
            put(handlers::revoke_portal_link),
        )
}
