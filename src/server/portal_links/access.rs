use axum::http::{HeaderMap, header};

use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::types::{Permission, Project, User};

/// Looks up a project by id. Mutations are gated by the service, so this
/// only establishes existence.
pub fn find_project(state: &AppState, project_id: &str) -> Result<Project, ApiError> {
    state
        .projects
        .get_project(project_id)
        .api_err("Failed to get project")?
        .or_not_found("Project not found")
}

/// Resolves the project for a read path: it must exist and the actor must
/// hold `project:read` on it.
pub fn resolve_readable_project(
    state: &AppState,
    actor: &User,
    project_id: &str,
) -> Result<Project, ApiError> {
    let project = find_project(state, project_id)?;
    state
        .authorizer
        .authorize(actor, Permission::PROJECT_READ, &project)?;
    Ok(project)
}

/// Base URL for shareable portal links. The configured public URL wins over
/// request headers.
pub fn portal_base_url(state: &AppState, headers: &HeaderMap) -> String {
    match &state.public_base_url {
        Some(url) => url.clone(),
        None => get_host_from_headers(headers),
    }
}

fn get_host_from_headers(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_host_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(get_host_from_headers(&headers), "http://localhost");

        headers.insert(header::HOST, HeaderValue::from_static("dash.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(get_host_from_headers(&headers), "https://dash.example.com");
    }
}
