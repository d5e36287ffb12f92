use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{
    ListPortalLinksParams, PagedResponse, PortalLinkRequest, portal_link_response,
};
use crate::server::response::{ApiError, ApiResponse};

use super::access::{find_project, portal_base_url, resolve_readable_project};

pub async fn create_portal_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<PortalLinkRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = payload?;
    let project = find_project(&state, &project_id)?;
    let link = state.portal_links.issue(&auth.user, &project, &req)?;

    let response = portal_link_response(&link, &portal_base_url(&state, &headers));
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn get_portal_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((project_id, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let project = resolve_readable_project(&state, &auth.user, &project_id)?;
    let link = state.portal_links.get(&project, &id)?;

    let response = portal_link_response(&link, &portal_base_url(&state, &headers));
    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}

pub async fn update_portal_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((project_id, id)): Path<(String, String)>,
    headers: HeaderMap,
    payload: Result<Json<PortalLinkRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = payload?;
    let project = find_project(&state, &project_id)?;
    let link = state.portal_links.update(&auth.user, &project, &id, &req)?;

    let response = portal_link_response(&link, &portal_base_url(&state, &headers));
    Ok::<_, ApiError>((StatusCode::ACCEPTED, Json(ApiResponse::success(response))))
}

pub async fn revoke_portal_link(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((project_id, id)): Path<(String, String)>,
) -> impl IntoResponse {
    let project = find_project(&state, &project_id)?;
    state.portal_links.revoke(&auth.user, &project, &id)?;

    Ok::<_, ApiError>(Json(ApiResponse::empty()))
}

pub async fn list_portal_links(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    query: Result<Query<ListPortalLinksParams>, QueryRejection>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Query(params) = query?;
    let project = resolve_readable_project(&state, &auth.user, &project_id)?;
    let (links, pagination) =
        state
            .portal_links
            .list(&project, &params.filter(), &params.pageable())?;

    let base_url = portal_base_url(&state, &headers);
    let content = links
        .iter()
        .map(|link| portal_link_response(link, &base_url))
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(PagedResponse {
        content,
        pagination,
    })))
}
