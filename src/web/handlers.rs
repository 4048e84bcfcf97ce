//! HTTP request handlers.

use super::AppState;
use crate::db::{DbError, ListQuery, NewServer, Server, StatusFilter};
use crate::uptime::UptimeError;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Templates (using simple string replacement instead of a template engine)
// ============================================================================

const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");
const LAYOUT_TEMPLATE: &str = include_str!("templates/layout.html");

// ============================================================================
// Dashboard
// ============================================================================

pub async fn handle_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let query = ListQuery {
        per_page: 100,
        ..ListQuery::default()
    };
    let (servers, total) = state.service.list(&query).unwrap_or_default();
    let (online, offline) = state.service.status_counts().unwrap_or_default();
    let servers_json = serde_json::to_string(&servers).unwrap_or_else(|_| "[]".to_string());

    let content = DASHBOARD_TEMPLATE
        .replace("{{servers_json}}", &servers_json)
        .replace("{{total}}", &total.to_string())
        .replace("{{online}}", &online.to_string())
        .replace("{{offline}}", &offline.to_string());

    let page = LAYOUT_TEMPLATE
        .replace("{{title}}", "Fleetwatch Dashboard")
        .replace("{{content}}", &content);

    Html(page)
}

// ============================================================================
// API: Servers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub per_page: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

/// Columns callers may sort by.
const SORT_FIELDS: &[&str] = &["id", "name", "address", "status", "created_at", "updated_at"];

fn build_query(params: &ListParams) -> Result<ListQuery, String> {
    let per_page = params.per_page.unwrap_or(10).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);

    let status = match params.status.as_deref() {
        None => StatusFilter::Any,
        Some(s) => StatusFilter::parse(s).ok_or_else(|| format!("Invalid status filter: {}", s))?,
    };

    let sort_field = params.sort_field.clone().unwrap_or_else(|| "id".to_string());
    if !SORT_FIELDS.contains(&sort_field.as_str()) {
        return Err(format!("Invalid sort field: {}", sort_field));
    }

    let sort_order = params.sort_order.clone().unwrap_or_else(|| "asc".to_string());
    if !matches!(sort_order.as_str(), "asc" | "desc") {
        return Err(format!("Invalid sort order: {}", sort_order));
    }

    Ok(ListQuery {
        per_page,
        offset,
        status,
        sort_field,
        sort_order,
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub servers: Vec<Server>,
    pub total: i64,
}

pub async fn handle_list_servers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let query = match build_query(&params) {
        Ok(q) => q,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    match state.service.list(&query) {
        Ok((servers, total)) => Json(ListResponse { servers, total }).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn handle_get_server(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.service.get(id) {
        Ok(server) => Json(server).into_response(),
        Err(e) => db_error_response(e),
    }
}

pub async fn handle_create_server(
    State(state): State<AppState>,
    Json(req): Json<NewServer>,
) -> impl IntoResponse {
    if let Err(msg) = validate_new_server(&req) {
        return (StatusCode::BAD_REQUEST, msg).into_response();
    }

    match state.service.create(req) {
        Ok(server) => (StatusCode::CREATED, Json(server)).into_response(),
        Err(e) => db_error_response(e),
    }
}

pub async fn handle_create_servers_bulk(
    State(state): State<AppState>,
    Json(batch): Json<Vec<NewServer>>,
) -> impl IntoResponse {
    for req in &batch {
        if let Err(msg) = validate_new_server(req) {
            return (StatusCode::BAD_REQUEST, msg).into_response();
        }
    }

    Json(state.service.create_many(batch)).into_response()
}

pub async fn handle_update_server(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NewServer>,
) -> impl IntoResponse {
    if let Err(msg) = validate_new_server(&req) {
        return (StatusCode::BAD_REQUEST, msg).into_response();
    }

    match state.service.update(id, req) {
        Ok(server) => Json(server).into_response(),
        Err(e) => db_error_response(e),
    }
}

pub async fn handle_delete_server(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.service.delete(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => db_error_response(e),
    }
}

fn validate_new_server(req: &NewServer) -> Result<(), String> {
    if req.name.trim().is_empty() {
        return Err("Server name must not be empty".to_string());
    }
    if req.address.trim().is_empty() {
        return Err("Server address must not be empty".to_string());
    }
    Ok(())
}

// ============================================================================
// API: Uptime and status
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UptimeParams {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct UptimeResponse {
    pub server_id: i64,
    pub date: String,
    pub online_seconds: i64,
}

pub async fn handle_server_uptime(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UptimeParams>,
) -> impl IntoResponse {
    // An unknown server is a 404, not a zero-uptime day
    if let Err(e) = state.service.get(id) {
        return db_error_response(e);
    }

    match state.service.uptime_on(id, &params.date) {
        Ok(duration) => Json(UptimeResponse {
            server_id: id,
            date: params.date,
            online_seconds: duration.num_seconds(),
        })
        .into_response(),
        Err(e @ UptimeError::InvalidDate(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e @ UptimeError::LogUnavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub online: i64,
    pub offline: i64,
}

pub async fn handle_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.status_counts() {
        Ok((online, offline)) => Json(StatusResponse { online, offline }).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn db_error_response(e: DbError) -> axum::response::Response {
    match e {
        DbError::NotFound => (StatusCode::NOT_FOUND, "Server not found").into_response(),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response(),
    }
}

// ============================================================================
// Static Assets
// ============================================================================

pub async fn handle_favicon() -> impl IntoResponse {
    // Return a simple SVG favicon
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
        <circle cx="50" cy="50" r="45" fill="#3f7d4e"/>
        <path d="M25 60 L45 60 L50 35 L58 70 L64 52 L85 52" stroke="white" stroke-width="5" fill="none"/>
    </svg>"##;

    (
        [(axum::http::header::CONTENT_TYPE, "image/svg+xml")],
        svg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListParams {
        ListParams {
            per_page: None,
            offset: None,
            status: None,
            sort_field: None,
            sort_order: None,
        }
    }

    #[test]
    fn test_build_query_defaults() {
        let query = build_query(&params()).unwrap();
        assert_eq!(query, ListQuery::default());
    }

    #[test]
    fn test_build_query_clamps_pagination() {
        let query = build_query(&ListParams {
            per_page: Some(10_000),
            offset: Some(-5),
            ..params()
        })
        .unwrap();
        assert_eq!(query.per_page, 100);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_build_query_rejects_bad_input() {
        assert!(build_query(&ListParams {
            status: Some("sideways".to_string()),
            ..params()
        })
        .is_err());
        assert!(build_query(&ListParams {
            sort_field: Some("password".to_string()),
            ..params()
        })
        .is_err());
        assert!(build_query(&ListParams {
            sort_order: Some("upward".to_string()),
            ..params()
        })
        .is_err());
    }
}
