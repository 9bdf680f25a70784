use crate::{
    entities::count_sessions::{self, SessionStatus},
    errors::ServiceError,
    handlers::AppState,
    services::{items::CatalogItem, sessions::SessionProgress},
    ApiResponse,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub name: String,
    pub status: SessionStatus,
    pub started_by: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl From<count_sessions::Model> for SessionView {
    fn from(model: count_sessions::Model) -> Self {
        let status = model.session_status();
        Self {
            id: model.id,
            name: model.name,
            status,
            started_by: model.started_by,
            started_at: model.started_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CatalogItemRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub barcode: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub zone: String,
    pub category: Option<String>,
    pub warehouse: Option<String>,
    pub uom: Option<String>,
    pub supplier: Option<String>,
    /// Authoritative baseline quantity from the catalog source
    #[validate(range(min = 0))]
    pub expected_qty: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub started_by: Option<String>,
    /// Catalog snapshot the session counts against
    #[validate(length(min = 1))]
    pub items: Vec<CatalogItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session: SessionView,
    pub item_count: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct JoinSessionRequest {
    #[validate(length(min = 1))]
    pub actor_id: String,
}

/// Create the sessions router
pub fn sessions_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/current", get(current_session))
        .route("/:id", get(get_session))
        .route("/:id/progress", get(session_progress))
        .route("/:id/join", post(join_session))
        .route("/:id/close", post(close_session))
}

/// Start a count session from a catalog snapshot
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session started", body = CreateSessionResponse),
        (status = 400, description = "Invalid catalog", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    for line in &payload.items {
        line.validate()?;
    }

    let catalog: Vec<CatalogItem> = payload
        .items
        .into_iter()
        .map(|line| CatalogItem {
            sku: line.sku,
            name: line.name,
            barcode: line.barcode,
            zone: line.zone,
            category: line.category,
            warehouse: line.warehouse,
            uom: line.uom,
            supplier: line.supplier,
            expected_qty: line.expected_qty,
        })
        .collect();

    let (session, item_count) = state
        .services
        .sessions
        .start_session(payload.name, payload.started_by, catalog)
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(ApiResponse::success(CreateSessionResponse {
            session: session.into(),
            item_count,
        })),
    ))
}

/// Fetch the most recently started active session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/current",
    responses(
        (status = 200, description = "Current session returned", body = SessionView),
        (status = 404, description = "No active session", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn current_session(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .current()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no active count session".to_string()))?;

    Ok(Json(ApiResponse::success(SessionView::from(session))))
}

/// Fetch one session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session returned", body = SessionView),
        (status = 404, description = "Session not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state.services.sessions.get(id).await?;
    Ok(Json(ApiResponse::success(SessionView::from(session))))
}

/// Aggregate reconciliation progress with per-zone breakdown
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}/progress",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Progress returned", body = SessionProgress),
        (status = 404, description = "Session not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn session_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let progress = state.services.sessions.progress(id).await?;
    Ok(Json(ApiResponse::success(progress)))
}

/// Record an operator joining the count
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/join",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Join recorded"),
        (status = 404, description = "Session not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn join_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinSessionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let actor_name = state
        .services
        .operators
        .resolve_display_name(&payload.actor_id)
        .await?;
    state
        .services
        .sessions
        .join(id, &payload.actor_id, actor_name)
        .await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "joined": true
    }))))
}

/// Close a session
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/close",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session closed", body = SessionView),
        (status = 400, description = "Session already closed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Session not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sessions"
)]
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state.services.sessions.close(id).await?;
    Ok(Json(ApiResponse::success(SessionView::from(session))))
}
