use crate::{
    entities::activity_events::{self, ActivityType},
    errors::ServiceError,
    handlers::{AppState, PaginationParams},
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityEventView {
    pub id: Uuid,
    pub session_id: Uuid,
    pub event_type: Option<ActivityType>,
    pub message: String,
    pub actor_name: Option<String>,
    pub zone: Option<String>,
    pub item_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<activity_events::Model> for ActivityEventView {
    fn from(model: activity_events::Model) -> Self {
        let event_type = model.activity_type();
        Self {
            id: model.id,
            session_id: model.session_id,
            event_type,
            message: model.message,
            actor_name: model.actor_name,
            zone: model.zone,
            item_id: model.item_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ActivityFilters {
    /// Session feed to read; defaults to the current session
    pub session_id: Option<Uuid>,
}

/// Create the activity router
pub fn activity_routes() -> Router<AppState> {
    Router::new().route("/", get(list_activity))
}

/// Read the session activity feed, newest first
#[utoipa::path(
    get,
    path = "/api/v1/activity",
    params(ActivityFilters, PaginationParams),
    responses(
        (status = 200, description = "Feed returned"),
        (status = 401, description = "No active session", body = crate::errors::ErrorResponse)
    ),
    tag = "activity"
)]
pub async fn list_activity(
    State(state): State<AppState>,
    Query(filters): Query<ActivityFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .require_session(filters.session_id)
        .await?;

    let (events, total) = state
        .services
        .activity
        .list(session.id, pagination.page(), pagination.per_page())
        .await?;

    let views: Vec<ActivityEventView> = events.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse {
        total,
        page: pagination.page(),
        limit: pagination.per_page(),
        total_pages: total.div_ceil(pagination.per_page()),
        items: views,
    })))
}
