use crate::{entities::operators, errors::ServiceError, handlers::AppState, ApiResponse};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertOperatorRequest {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OperatorView {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<operators::Model> for OperatorView {
    fn from(model: operators::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
        }
    }
}

/// Create the operators router
pub fn operators_routes() -> Router<AppState> {
    Router::new().route("/:id", put(upsert_operator))
}

/// Create or update an operator profile
#[utoipa::path(
    put,
    path = "/api/v1/operators/{id}",
    params(("id" = String, Path, description = "External actor id")),
    request_body = UpsertOperatorRequest,
    responses(
        (status = 200, description = "Profile stored", body = OperatorView),
        (status = 400, description = "Invalid profile", body = crate::errors::ErrorResponse)
    ),
    tag = "operators"
)]
pub async fn upsert_operator(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpsertOperatorRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let profile = state
        .services
        .operators
        .upsert_profile(&id, payload.first_name, payload.last_name)
        .await?;

    Ok(Json(ApiResponse::success(OperatorView::from(profile))))
}
