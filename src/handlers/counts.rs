use crate::{
    barcode::Symbology,
    errors::ServiceError,
    handlers::{items::StockItemView, AppState},
    services::counts::SubmitCount,
    ApiResponse,
};
use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitCountRequest {
    /// Session the count belongs to; defaults to the current session
    pub session_id: Option<Uuid>,
    pub item_id: Uuid,
    /// Quantity the operator counted; must be non-negative
    #[validate(range(min = 0))]
    pub counted_qty: i32,
    pub actor_id: String,
    /// Raw scan payload when the quantity came from a scan; validated
    /// against its symbology checksum before the count is accepted
    pub captured_barcode: Option<String>,
    /// Symbology hint reported by the scanning hardware
    pub symbology: Option<Symbology>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyRequest {
    /// Session the item belongs to; defaults to the current session
    pub session_id: Option<Uuid>,
    pub item_id: Uuid,
    pub actor_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkVerifyRequest {
    /// Session the items belong to; defaults to the current session
    pub session_id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub item_ids: Vec<Uuid>,
    pub actor_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkVerifyResponse {
    /// Items actually transitioned to verified
    pub updated_count: u64,
    /// Items skipped because they failed the per-item precondition
    pub skipped_ids: Vec<Uuid>,
}

/// Create the counts router
pub fn counts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_count))
        .route("/verify", post(verify_count))
        .route("/verify/bulk", post(bulk_verify))
}

/// Submit a counted quantity for an item
#[utoipa::path(
    post,
    path = "/api/v1/counts",
    request_body = SubmitCountRequest,
    responses(
        (status = 200, description = "Count reconciled", body = StockItemView),
        (status = 400, description = "Invalid quantity or failed barcode checksum", body = crate::errors::ErrorResponse),
        (status = 401, description = "No resolvable session or actor", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn submit_count(
    State(state): State<AppState>,
    Json(payload): Json<SubmitCountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let session = state
        .services
        .sessions
        .require_session(payload.session_id)
        .await?;

    let updated = state
        .services
        .counts
        .submit_count(SubmitCount {
            session_id: session.id,
            item_id: payload.item_id,
            counted_qty: payload.counted_qty,
            actor_id: payload.actor_id,
            captured_barcode: payload.captured_barcode,
            symbology: payload.symbology,
        })
        .await?;

    Ok(Json(ApiResponse::success(StockItemView::from(updated))))
}

/// Accept a flagged variance on one item
#[utoipa::path(
    post,
    path = "/api/v1/counts/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Variance verified", body = StockItemView),
        (status = 400, description = "Item is not in variance status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn verify_count(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let session = state
        .services
        .sessions
        .require_session(payload.session_id)
        .await?;

    let updated = state
        .services
        .counts
        .verify_item(session.id, payload.item_id, &payload.actor_id)
        .await?;

    Ok(Json(ApiResponse::success(StockItemView::from(updated))))
}

/// Accept flagged variances on a set of items
#[utoipa::path(
    post,
    path = "/api/v1/counts/verify/bulk",
    request_body = BulkVerifyRequest,
    responses(
        (status = 200, description = "Batch applied; inspect updated_count for partial application", body = BulkVerifyResponse),
        (status = 401, description = "No resolvable session or actor", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn bulk_verify(
    State(state): State<AppState>,
    Json(payload): Json<BulkVerifyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let session = state
        .services
        .sessions
        .require_session(payload.session_id)
        .await?;

    let outcome = state
        .services
        .counts
        .verify_items(session.id, payload.item_ids, &payload.actor_id)
        .await?;

    Ok(Json(ApiResponse::success(BulkVerifyResponse {
        updated_count: outcome.updated_count,
        skipped_ids: outcome.skipped_ids,
    })))
}
