use crate::{
    barcode::{self, Symbology, ValidatedScan},
    errors::ServiceError,
    handlers::AppState,
    ApiResponse,
};
use axum::{response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScanRequest {
    /// Raw payload as read by the scanner
    #[validate(length(min = 1))]
    pub payload: String,
    /// Symbology hint reported by the scanning hardware
    pub symbology: Option<Symbology>,
}

/// Create the scans router
pub fn scans_routes() -> Router<AppState> {
    Router::new().route("/", post(validate_scan))
}

/// Validate a scan payload against its symbology checksum
///
/// Checksum failures name the expected check digit so the client can
/// prompt for a rescan instead of discarding the attempt.
#[utoipa::path(
    post,
    path = "/api/v1/scans",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Payload accepted", body = ValidatedScan),
        (status = 400, description = "Corrupt or malformed payload", body = crate::errors::ErrorResponse)
    ),
    tag = "scans"
)]
pub async fn validate_scan(
    Json(payload): Json<ScanRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let scan = barcode::validate(&payload.payload, payload.symbology)
        .map_err(|e| ServiceError::InvalidInput(format!("rejected scan: {}", e)))?;

    Ok(Json(ApiResponse::success(scan)))
}
