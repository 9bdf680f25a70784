use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stocktake API",
        version = "1.0.0",
        description = r#"
# Stocktake API

Backend for collaborative physical inventory counts. Operators scan or
search items, submit counted quantities, and the service reconciles
counted-vs-expected quantities, tracks per-zone completion, and keeps an
append-only activity feed.

## Counting flow

1. Start a session from a catalog snapshot (`POST /sessions`)
2. Resolve scans to items (`POST /scans`, `GET /items/lookup`)
3. Submit counts (`POST /counts`); variances are flagged automatically
4. Verify accepted discrepancies (`POST /counts/verify`)
5. Watch `GET /activity` and `GET /sessions/{id}/progress` for zone
   completion milestones

## Error handling

Failures return a machine-readable status and a human message:

```json
{
  "error": "Bad Request",
  "message": "Invalid input: rejected scan: EAN-13 checksum failed: expected check digit 1",
  "timestamp": "2025-11-03T10:30:00Z"
}
```
        "#,
        contact(name = "Stocktake Maintainers", email = "dev@stocktake.dev"),
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "sessions", description = "Count session lifecycle and progress"),
        (name = "counts", description = "Count submission and variance verification"),
        (name = "items", description = "Stock item reads and lookup"),
        (name = "scans", description = "Barcode payload validation"),
        (name = "activity", description = "Append-only activity feed"),
        (name = "operators", description = "Operator profiles")
    ),
    paths(
        crate::handlers::sessions::create_session,
        crate::handlers::sessions::current_session,
        crate::handlers::sessions::get_session,
        crate::handlers::sessions::session_progress,
        crate::handlers::sessions::join_session,
        crate::handlers::sessions::close_session,
        crate::handlers::counts::submit_count,
        crate::handlers::counts::verify_count,
        crate::handlers::counts::bulk_verify,
        crate::handlers::items::list_items,
        crate::handlers::items::lookup_items,
        crate::handlers::items::get_item,
        crate::handlers::scans::validate_scan,
        crate::handlers::activity::list_activity,
        crate::handlers::operators::upsert_operator,
    ),
    components(
        schemas(
            crate::handlers::sessions::SessionView,
            crate::handlers::sessions::CreateSessionRequest,
            crate::handlers::sessions::CreateSessionResponse,
            crate::handlers::sessions::CatalogItemRequest,
            crate::handlers::sessions::JoinSessionRequest,
            crate::handlers::counts::SubmitCountRequest,
            crate::handlers::counts::VerifyRequest,
            crate::handlers::counts::BulkVerifyRequest,
            crate::handlers::counts::BulkVerifyResponse,
            crate::handlers::items::StockItemView,
            crate::handlers::scans::ScanRequest,
            crate::handlers::activity::ActivityEventView,
            crate::handlers::operators::UpsertOperatorRequest,
            crate::handlers::operators::OperatorView,
            crate::services::sessions::SessionProgress,
            crate::services::sessions::ZoneProgress,
            crate::entities::stock_items::CountStatus,
            crate::entities::activity_events::ActivityType,
            crate::entities::count_sessions::SessionStatus,
            crate::barcode::Symbology,
            crate::barcode::ValidatedScan,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Stocktake API"));
        assert!(json.contains("/api/v1/counts"));
    }
}
