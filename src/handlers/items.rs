use crate::{
    entities::stock_items::{self, CountStatus},
    errors::ServiceError,
    handlers::{AppState, PaginationParams},
    services::items::ItemFilters,
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Item representation returned to counting clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockItemView {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sku: String,
    pub name: String,
    pub barcode: Option<String>,
    pub zone: String,
    pub expected_qty: i32,
    pub counted_qty: Option<i32>,
    pub variance: Option<i32>,
    pub status: CountStatus,
    pub last_counted_by: Option<String>,
    pub last_counted_at: Option<DateTime<Utc>>,
}

impl From<stock_items::Model> for StockItemView {
    fn from(model: stock_items::Model) -> Self {
        let status = model.count_status();
        Self {
            id: model.id,
            session_id: model.session_id,
            sku: model.sku,
            name: model.name,
            barcode: model.barcode,
            zone: model.zone,
            expected_qty: model.expected_qty,
            counted_qty: model.counted_qty,
            variance: model.variance,
            status,
            last_counted_by: model.last_counted_by,
            last_counted_at: model.last_counted_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ItemListFilters {
    /// Session to list; defaults to the current session
    pub session_id: Option<Uuid>,
    pub zone: Option<String>,
    pub status: Option<CountStatus>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct LookupQuery {
    /// Session to search; defaults to the current session
    pub session_id: Option<Uuid>,
    /// Scanned or typed code, or a free-text name fragment
    pub q: String,
}

/// Create the items router
pub fn items_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items))
        .route("/lookup", get(lookup_items))
        .route("/:id", get(get_item))
}

/// List a session's stock items with optional zone/status filters
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemListFilters, PaginationParams),
    responses(
        (status = 200, description = "Items returned"),
        (status = 401, description = "No active session", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filters): Query<ItemListFilters>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .require_session(filters.session_id)
        .await?;

    let (items, total) = state
        .services
        .items
        .list(
            session.id,
            ItemFilters {
                zone: filters.zone,
                status: filters.status,
            },
            pagination.page(),
            pagination.per_page(),
        )
        .await?;

    let views: Vec<StockItemView> = items.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse {
        total,
        page: pagination.page(),
        limit: pagination.per_page(),
        total_pages: total.div_ceil(pagination.per_page()),
        items: views,
    })))
}

/// Resolve a scanned/typed code or free text to candidate items
#[utoipa::path(
    get,
    path = "/api/v1/items/lookup",
    params(LookupQuery),
    responses(
        (status = 200, description = "Zero or more candidates returned"),
        (status = 401, description = "No active session", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn lookup_items(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .require_session(query.session_id)
        .await?;

    let candidates = state.services.items.lookup(session.id, &query.q).await?;
    let views: Vec<StockItemView> = candidates.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success(views)))
}

/// Fetch one stock item
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Stock item id")),
    responses(
        (status = 200, description = "Item returned", body = StockItemView),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filters): Query<ItemListFilters>,
) -> Result<impl IntoResponse, ServiceError> {
    let session = state
        .services
        .sessions
        .require_session(filters.session_id)
        .await?;

    let item = state.services.items.get(session.id, id).await?;
    Ok(Json(ApiResponse::success(StockItemView::from(item))))
}
