use crate::{
    db::DbPool,
    entities::stock_items::{self, CountStatus, Entity as StockItems},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Most candidates a free-text lookup returns.
const LOOKUP_LIMIT: u64 = 25;

/// One catalog line loaded into a session at start.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub sku: String,
    pub name: String,
    pub barcode: Option<String>,
    pub zone: String,
    pub category: Option<String>,
    pub warehouse: Option<String>,
    pub uom: Option<String>,
    pub supplier: Option<String>,
    pub expected_qty: i32,
}

/// Optional filters for item listings.
#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
    pub zone: Option<String>,
    pub status: Option<CountStatus>,
}

/// Service for reading and seeding session stock items
#[derive(Clone)]
pub struct StockItemService {
    db: Arc<DbPool>,
}

impl StockItemService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Point read of a session item.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        session_id: Uuid,
        item_id: Uuid,
    ) -> Result<stock_items::Model, ServiceError> {
        StockItems::find_by_id(item_id)
            .filter(stock_items::Column::SessionId.eq(session_id))
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("stock item {} not found", item_id)))
    }

    /// Lists session items with optional zone/status filters.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        session_id: Uuid,
        filters: ItemFilters,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_items::Model>, u64), ServiceError> {
        let mut query = StockItems::find()
            .filter(stock_items::Column::SessionId.eq(session_id))
            .order_by_asc(stock_items::Column::Zone)
            .order_by_asc(stock_items::Column::Sku);

        if let Some(zone) = filters.zone {
            query = query.filter(stock_items::Column::Zone.eq(zone));
        }
        if let Some(status) = filters.status {
            query = query.filter(stock_items::Column::Status.eq(status.to_string()));
        }

        let paginator = query.paginate(self.db.as_ref(), per_page.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Resolves a scanned or typed query to candidate items: exact barcode
    /// match first, then exact SKU, then a name substring search. Returns
    /// zero, one, or many candidates; the caller decides how to
    /// disambiguate.
    #[instrument(skip(self))]
    pub async fn lookup(
        &self,
        session_id: Uuid,
        query: &str,
    ) -> Result<Vec<stock_items::Model>, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let by_barcode = StockItems::find()
            .filter(stock_items::Column::SessionId.eq(session_id))
            .filter(stock_items::Column::Barcode.eq(query))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if !by_barcode.is_empty() {
            return Ok(by_barcode);
        }

        let by_sku = StockItems::find()
            .filter(stock_items::Column::SessionId.eq(session_id))
            .filter(stock_items::Column::Sku.eq(query))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if !by_sku.is_empty() {
            return Ok(by_sku);
        }

        StockItems::find()
            .filter(stock_items::Column::SessionId.eq(session_id))
            .filter(stock_items::Column::Name.contains(query))
            .order_by_asc(stock_items::Column::Name)
            .limit(LOOKUP_LIMIT)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Seeds a session's items from a catalog snapshot. Runs on the
    /// session-start transaction; items start `pending` with no count.
    pub(crate) async fn load_catalog<C: ConnectionTrait>(
        conn: &C,
        session_id: Uuid,
        catalog: &[CatalogItem],
    ) -> Result<u64, ServiceError> {
        if catalog.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let rows: Vec<stock_items::ActiveModel> = catalog
            .iter()
            .map(|line| stock_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                session_id: Set(session_id),
                sku: Set(line.sku.clone()),
                name: Set(line.name.clone()),
                barcode: Set(line.barcode.clone()),
                zone: Set(line.zone.clone()),
                category: Set(line.category.clone()),
                warehouse: Set(line.warehouse.clone()),
                uom: Set(line.uom.clone()),
                supplier: Set(line.supplier.clone()),
                expected_qty: Set(line.expected_qty),
                counted_qty: Set(None),
                variance: Set(None),
                status: Set(CountStatus::Pending.to_string()),
                last_counted_by: Set(None),
                last_counted_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .collect();

        let count = rows.len() as u64;
        StockItems::insert_many(rows)
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(count)
    }
}
