use crate::{
    db::DbPool,
    entities::{
        activity_events::ActivityType,
        count_sessions::{self, Entity as CountSessions, SessionStatus},
        stock_items::{self, CountStatus, Entity as StockItems},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        activity::{self, NewActivityEvent},
        items::{CatalogItem, StockItemService},
    },
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reconciliation coverage of one zone.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ZoneProgress {
    pub zone: String,
    pub total: i64,
    pub pending: i64,
    pub counted: i64,
    pub variance: i64,
    pub verified: i64,
}

impl ZoneProgress {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.pending == 0
    }
}

/// Aggregate counts for a session, plus the per-zone breakdown.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionProgress {
    pub session_id: Uuid,
    pub total: i64,
    pub pending: i64,
    pub counted: i64,
    pub variance: i64,
    pub verified: i64,
    pub zones: Vec<ZoneProgress>,
}

#[derive(FromQueryResult)]
struct ZoneStatusRow {
    zone: String,
    status: String,
    n: i64,
}

/// Service managing count sessions and their aggregates
#[derive(Clone)]
pub struct SessionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl SessionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Starts a session and seeds its items from a catalog snapshot, in
    /// one transaction.
    #[instrument(skip(self, catalog), fields(items = catalog.len()))]
    pub async fn start_session(
        &self,
        name: String,
        started_by: Option<String>,
        catalog: Vec<CatalogItem>,
    ) -> Result<(count_sessions::Model, u64), ServiceError> {
        let (session, item_count) = self
            .db
            .transaction::<_, (count_sessions::Model, u64), ServiceError>(move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    let session = count_sessions::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(name),
                        status: Set(SessionStatus::Active.to_string()),
                        started_by: Set(started_by),
                        started_at: Set(now),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let item_count =
                        StockItemService::load_catalog(txn, session.id, &catalog).await?;

                    Ok((session, item_count))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })?;

        info!(session_id = %session.id, item_count, "count session started");

        self.event_sender
            .send(Event::SessionStarted {
                session_id: session.id,
                item_count,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok((session, item_count))
    }

    /// Point read of a session.
    #[instrument(skip(self))]
    pub async fn get(&self, session_id: Uuid) -> Result<count_sessions::Model, ServiceError> {
        CountSessions::find_by_id(session_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("session {} not found", session_id)))
    }

    /// Most recently started active session, if any.
    #[instrument(skip(self))]
    pub async fn current(&self) -> Result<Option<count_sessions::Model>, ServiceError> {
        CountSessions::find()
            .filter(count_sessions::Column::Status.eq(SessionStatus::Active.to_string()))
            .order_by_desc(count_sessions::Column::StartedAt)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Resolves the session a request operates on. The engine always takes
    /// an explicit session id; this helper is the HTTP layer's resolution
    /// for requests that omit one.
    pub async fn require_session(
        &self,
        explicit: Option<Uuid>,
    ) -> Result<count_sessions::Model, ServiceError> {
        match explicit {
            Some(id) => self.get(id).await,
            None => self.current().await?.ok_or_else(|| {
                ServiceError::Unauthorized("no active count session".to_string())
            }),
        }
    }

    /// Closes a session; counts can no longer resolve it as "current".
    #[instrument(skip(self))]
    pub async fn close(&self, session_id: Uuid) -> Result<count_sessions::Model, ServiceError> {
        let session = self.get(session_id).await?;
        if session.session_status() == SessionStatus::Closed {
            return Err(ServiceError::InvalidState(
                "session is already closed".to_string(),
            ));
        }

        let mut active: count_sessions::ActiveModel = session.into();
        active.status = Set(SessionStatus::Closed.to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Records an operator joining the count.
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        session_id: Uuid,
        actor_id: &str,
        actor_name: String,
    ) -> Result<(), ServiceError> {
        let session = self.get(session_id).await?;

        activity::record_event(
            self.db.as_ref(),
            NewActivityEvent {
                session_id: session.id,
                activity_type: ActivityType::Join,
                message: format!("{} joined the count", actor_name),
                actor_id: Some(actor_id.to_string()),
                actor_name: Some(actor_name),
                zone: None,
                item_id: None,
            },
        )
        .await?;

        self.event_sender
            .send(Event::OperatorJoined {
                session_id: session.id,
                actor_id: actor_id.to_string(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }

    /// Aggregate reconciliation progress, grouped per zone.
    #[instrument(skip(self))]
    pub async fn progress(&self, session_id: Uuid) -> Result<SessionProgress, ServiceError> {
        // Session must exist even when it has no items yet
        self.get(session_id).await?;

        let rows = StockItems::find()
            .select_only()
            .column(stock_items::Column::Zone)
            .column(stock_items::Column::Status)
            .column_as(
                Expr::col((stock_items::Entity, stock_items::Column::Id)).count(),
                "n",
            )
            .filter(stock_items::Column::SessionId.eq(session_id))
            .group_by(stock_items::Column::Zone)
            .group_by(stock_items::Column::Status)
            .into_model::<ZoneStatusRow>()
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let mut zones: BTreeMap<String, ZoneProgress> = BTreeMap::new();
        for row in rows {
            let entry = zones
                .entry(row.zone.clone())
                .or_insert_with(|| ZoneProgress {
                    zone: row.zone.clone(),
                    total: 0,
                    pending: 0,
                    counted: 0,
                    variance: 0,
                    verified: 0,
                });
            entry.total += row.n;
            match row.status.parse().unwrap_or(CountStatus::Pending) {
                CountStatus::Pending => entry.pending += row.n,
                CountStatus::Counted => entry.counted += row.n,
                CountStatus::Variance => entry.variance += row.n,
                CountStatus::Verified => entry.verified += row.n,
            }
        }

        let mut progress = SessionProgress {
            session_id,
            total: 0,
            pending: 0,
            counted: 0,
            variance: 0,
            verified: 0,
            zones: zones.into_values().collect(),
        };
        for zone in &progress.zones {
            progress.total += zone.total;
            progress.pending += zone.pending;
            progress.counted += zone.counted;
            progress.variance += zone.variance;
            progress.verified += zone.verified;
        }

        Ok(progress)
    }
}
