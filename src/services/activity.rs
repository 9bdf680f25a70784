use crate::{
    db::DbPool,
    entities::activity_events::{
        self, zone_complete_dedup_key, ActivityType, Entity as ActivityEvents,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Fields of a ledger entry to append. Ids and timestamps are stamped at
/// insert time.
#[derive(Debug, Clone)]
pub struct NewActivityEvent {
    pub session_id: Uuid,
    pub activity_type: ActivityType,
    pub message: String,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub zone: Option<String>,
    pub item_id: Option<Uuid>,
}

/// Appends one ledger row. Callers pass their open transaction so the row
/// commits or rolls back together with the state change it describes.
pub async fn record_event<C: ConnectionTrait>(
    conn: &C,
    event: NewActivityEvent,
) -> Result<activity_events::Model, ServiceError> {
    activity_events::ActiveModel {
        id: Set(Uuid::new_v4()),
        session_id: Set(event.session_id),
        event_type: Set(event.activity_type.to_string()),
        message: Set(event.message),
        actor_id: Set(event.actor_id),
        actor_name: Set(event.actor_name),
        zone: Set(event.zone),
        item_id: Set(event.item_id),
        dedup_key: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

/// Whether a `zone_complete` row already exists for `(session, zone)`.
pub async fn has_zone_completion<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    zone: &str,
) -> Result<bool, ServiceError> {
    let count = ActivityEvents::find()
        .filter(activity_events::Column::SessionId.eq(session_id))
        .filter(activity_events::Column::DedupKey.eq(zone_complete_dedup_key(zone)))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(count > 0)
}

/// Appends the `zone_complete` milestone row. The unique index on
/// `(session_id, dedup_key)` closes the race two submissions can run into
/// after both passed the existence pre-check; losing the insert means the
/// milestone was already announced and is not an error. The conflict is
/// resolved with `ON CONFLICT DO NOTHING` so the caller's transaction
/// survives the lost race.
pub async fn try_record_zone_completion<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    zone: &str,
) -> Result<bool, ServiceError> {
    let row = activity_events::ActiveModel {
        id: Set(Uuid::new_v4()),
        session_id: Set(session_id),
        event_type: Set(ActivityType::ZoneComplete.to_string()),
        message: Set(format!("completed zone {}", zone)),
        actor_id: Set(None),
        actor_name: Set(None),
        zone: Set(Some(zone.to_string())),
        item_id: Set(None),
        dedup_key: Set(Some(zone_complete_dedup_key(zone))),
        created_at: Set(Utc::now()),
    };

    let insert = ActivityEvents::insert(row).on_conflict(
        OnConflict::columns([
            activity_events::Column::SessionId,
            activity_events::Column::DedupKey,
        ])
        .do_nothing()
        .to_owned(),
    );

    match insert.exec(conn).await {
        Ok(_) => Ok(true),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Ok(false),
            _ => Err(ServiceError::DatabaseError(err)),
        },
    }
}

/// Read side of the ledger, consumed by the dashboard feed
#[derive(Clone)]
pub struct ActivityService {
    db: Arc<DbPool>,
}

impl ActivityService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Returns one page of the session feed, newest first. Timestamp ties
    /// are broken by id so repeated reads render in a stable order.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        session_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<activity_events::Model>, u64), ServiceError> {
        let paginator = ActivityEvents::find()
            .filter(activity_events::Column::SessionId.eq(session_id))
            .order_by_desc(activity_events::Column::CreatedAt)
            .order_by_asc(activity_events::Column::Id)
            .paginate(self.db.as_ref(), per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let events = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((events, total))
    }
}
