use crate::{
    barcode::{self, Symbology},
    db::DbPool,
    entities::{
        activity_events::ActivityType,
        stock_items::{self, CountStatus, Entity as StockItems},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        activity::{self, NewActivityEvent},
        operators::OperatorService,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A count submission for one item.
#[derive(Debug, Clone)]
pub struct SubmitCount {
    pub session_id: Uuid,
    pub item_id: Uuid,
    pub counted_qty: i32,
    pub actor_id: String,
    /// Raw scan payload when the submission came from a scan rather than
    /// manual entry; gated through the barcode validator.
    pub captured_barcode: Option<String>,
    /// Symbology reported by the scanning hardware, if any.
    pub symbology: Option<Symbology>,
}

/// Result of a bulk verification. Items that failed the precondition are
/// skipped, not treated as a batch failure; callers inspect
/// `updated_count` to detect partial application.
#[derive(Debug, Clone)]
pub struct BulkVerifyOutcome {
    pub updated_count: u64,
    pub skipped_ids: Vec<Uuid>,
}

/// The count reconciliation engine: accepts submitted quantities,
/// computes variance, transitions item status, appends the activity
/// ledger, and re-derives zone completion.
///
/// Two operators submitting for the same item race last-writer-wins at
/// the storage layer. That is a deliberate simplification for a live
/// collaborative count; add a version column and return
/// `ServiceError::Conflict` on mismatch if stronger guarantees are
/// needed.
#[derive(Clone)]
pub struct CountService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    operators: Arc<OperatorService>,
}

impl CountService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, operators: Arc<OperatorService>) -> Self {
        Self {
            db,
            event_sender,
            operators,
        }
    }

    /// Submits a counted quantity for an item.
    ///
    /// The item write, the ledger append, and the zone-completion check
    /// share one transaction: a rejected submission mutates nothing and
    /// emits nothing.
    #[instrument(skip(self, cmd), fields(item_id = %cmd.item_id, counted_qty = cmd.counted_qty))]
    pub async fn submit_count(&self, cmd: SubmitCount) -> Result<stock_items::Model, ServiceError> {
        if cmd.counted_qty < 0 {
            return Err(ServiceError::InvalidInput(
                "counted quantity must be a non-negative integer".to_string(),
            ));
        }

        if let Some(raw) = &cmd.captured_barcode {
            barcode::validate(raw, cmd.symbology)
                .map_err(|e| ServiceError::InvalidInput(format!("rejected scan: {}", e)))?;
        }

        let actor_name = self.operators.resolve_display_name(&cmd.actor_id).await?;

        let SubmitCount {
            session_id,
            item_id,
            counted_qty,
            actor_id,
            ..
        } = cmd;
        let actor_name_txn = actor_name.clone();

        let (updated, completed_zone) = self
            .db
            .transaction::<_, (stock_items::Model, Option<String>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = StockItems::find_by_id(item_id)
                        .filter(stock_items::Column::SessionId.eq(session_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("stock item {} not found", item_id))
                        })?;

                    let (variance, status) = reconcile(counted_qty, item.expected_qty);
                    let now = Utc::now();

                    let mut active: stock_items::ActiveModel = item.into();
                    active.counted_qty = Set(Some(counted_qty));
                    active.variance = Set(Some(variance));
                    active.status = Set(status.to_string());
                    active.last_counted_by = Set(Some(actor_name_txn.clone()));
                    active.last_counted_at = Set(Some(now));
                    active.updated_at = Set(now);
                    let updated = active.update(txn).await.map_err(ServiceError::db_error)?;

                    let (activity_type, message) = if variance == 0 {
                        (
                            ActivityType::Count,
                            format!("counted {} for {}", counted_qty, updated.name),
                        )
                    } else {
                        (
                            ActivityType::Variance,
                            format!("flagged variance on {} ({:+})", updated.name, variance),
                        )
                    };

                    activity::record_event(
                        txn,
                        NewActivityEvent {
                            session_id,
                            activity_type,
                            message,
                            actor_id: Some(actor_id),
                            actor_name: Some(actor_name_txn),
                            zone: Some(updated.zone.clone()),
                            item_id: Some(updated.id),
                        },
                    )
                    .await?;

                    let completed = check_zone_completion(txn, session_id, &updated.zone).await?;
                    let completed_zone = completed.then(|| updated.zone.clone());

                    Ok((updated, completed_zone))
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        let variance = updated.variance.unwrap_or(0);
        info!(
            item_id = %updated.id,
            variance,
            status = %updated.status,
            by = %actor_name,
            "count submitted"
        );

        let event = if variance == 0 {
            Event::CountSubmitted {
                session_id,
                item_id: updated.id,
                counted_qty,
            }
        } else {
            Event::VarianceFlagged {
                session_id,
                item_id: updated.id,
                variance,
            }
        };
        self.event_sender
            .send(event)
            .await
            .map_err(ServiceError::EventError)?;

        if let Some(zone) = completed_zone {
            self.event_sender
                .send(Event::ZoneCompleted { session_id, zone })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(updated)
    }

    /// Accepts a flagged discrepancy. Only `variance` items can be
    /// verified; the counted quantity and variance stay as recorded, and
    /// the counting attribution is not touched.
    #[instrument(skip(self))]
    pub async fn verify_item(
        &self,
        session_id: Uuid,
        item_id: Uuid,
        actor_id: &str,
    ) -> Result<stock_items::Model, ServiceError> {
        let actor_name = self.operators.resolve_display_name(actor_id).await?;
        let actor_id = actor_id.to_string();
        let actor_name_txn = actor_name.clone();

        let (updated, completed_zone) = self
            .db
            .transaction::<_, (stock_items::Model, Option<String>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let item = StockItems::find_by_id(item_id)
                        .filter(stock_items::Column::SessionId.eq(session_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("stock item {} not found", item_id))
                        })?;

                    let updated =
                        verify_one(txn, session_id, item, &actor_id, &actor_name_txn).await?;

                    let completed = check_zone_completion(txn, session_id, &updated.zone).await?;
                    let completed_zone = completed.then(|| updated.zone.clone());

                    Ok((updated, completed_zone))
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(item_id = %updated.id, by = %actor_name, "variance verified");

        self.event_sender
            .send(Event::VarianceVerified {
                session_id,
                item_id: updated.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        if let Some(zone) = completed_zone {
            self.event_sender
                .send(Event::ZoneCompleted { session_id, zone })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(updated)
    }

    /// Verifies a set of items, skipping the ones that fail the
    /// per-item precondition (wrong status, unknown id) instead of
    /// aborting the batch.
    #[instrument(skip(self, item_ids), fields(requested = item_ids.len()))]
    pub async fn verify_items(
        &self,
        session_id: Uuid,
        item_ids: Vec<Uuid>,
        actor_id: &str,
    ) -> Result<BulkVerifyOutcome, ServiceError> {
        let actor_name = self.operators.resolve_display_name(actor_id).await?;
        let actor_id = actor_id.to_string();

        let (updated_ids, skipped_ids, completed_zones) = self
            .db
            .transaction::<_, (Vec<Uuid>, Vec<Uuid>, Vec<String>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let mut updated_ids = Vec::new();
                    let mut skipped_ids = Vec::new();
                    let mut touched_zones = BTreeSet::new();

                    for item_id in item_ids {
                        let item = StockItems::find_by_id(item_id)
                            .filter(stock_items::Column::SessionId.eq(session_id))
                            .one(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        let item = match item {
                            Some(item) if item.count_status() == CountStatus::Variance => item,
                            _ => {
                                skipped_ids.push(item_id);
                                continue;
                            }
                        };

                        let updated =
                            verify_one(txn, session_id, item, &actor_id, &actor_name).await?;
                        touched_zones.insert(updated.zone.clone());
                        updated_ids.push(updated.id);
                    }

                    let mut completed_zones = Vec::new();
                    for zone in touched_zones {
                        if check_zone_completion(txn, session_id, &zone).await? {
                            completed_zones.push(zone);
                        }
                    }

                    Ok((updated_ids, skipped_ids, completed_zones))
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(
            updated = updated_ids.len(),
            skipped = skipped_ids.len(),
            "bulk verification applied"
        );

        for item_id in &updated_ids {
            self.event_sender
                .send(Event::VarianceVerified {
                    session_id,
                    item_id: *item_id,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }
        for zone in completed_zones {
            self.event_sender
                .send(Event::ZoneCompleted { session_id, zone })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(BulkVerifyOutcome {
            updated_count: updated_ids.len() as u64,
            skipped_ids,
        })
    }
}

/// Transitions one item from `variance` to `verified` and appends the
/// ledger entry. Quantities are left untouched: verification confirms
/// acceptance of the discrepancy, it does not reassert a count.
async fn verify_one<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    item: stock_items::Model,
    actor_id: &str,
    actor_name: &str,
) -> Result<stock_items::Model, ServiceError> {
    if item.count_status() != CountStatus::Variance {
        return Err(ServiceError::InvalidState(
            "only variance items can be verified".to_string(),
        ));
    }

    let mut active: stock_items::ActiveModel = item.into();
    active.status = Set(CountStatus::Verified.to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(conn).await.map_err(ServiceError::db_error)?;

    activity::record_event(
        conn,
        NewActivityEvent {
            session_id,
            activity_type: ActivityType::Verify,
            message: format!("verified variance on {}", updated.name),
            actor_id: Some(actor_id.to_string()),
            actor_name: Some(actor_name.to_string()),
            zone: Some(updated.zone.clone()),
            item_id: Some(updated.id),
        },
    )
    .await?;

    Ok(updated)
}

/// Re-derives completion for a zone: when every item in the zone has
/// reached counted-or-better status, the milestone is announced exactly
/// once per `(session, zone)`. Runs only as a side effect of the
/// submission or verification that may have pushed the zone over the
/// threshold; zones never flip spontaneously.
pub async fn check_zone_completion<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    zone: &str,
) -> Result<bool, ServiceError> {
    let total = StockItems::find()
        .filter(stock_items::Column::SessionId.eq(session_id))
        .filter(stock_items::Column::Zone.eq(zone))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if total == 0 {
        return Ok(false);
    }

    let counted_equivalent = StockItems::find()
        .filter(stock_items::Column::SessionId.eq(session_id))
        .filter(stock_items::Column::Zone.eq(zone))
        .filter(stock_items::Column::Status.ne(CountStatus::Pending.to_string()))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if counted_equivalent < total {
        return Ok(false);
    }

    // Cheap pre-check; the unique index behind try_record_zone_completion
    // is what actually closes the read-then-write race.
    if activity::has_zone_completion(conn, session_id, zone).await? {
        return Ok(false);
    }

    activity::try_record_zone_completion(conn, session_id, zone).await
}

/// Signed variance and the status it implies: a count matching the
/// expected baseline reconciles clean, anything else flags a variance.
fn reconcile(counted_qty: i32, expected_qty: i32) -> (i32, CountStatus) {
    let variance = counted_qty - expected_qty;
    let status = if variance == 0 {
        CountStatus::Counted
    } else {
        CountStatus::Variance
    };
    (variance, status)
}

fn unwrap_transaction_error(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
