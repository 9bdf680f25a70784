mod common;

use assert_matches::assert_matches;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use stocktake_api::{
    db::DbPool,
    entities::{
        activity_events::{self, Entity as ActivityEvents},
        stock_items::CountStatus,
    },
    errors::ServiceError,
    handlers::AppServices,
    services::counts::{check_zone_completion, SubmitCount},
};
use uuid::Uuid;

async fn item_id(services: &AppServices, session_id: Uuid, sku: &str) -> Uuid {
    services
        .items
        .lookup(session_id, sku)
        .await
        .expect("lookup")
        .first()
        .expect("seeded item")
        .id
}

fn submit(session_id: Uuid, item_id: Uuid, qty: i32, actor: &str) -> SubmitCount {
    SubmitCount {
        session_id,
        item_id,
        counted_qty: qty,
        actor_id: actor.to_string(),
        captured_barcode: None,
        symbology: None,
    }
}

async fn zone_complete_rows(db: &Arc<DbPool>, session_id: Uuid, zone: &str) -> u64 {
    ActivityEvents::find()
        .filter(activity_events::Column::SessionId.eq(session_id))
        .filter(activity_events::Column::EventType.eq("zone_complete"))
        .filter(activity_events::Column::Zone.eq(zone))
        .count(db.as_ref())
        .await
        .expect("count rows")
}

#[tokio::test]
async fn matching_count_reconciles_to_counted() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", None, "A1", 5)],
    )
    .await;
    let item = item_id(&services, session.id, "WIDGET-1").await;

    let updated = services
        .counts
        .submit_count(submit(session.id, item, 5, "user_1"))
        .await
        .expect("submit");

    assert_eq!(updated.counted_qty, Some(5));
    assert_eq!(updated.variance, Some(0));
    assert_eq!(updated.count_status(), CountStatus::Counted);
    assert!(updated.last_counted_at.is_some());
    assert_eq!(updated.last_counted_by.as_deref(), Some("operator-user_1"));
}

#[tokio::test]
async fn mismatched_count_flags_variance() {
    let (db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", None, "A1", 5)],
    )
    .await;
    let item = item_id(&services, session.id, "WIDGET-1").await;

    let updated = services
        .counts
        .submit_count(submit(session.id, item, 8, "user_1"))
        .await
        .expect("submit");

    assert_eq!(updated.variance, Some(3));
    assert_eq!(updated.count_status(), CountStatus::Variance);

    let flagged = ActivityEvents::find()
        .filter(activity_events::Column::SessionId.eq(session.id))
        .filter(activity_events::Column::EventType.eq("variance"))
        .one(db.as_ref())
        .await
        .expect("query")
        .expect("variance event");
    assert!(flagged.message.contains("(+3)"));
    assert_eq!(flagged.item_id, Some(item));
    assert_eq!(flagged.zone.as_deref(), Some("A1"));
}

#[tokio::test]
async fn resubmission_is_last_writer_wins() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", None, "A1", 5)],
    )
    .await;
    let item = item_id(&services, session.id, "WIDGET-1").await;

    services
        .counts
        .submit_count(submit(session.id, item, 2, "user_1"))
        .await
        .expect("first submit");
    let updated = services
        .counts
        .submit_count(submit(session.id, item, 5, "user_2"))
        .await
        .expect("second submit");

    assert_eq!(updated.counted_qty, Some(5));
    assert_eq!(updated.count_status(), CountStatus::Counted);
    assert_eq!(updated.last_counted_by.as_deref(), Some("operator-user_2"));
}

#[tokio::test]
async fn negative_quantity_is_rejected_without_side_effects() {
    let (db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", None, "A1", 5)],
    )
    .await;
    let item = item_id(&services, session.id, "WIDGET-1").await;

    let err = services
        .counts
        .submit_count(submit(session.id, item, -1, "user_1"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));

    let untouched = services.items.get(session.id, item).await.expect("get");
    assert_eq!(untouched.count_status(), CountStatus::Pending);
    assert_eq!(untouched.counted_qty, None);

    let events = ActivityEvents::find()
        .filter(activity_events::Column::SessionId.eq(session.id))
        .count(db.as_ref())
        .await
        .expect("count");
    assert_eq!(events, 0);
}

#[tokio::test]
async fn corrupt_captured_barcode_blocks_the_submission() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", Some("4006381333931"), "A1", 5)],
    )
    .await;
    let item = item_id(&services, session.id, "WIDGET-1").await;

    let mut cmd = submit(session.id, item, 5, "user_1");
    cmd.captured_barcode = Some("4006381333932".to_string());

    let err = services.counts.submit_count(cmd).await.unwrap_err();
    let message = err.to_string();
    assert_matches!(err, ServiceError::InvalidInput(_));
    assert!(message.contains("expected check digit 1"), "{message}");

    let untouched = services.items.get(session.id, item).await.expect("get");
    assert_eq!(untouched.count_status(), CountStatus::Pending);
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", None, "A1", 5)],
    )
    .await;

    let err = services
        .counts
        .submit_count(submit(session.id, Uuid::new_v4(), 5, "user_1"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn verification_requires_variance_status() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[
            ("WIDGET-1", "Widget", None, "A1", 5),
            ("GADGET-1", "Gadget", None, "A1", 2),
        ],
    )
    .await;
    let widget = item_id(&services, session.id, "WIDGET-1").await;
    let gadget = item_id(&services, session.id, "GADGET-1").await;

    // Pending items cannot be verified
    let err = services
        .counts
        .verify_item(session.id, widget, "user_1")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    // Clean counts cannot be verified either
    services
        .counts
        .submit_count(submit(session.id, gadget, 2, "user_1"))
        .await
        .expect("submit");
    let err = services
        .counts
        .verify_item(session.id, gadget, "user_1")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    // Variance items can, exactly once
    services
        .counts
        .submit_count(submit(session.id, widget, 7, "user_1"))
        .await
        .expect("submit");
    let verified = services
        .counts
        .verify_item(session.id, widget, "user_2")
        .await
        .expect("verify");
    assert_eq!(verified.count_status(), CountStatus::Verified);
    // Verification confirms the discrepancy without touching the count
    assert_eq!(verified.counted_qty, Some(7));
    assert_eq!(verified.variance, Some(2));
    assert_eq!(verified.last_counted_by.as_deref(), Some("operator-user_1"));

    let err = services
        .counts
        .verify_item(session.id, widget, "user_2")
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn display_name_falls_back_to_masked_actor_id() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[("WIDGET-1", "Widget", None, "A1", 5)],
    )
    .await;
    let item = item_id(&services, session.id, "WIDGET-1").await;

    let updated = services
        .counts
        .submit_count(submit(session.id, item, 5, "user_abcdef123456"))
        .await
        .expect("submit");
    let recorded = updated.last_counted_by.expect("attribution recorded");
    assert!(recorded.ends_with("123456"), "{recorded}");

    // A stored profile takes precedence over the masked id
    services
        .operators
        .upsert_profile(
            "user_abcdef123456",
            Some("Ada".to_string()),
            Some("Lovelace".to_string()),
        )
        .await
        .expect("profile");
    let updated = services
        .counts
        .submit_count(submit(session.id, item, 5, "user_abcdef123456"))
        .await
        .expect("submit");
    assert_eq!(updated.last_counted_by.as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn zone_completion_fires_exactly_once() {
    let (db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[
            ("WIDGET-1", "Widget", None, "A1", 5),
            ("GADGET-1", "Gadget", None, "A1", 2),
            ("SPROCKET-1", "Sprocket", None, "B2", 9),
        ],
    )
    .await;
    let widget = item_id(&services, session.id, "WIDGET-1").await;
    let gadget = item_id(&services, session.id, "GADGET-1").await;

    services
        .counts
        .submit_count(submit(session.id, widget, 5, "user_1"))
        .await
        .expect("submit");
    assert_eq!(zone_complete_rows(&db, session.id, "A1").await, 0);

    // A variance still counts toward zone coverage
    services
        .counts
        .submit_count(submit(session.id, gadget, 3, "user_1"))
        .await
        .expect("submit");
    assert_eq!(zone_complete_rows(&db, session.id, "A1").await, 1);

    // Re-deriving an already-announced zone is a no-op
    assert!(!check_zone_completion(db.as_ref(), session.id, "A1")
        .await
        .expect("check"));
    assert!(!check_zone_completion(db.as_ref(), session.id, "A1")
        .await
        .expect("check"));
    assert_eq!(zone_complete_rows(&db, session.id, "A1").await, 1);

    // Later mutations in the zone do not re-announce it
    services
        .counts
        .verify_item(session.id, gadget, "user_2")
        .await
        .expect("verify");
    assert_eq!(zone_complete_rows(&db, session.id, "A1").await, 1);

    // The untouched zone stays incomplete
    assert_eq!(zone_complete_rows(&db, session.id, "B2").await, 0);
}

#[tokio::test]
async fn concurrent_submissions_for_distinct_items_both_land() {
    let (db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[
            ("WIDGET-1", "Widget", None, "A1", 5),
            ("GADGET-1", "Gadget", None, "A1", 2),
        ],
    )
    .await;
    let widget = item_id(&services, session.id, "WIDGET-1").await;
    let gadget = item_id(&services, session.id, "GADGET-1").await;

    let first = {
        let services = services.clone();
        let cmd = submit(session.id, widget, 5, "user_1");
        tokio::spawn(async move { services.counts.submit_count(cmd).await })
    };
    let second = {
        let services = services.clone();
        let cmd = submit(session.id, gadget, 2, "user_2");
        tokio::spawn(async move { services.counts.submit_count(cmd).await })
    };

    first.await.expect("join").expect("first submit");
    second.await.expect("join").expect("second submit");

    let widget_row = services.items.get(session.id, widget).await.expect("get");
    let gadget_row = services.items.get(session.id, gadget).await.expect("get");
    assert_eq!(widget_row.count_status(), CountStatus::Counted);
    assert_eq!(gadget_row.count_status(), CountStatus::Counted);

    // Both submissions re-derived the zone; the milestone landed once
    assert_eq!(zone_complete_rows(&db, session.id, "A1").await, 1);
}

#[tokio::test]
async fn bulk_verification_skips_failed_preconditions() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "aisle walk",
        &[
            ("WIDGET-1", "Widget", None, "A1", 5),
            ("GADGET-1", "Gadget", None, "A1", 2),
        ],
    )
    .await;
    let widget = item_id(&services, session.id, "WIDGET-1").await;
    let gadget = item_id(&services, session.id, "GADGET-1").await;

    services
        .counts
        .submit_count(submit(session.id, widget, 9, "user_1"))
        .await
        .expect("submit");
    services
        .counts
        .submit_count(submit(session.id, gadget, 2, "user_1"))
        .await
        .expect("submit");

    let ghost = Uuid::new_v4();
    let outcome = services
        .counts
        .verify_items(session.id, vec![widget, gadget, ghost], "user_2")
        .await
        .expect("bulk verify");

    assert_eq!(outcome.updated_count, 1);
    assert_eq!(outcome.skipped_ids, vec![gadget, ghost]);

    let widget_row = services.items.get(session.id, widget).await.expect("get");
    assert_eq!(widget_row.count_status(), CountStatus::Verified);
    let gadget_row = services.items.get(session.id, gadget).await.expect("get");
    assert_eq!(gadget_row.count_status(), CountStatus::Counted);
}
