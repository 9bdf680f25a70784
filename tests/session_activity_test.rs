mod common;

use assert_matches::assert_matches;
use stocktake_api::{
    entities::stock_items::CountStatus,
    errors::ServiceError,
    services::{counts::SubmitCount, items::ItemFilters},
};
use uuid::Uuid;

fn submit(session_id: Uuid, item_id: Uuid, qty: i32) -> SubmitCount {
    SubmitCount {
        session_id,
        item_id,
        counted_qty: qty,
        actor_id: "user_1".to_string(),
        captured_barcode: None,
        symbology: None,
    }
}

#[tokio::test]
async fn lookup_prefers_barcode_then_sku_then_name() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "backroom",
        &[
            ("COLA-330", "Cola Can 330ml", Some("4006381333931"), "A1", 24),
            ("4006381333931", "Sticker Pack", None, "A1", 10),
            ("CRISPS-90", "Salted Crisps", None, "B2", 40),
            ("CRISPS-150", "Paprika Crisps", None, "B2", 12),
        ],
    )
    .await;

    // Exact barcode wins even when the query also matches another SKU
    let hits = services
        .items
        .lookup(session.id, "4006381333931")
        .await
        .expect("lookup");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].sku, "COLA-330");

    let hits = services
        .items
        .lookup(session.id, "CRISPS-90")
        .await
        .expect("lookup");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Salted Crisps");

    // Free text can resolve to many candidates
    let hits = services
        .items
        .lookup(session.id, "Crisps")
        .await
        .expect("lookup");
    assert_eq!(hits.len(), 2);

    let hits = services
        .items
        .lookup(session.id, "does-not-exist")
        .await
        .expect("lookup");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn item_listing_filters_by_zone_and_status() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "backroom",
        &[
            ("COLA-330", "Cola Can 330ml", None, "A1", 24),
            ("CRISPS-90", "Salted Crisps", None, "B2", 40),
            ("CRISPS-150", "Paprika Crisps", None, "B2", 12),
        ],
    )
    .await;
    let cola = services.items.lookup(session.id, "COLA-330").await.unwrap()[0].id;
    services
        .counts
        .submit_count(submit(session.id, cola, 24))
        .await
        .expect("submit");

    let (items, total) = services
        .items
        .list(
            session.id,
            ItemFilters {
                zone: Some("B2".to_string()),
                status: None,
            },
            1,
            50,
        )
        .await
        .expect("list");
    assert_eq!(total, 2);
    assert!(items.iter().all(|i| i.zone == "B2"));

    let (items, total) = services
        .items
        .list(
            session.id,
            ItemFilters {
                zone: None,
                status: Some(CountStatus::Pending),
            },
            1,
            50,
        )
        .await
        .expect("list");
    assert_eq!(total, 2);
    assert!(items.iter().all(|i| i.count_status() == CountStatus::Pending));
}

#[tokio::test]
async fn progress_breaks_down_by_zone() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "backroom",
        &[
            ("COLA-330", "Cola Can 330ml", None, "A1", 24),
            ("CRISPS-90", "Salted Crisps", None, "B2", 40),
            ("CRISPS-150", "Paprika Crisps", None, "B2", 12),
        ],
    )
    .await;
    let cola = services.items.lookup(session.id, "COLA-330").await.unwrap()[0].id;
    let crisps = services.items.lookup(session.id, "CRISPS-90").await.unwrap()[0].id;

    services
        .counts
        .submit_count(submit(session.id, cola, 24))
        .await
        .expect("submit");
    services
        .counts
        .submit_count(submit(session.id, crisps, 38))
        .await
        .expect("submit");

    let progress = services
        .sessions
        .progress(session.id)
        .await
        .expect("progress");

    assert_eq!(progress.total, 3);
    assert_eq!(progress.counted, 1);
    assert_eq!(progress.variance, 1);
    assert_eq!(progress.pending, 1);
    assert_eq!(progress.verified, 0);

    let a1 = progress.zones.iter().find(|z| z.zone == "A1").unwrap();
    assert_eq!(a1.total, 1);
    assert_eq!(a1.counted, 1);
    assert!(a1.is_complete());

    let b2 = progress.zones.iter().find(|z| z.zone == "B2").unwrap();
    assert_eq!(b2.total, 2);
    assert_eq!(b2.variance, 1);
    assert_eq!(b2.pending, 1);
    assert!(!b2.is_complete());
}

#[tokio::test]
async fn progress_for_unknown_session_is_not_found() {
    let (_db, services) = common::setup().await;
    let err = services.sessions.progress(Uuid::new_v4()).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn current_session_is_most_recently_started_active() {
    let (_db, services) = common::setup().await;
    let older = common::seed_session(
        &services,
        "monday recount",
        &[("COLA-330", "Cola Can 330ml", None, "A1", 24)],
    )
    .await;
    let newer = common::seed_session(
        &services,
        "tuesday recount",
        &[("CRISPS-90", "Salted Crisps", None, "B2", 40)],
    )
    .await;

    let current = services
        .sessions
        .current()
        .await
        .expect("query")
        .expect("active session");
    assert_eq!(current.id, newer.id);

    // Closing the newest falls back to the older active session
    services.sessions.close(newer.id).await.expect("close");
    let current = services
        .sessions
        .current()
        .await
        .expect("query")
        .expect("active session");
    assert_eq!(current.id, older.id);

    // Closing twice is an invalid state transition
    let err = services.sessions.close(newer.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    // With nothing active, requests without an explicit session are rejected
    services.sessions.close(older.id).await.expect("close");
    let err = services.sessions.require_session(None).await.unwrap_err();
    assert_matches!(err, ServiceError::Unauthorized(_));

    // An explicit session id still resolves after close
    let resolved = services
        .sessions
        .require_session(Some(older.id))
        .await
        .expect("resolve");
    assert_eq!(resolved.id, older.id);
}

#[tokio::test]
async fn activity_feed_records_joins_and_counts_newest_first() {
    let (_db, services) = common::setup().await;
    let session = common::seed_session(
        &services,
        "backroom",
        &[
            ("COLA-330", "Cola Can 330ml", None, "A1", 24),
            ("CRISPS-90", "Salted Crisps", None, "B2", 40),
        ],
    )
    .await;
    let cola = services.items.lookup(session.id, "COLA-330").await.unwrap()[0].id;

    let actor_name = services
        .operators
        .resolve_display_name("user_1")
        .await
        .expect("resolve");
    services
        .sessions
        .join(session.id, "user_1", actor_name)
        .await
        .expect("join");
    services
        .counts
        .submit_count(submit(session.id, cola, 24))
        .await
        .expect("submit");

    let (events, total) = services
        .activity
        .list(session.id, 1, 50)
        .await
        .expect("feed");
    // join + count + zone_complete (A1 has a single item)
    assert_eq!(total, 3);

    let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
    assert!(messages
        .iter()
        .any(|m| m.contains("operator-user_1 joined the count")));
    assert!(messages.iter().any(|m| m.contains("counted 24 for Cola Can 330ml")));
    assert!(messages.iter().any(|m| m.contains("completed zone A1")));

    // Newest first: the zone milestone landed after the join
    let join_pos = events
        .iter()
        .position(|e| e.message.contains("joined"))
        .unwrap();
    let zone_pos = events
        .iter()
        .position(|e| e.message.contains("completed zone"))
        .unwrap();
    assert!(zone_pos < join_pos);

    // Pagination slices the same ordering
    let (page_one, _) = services.activity.list(session.id, 1, 2).await.expect("feed");
    assert_eq!(page_one.len(), 2);
    let (page_two, _) = services.activity.list(session.id, 2, 2).await.expect("feed");
    assert_eq!(page_two.len(), 1);
}
