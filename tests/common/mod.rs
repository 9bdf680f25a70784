use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use stocktake_api::{
    db::DbPool,
    entities::count_sessions,
    events::{process_events, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    services::items::CatalogItem,
};
use tokio::sync::mpsc;

/// One catalog line for seeding: (sku, name, barcode, zone, expected_qty).
pub type SeedLine = (&'static str, &'static str, Option<&'static str>, &'static str, i32);

/// Connects an in-memory SQLite database and runs migrations. A single
/// pooled connection keeps every test statement on the same in-memory
/// database.
pub async fn setup() -> (Arc<DbPool>, AppServices) {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1);

    let db = Database::connect(options).await.expect("db connect");
    Migrator::up(&db, None).await.expect("migrations");
    let db = Arc::new(db);

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx));
    let services = AppServices::new(db.clone(), EventSender::new(tx));

    (db, services)
}

/// Starts a session seeded with the given catalog lines.
pub async fn seed_session(
    services: &AppServices,
    name: &str,
    lines: &[SeedLine],
) -> count_sessions::Model {
    let catalog: Vec<CatalogItem> = lines
        .iter()
        .map(|(sku, item_name, barcode, zone, expected_qty)| CatalogItem {
            sku: sku.to_string(),
            name: item_name.to_string(),
            barcode: barcode.map(str::to_string),
            zone: zone.to_string(),
            category: None,
            warehouse: None,
            uom: None,
            supplier: None,
            expected_qty: *expected_qty,
        })
        .collect();

    let (session, _) = services
        .sessions
        .start_session(name.to_string(), Some("test-rig".to_string()), catalog)
        .await
        .expect("session start");

    session
}
