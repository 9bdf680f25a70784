use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_count_sessions_table::Migration),
            Box::new(m20240101_000002_create_stock_items_table::Migration),
            Box::new(m20240101_000003_create_activity_events_table::Migration),
            Box::new(m20240101_000004_create_operators_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_count_sessions_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_count_sessions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CountSessions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CountSessions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CountSessions::Name).string().not_null())
                        .col(ColumnDef::new(CountSessions::Status).string().not_null())
                        .col(ColumnDef::new(CountSessions::StartedBy).string().null())
                        .col(
                            ColumnDef::new(CountSessions::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountSessions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountSessions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // "Current session" resolution orders active sessions by start time
            manager
                .create_index(
                    Index::create()
                        .name("idx_count_sessions_status_started_at")
                        .table(CountSessions::Table)
                        .col(CountSessions::Status)
                        .col(CountSessions::StartedAt)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CountSessions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CountSessions {
        Table,
        Id,
        Name,
        Status,
        StartedBy,
        StartedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_stock_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockItems::SessionId).uuid().not_null())
                        .col(ColumnDef::new(StockItems::Sku).string().not_null())
                        .col(ColumnDef::new(StockItems::Name).string().not_null())
                        .col(ColumnDef::new(StockItems::Barcode).string().null())
                        .col(ColumnDef::new(StockItems::Zone).string().not_null())
                        .col(ColumnDef::new(StockItems::Category).string().null())
                        .col(ColumnDef::new(StockItems::Warehouse).string().null())
                        .col(ColumnDef::new(StockItems::Uom).string().null())
                        .col(ColumnDef::new(StockItems::Supplier).string().null())
                        .col(
                            ColumnDef::new(StockItems::ExpectedQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockItems::CountedQty).integer().null())
                        .col(ColumnDef::new(StockItems::Variance).integer().null())
                        .col(ColumnDef::new(StockItems::Status).string().not_null())
                        .col(ColumnDef::new(StockItems::LastCountedBy).string().null())
                        .col(
                            ColumnDef::new(StockItems::LastCountedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_items_session")
                                .from(StockItems::Table, StockItems::SessionId)
                                .to(CountSessions::Table, CountSessions::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_items_session_sku")
                        .table(StockItems::Table)
                        .col(StockItems::SessionId)
                        .col(StockItems::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Zone aggregates run on every submission
            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_items_session_zone")
                        .table(StockItems::Table)
                        .col(StockItems::SessionId)
                        .col(StockItems::Zone)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_items_barcode")
                        .table(StockItems::Table)
                        .col(StockItems::Barcode)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockItems {
        Table,
        Id,
        SessionId,
        Sku,
        Name,
        Barcode,
        Zone,
        Category,
        Warehouse,
        Uom,
        Supplier,
        ExpectedQty,
        CountedQty,
        Variance,
        Status,
        LastCountedBy,
        LastCountedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CountSessions {
        Table,
        Id,
    }
}

mod m20240101_000003_create_activity_events_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_activity_events_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ActivityEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ActivityEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ActivityEvents::SessionId).uuid().not_null())
                        .col(
                            ColumnDef::new(ActivityEvents::EventType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ActivityEvents::Message).string().not_null())
                        .col(ColumnDef::new(ActivityEvents::ActorId).string().null())
                        .col(ColumnDef::new(ActivityEvents::ActorName).string().null())
                        .col(ColumnDef::new(ActivityEvents::Zone).string().null())
                        .col(ColumnDef::new(ActivityEvents::ItemId).uuid().null())
                        .col(ColumnDef::new(ActivityEvents::DedupKey).string().null())
                        .col(
                            ColumnDef::new(ActivityEvents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Feed reads are session-scoped and creation-ordered
            manager
                .create_index(
                    Index::create()
                        .name("idx_activity_events_session_created_at")
                        .table(ActivityEvents::Table)
                        .col(ActivityEvents::SessionId)
                        .col(ActivityEvents::CreatedAt)
                        .to_owned(),
                )
                .await?;

            // At most one zone_complete row per (session, zone): dedup_key is
            // NULL on every other event type, and NULL keys never collide.
            manager
                .create_index(
                    Index::create()
                        .name("idx_activity_events_session_dedup_key")
                        .table(ActivityEvents::Table)
                        .col(ActivityEvents::SessionId)
                        .col(ActivityEvents::DedupKey)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ActivityEvents::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ActivityEvents {
        Table,
        Id,
        SessionId,
        EventType,
        Message,
        ActorId,
        ActorName,
        Zone,
        ItemId,
        DedupKey,
        CreatedAt,
    }
}

mod m20240101_000004_create_operators_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_operators_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Operators::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Operators::Id)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Operators::FirstName).string().null())
                        .col(ColumnDef::new(Operators::LastName).string().null())
                        .col(
                            ColumnDef::new(Operators::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Operators::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Operators {
        Table,
        Id,
        FirstName,
        LastName,
        CreatedAt,
    }
}
