use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Kind of an activity ledger entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    Count,
    Variance,
    Verify,
    Join,
    ZoneComplete,
}

/// Append-only ledger row. Rows are never updated or deleted.
///
/// `dedup_key` is populated only for `zone_complete` rows; a unique index
/// on `(session_id, dedup_key)` closes the duplicate-announcement race at
/// the storage layer (NULL keys never collide).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub event_type: String,
    pub message: String,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub zone: Option<String>,
    pub item_id: Option<Uuid>,
    pub dedup_key: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::count_sessions::Entity",
        from = "Column::SessionId",
        to = "super::count_sessions::Column::Id"
    )]
    Session,
}

impl Related<super::count_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn activity_type(&self) -> Option<ActivityType> {
        self.event_type.parse().ok()
    }
}

/// Dedup key recorded on `zone_complete` rows for a given zone.
pub fn zone_complete_dedup_key(zone: &str) -> String {
    format!("zone_complete:{}", zone)
}
