use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle of a stock item within a count session.
///
/// `pending` iff no quantity was submitted yet; `counted` iff the count
/// matches the expected quantity; `variance` iff it does not; `verified`
/// is reachable only from `variance` through an explicit verification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CountStatus {
    Pending,
    Counted,
    Variance,
    Verified,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub sku: String,
    pub name: String,
    pub barcode: Option<String>,
    pub zone: String,
    pub category: Option<String>,
    pub warehouse: Option<String>,
    pub uom: Option<String>,
    pub supplier: Option<String>,
    pub expected_qty: i32,
    pub counted_qty: Option<i32>,
    pub variance: Option<i32>,
    pub status: String,
    pub last_counted_by: Option<String>,
    pub last_counted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
    /// Parsed lifecycle status; unknown strings degrade to `pending`.
    pub fn count_status(&self) -> CountStatus {
        self.status.parse().unwrap_or(CountStatus::Pending)
    }
}
