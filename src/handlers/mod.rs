pub mod activity;
pub mod counts;
pub mod items;
pub mod operators;
pub mod scans;
pub mod sessions;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    activity::ActivityService, counts::CountService, items::StockItemService,
    operators::OperatorService, sessions::SessionService,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub sessions: Arc<SessionService>,
    pub counts: Arc<CountService>,
    pub items: Arc<StockItemService>,
    pub activity: Arc<ActivityService>,
    pub operators: Arc<OperatorService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        let operators = Arc::new(OperatorService::new(db.clone()));
        let sessions = Arc::new(SessionService::new(db.clone(), event_sender.clone()));
        let counts = Arc::new(CountService::new(
            db.clone(),
            event_sender,
            operators.clone(),
        ));
        let items = Arc::new(StockItemService::new(db.clone()));
        let activity = Arc::new(ActivityService::new(db));

        Self {
            sessions,
            counts,
            items,
            activity,
            operators,
        }
    }
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Page size clamped to a sane upper bound.
    pub fn per_page(&self) -> u64 {
        self.per_page.clamp(1, 200)
    }

    pub fn page(&self) -> u64 {
        self.page.max(1)
    }
}
