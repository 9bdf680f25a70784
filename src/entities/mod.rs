pub mod activity_events;
pub mod count_sessions;
pub mod operators;
pub mod stock_items;
