use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Handle used by services to publish in-process events. The persisted
/// activity ledger is written inside the same transaction as the state
/// change; this bus only fans changes out to in-process consumers
/// (dashboard push, log tail) after commit.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The events a count session can produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Session lifecycle
    SessionStarted {
        session_id: Uuid,
        item_count: u64,
    },
    OperatorJoined {
        session_id: Uuid,
        actor_id: String,
    },

    // Count submissions
    CountSubmitted {
        session_id: Uuid,
        item_id: Uuid,
        counted_qty: i32,
    },
    VarianceFlagged {
        session_id: Uuid,
        item_id: Uuid,
        variance: i32,
    },
    VarianceVerified {
        session_id: Uuid,
        item_id: Uuid,
    },

    // Zone milestones
    ZoneCompleted {
        session_id: Uuid,
        zone: String,
    },
}

// Processes incoming events. Spawned once at startup; lives for the life
// of the process.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::SessionStarted {
                session_id,
                item_count,
            } => {
                info!(%session_id, item_count, "count session started");
            }
            Event::OperatorJoined {
                session_id,
                actor_id,
            } => {
                info!(%session_id, %actor_id, "operator joined session");
            }
            Event::CountSubmitted {
                session_id,
                item_id,
                counted_qty,
            } => {
                info!(%session_id, %item_id, counted_qty, "count submitted");
            }
            Event::VarianceFlagged {
                session_id,
                item_id,
                variance,
            } => {
                // Large discrepancies usually mean a mislabeled pallet or a
                // wrong-zone scan; surface them louder than routine counts.
                if variance.abs() >= 50 {
                    warn!(%session_id, %item_id, variance, "large variance flagged");
                } else {
                    info!(%session_id, %item_id, variance, "variance flagged");
                }
            }
            Event::VarianceVerified {
                session_id,
                item_id,
            } => {
                info!(%session_id, %item_id, "variance verified");
            }
            Event::ZoneCompleted { session_id, zone } => {
                info!(%session_id, %zone, "zone fully reconciled");
            }
        }
    }

    warn!("Event processing loop has ended");
}
