use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after their transactions commit.
/// Consumers are in-process only; delivery is best effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderPlaced {
        order_id: Uuid,
        user_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Inventory events
    StockAdjusted {
        product_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
        reason: String,
    },

    // Cart events
    CartItemAdded {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartCleared(Uuid),

    // Discount events
    DiscountApplied {
        code_id: Uuid,
        order_id: Uuid,
    },

    // Account events
    UserRegistered(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Events are advisory; a committed transaction must not be reported as
    /// failed because a consumer went away.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropped event: {}", e);
        }
    }
}

/// Drains the event channel and logs each event. Runs for the lifetime of
/// the process; ends when all senders are dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderPlaced { order_id, user_id } => {
                info!(order_id = %order_id, user_id = %user_id, "order placed");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, from = %old_status, to = %new_status, "order status changed");
            }
            Event::StockAdjusted {
                product_id,
                old_quantity,
                new_quantity,
                reason,
            } => {
                info!(product_id = %product_id, from = old_quantity, to = new_quantity, reason = %reason, "stock adjusted");
            }
            other => {
                info!(event = ?other, "event");
            }
        }
    }
    info!("Event channel closed; processor exiting");
}
