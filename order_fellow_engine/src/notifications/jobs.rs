use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationJob {
    /// Tell the customer that their order has been received.
    OrderReceivedConfirmation { order_id: OrderId },
    /// Tell the customer the order's current tracking status.
    OrderStatusUpdate { order_id: OrderId },
    /// The order is gone by the time this runs, so the recipient travels with the job.
    OrderDeletedNotice { order_id: OrderId, customer_email: String },
}

impl NotificationJob {
    pub fn order_id(&self) -> &OrderId {
        match self {
            NotificationJob::OrderReceivedConfirmation { order_id } => order_id,
            NotificationJob::OrderStatusUpdate { order_id } => order_id,
            NotificationJob::OrderDeletedNotice { order_id, .. } => order_id,
        }
    }
}

impl Display for NotificationJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationJob::OrderReceivedConfirmation { order_id } => write!(f, "OrderReceivedConfirmation({order_id})"),
            NotificationJob::OrderStatusUpdate { order_id } => write!(f, "OrderStatusUpdate({order_id})"),
            NotificationJob::OrderDeletedNotice { order_id, .. } => write!(f, "OrderDeletedNotice({order_id})"),
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobOutcome {
    /// The email was accepted by the transport.
    Sent,
    /// There was nothing to send, e.g. the order no longer exists.
    Skipped,
    /// Delivery failed permanently or retries were exhausted.
    Failed,
}
