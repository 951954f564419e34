//! Customer email templates.
use crate::db_types::{Order, OrderId};

pub const ORDER_RECEIVED_SUBJECT: &str = "Order Received";
pub const ORDER_STATUS_SUBJECT: &str = "Order Status";
pub const ORDER_DELETED_SUBJECT: &str = "Order Deleted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

pub fn order_received(order: &Order) -> EmailContent {
    EmailContent {
        subject: ORDER_RECEIVED_SUBJECT.to_string(),
        body: format!("Hello {}, Your order: {} is received successfully!", order.customer.name, order.id),
    }
}

pub fn order_status(order: &Order) -> EmailContent {
    EmailContent {
        subject: ORDER_STATUS_SUBJECT.to_string(),
        body: format!(
            "Hello {}, Your order with id: {} status is now {}",
            order.customer.name, order.id, order.tracking_status
        ),
    }
}

pub fn order_deleted(order_id: &OrderId) -> EmailContent {
    EmailContent { subject: ORDER_DELETED_SUBJECT.to_string(), body: format!("Order {order_id} has been deleted!") }
}
