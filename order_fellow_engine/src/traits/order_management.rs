use thiserror::Error;

use crate::{
    db_types::{DeletedOrder, FieldErrors, NewOrder, Order, OrderId, OrderUpdated, StatusHistoryEntry},
    lifecycle::{IllegalTransition, TransitionPolicy},
    order_objects::{ModifyOrder, OrderQueryFilter},
};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Invalid order data. {0}")]
    ValidationError(FieldErrors),
    #[error("{0}")]
    IllegalTransition(#[from] IllegalTransition),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() || db_err.is_check_violation() => {
                OrderStoreError::ValidationError(FieldErrors::single("non_field_errors", db_err.message()))
            },
            _ => OrderStoreError::DatabaseError(e.to_string()),
        }
    }
}

impl From<FieldErrors> for OrderStoreError {
    fn from(errors: FieldErrors) -> Self {
        OrderStoreError::ValidationError(errors)
    }
}

/// Storage behaviour for orders, their customer snapshots and their status history.
///
/// Every method that writes more than one row must do so atomically.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Stores a fresh customer record and a new order in `Pending` status with a random id.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// Returns the orders matching every criterion in `query`, oldest first.
    async fn search_orders(&self, query: &OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError>;

    /// Applies a partial update in a single transaction.
    ///
    /// The current status is read only after the order row has been locked for writing, so concurrent updates to the
    /// same order are serialized. If the update changes the tracking status, exactly one history entry is appended and
    /// the transition is reported in the result. Otherwise no history is written and `transition` is `None`.
    async fn update_order(
        &self,
        order_id: &OrderId,
        update: ModifyOrder,
        policy: TransitionPolicy,
    ) -> Result<OrderUpdated, OrderStoreError>;

    /// Deletes the order, its status history and its customer snapshot. The customer's email is captured before the
    /// rows are removed.
    async fn delete_order(&self, order_id: &OrderId) -> Result<DeletedOrder, OrderStoreError>;

    /// The status history of the order, oldest first.
    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistoryEntry>, OrderStoreError>;
}
