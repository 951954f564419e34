use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderUpdated, StatusHistoryEntry},
    lifecycle::TransitionPolicy,
    notifications::{NotificationJob, NotificationQueue},
    order_objects::{ModifyOrder, OrderQueryFilter},
    traits::{OrderManagement, OrderStoreError},
};

/// `OrderFlowApi` is the primary API for handling incoming orders, their tracking status changes and deletions.
///
/// Every change that the customer should hear about results in exactly one [`NotificationJob`] being submitted to the
/// queue, and only after the change has been committed.
pub struct OrderFlowApi<B> {
    db: B,
    queue: Arc<dyn NotificationQueue>,
    policy: TransitionPolicy,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.policy)
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), queue: Arc::clone(&self.queue), policy: self.policy }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, queue: Arc<dyn NotificationQueue>, policy: TransitionPolicy) -> Self {
        Self { db, queue, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Hands the job to the queue. Jobs are fire-and-forget, so a closed queue is logged and otherwise ignored.
    fn notify(&self, job: NotificationJob) {
        let description = job.to_string();
        match self.queue.submit(job) {
            Ok(()) => trace!("🔄️📦️ {description} submitted"),
            Err(e) => error!("🔄️📦️ {description} could not be submitted. {e}"),
        }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Stores a brand-new order in `Pending` status and submits an order confirmation for the customer.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let order = self.db.insert_order(order).await?;
        info!("🔄️📦️ Order [{}] received for {}", order.id, order.customer.email);
        self.notify(NotificationJob::OrderReceivedConfirmation { order_id: order.id });
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderStoreError> {
        self.db.fetch_order(order_id).await?.ok_or(OrderStoreError::OrderNotFound(*order_id))
    }

    pub async fn search_orders(&self, query: &OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError> {
        trace!("🔄️📦️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    /// Applies a partial update to the order.
    ///
    /// If the tracking status actually changed, one status history entry has been written and one status update
    /// notification is submitted. Setting the status to the value it already has is a silent no-op.
    pub async fn update_order(&self, order_id: &OrderId, update: ModifyOrder) -> Result<OrderUpdated, OrderStoreError> {
        let result = self.db.update_order(order_id, update, self.policy).await?;
        match result.transition {
            Some(t) => {
                info!("🔄️📦️ Order [{order_id}] tracking status changed from {} to {}", t.from, t.to);
                self.notify(NotificationJob::OrderStatusUpdate { order_id: *order_id });
            },
            None => debug!("🔄️📦️ Order [{order_id}] updated without a status change"),
        }
        Ok(result)
    }

    /// Deletes the order and submits a deletion notice addressed to the email the customer had at deletion time.
    pub async fn delete_order(&self, order_id: &OrderId) -> Result<(), OrderStoreError> {
        let deleted = self.db.delete_order(order_id).await?;
        info!("🔄️📦️ Order [{order_id}] deleted");
        self.notify(NotificationJob::OrderDeletedNotice {
            order_id: deleted.order_id,
            customer_email: deleted.customer_email,
        });
        Ok(())
    }

    pub async fn status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistoryEntry>, OrderStoreError> {
        self.db.fetch_status_history(order_id).await
    }
}
