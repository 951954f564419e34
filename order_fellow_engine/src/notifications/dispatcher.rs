use std::sync::Arc;

use log::*;

use super::{
    deliver_with_retry,
    templates::{self, EmailContent},
    EmailMessage,
    EmailSender,
    JobOutcome,
    NotificationJob,
    RetryPolicy,
};
use crate::{
    db_types::{Order, OrderId},
    traits::OrderManagement,
};

/// Executes [`NotificationJob`]s.
///
/// Failures never escape `execute`. They are logged and reported through the returned [`JobOutcome`].
pub struct NotificationDispatcher<B> {
    db: B,
    mailer: Arc<dyn EmailSender>,
    from_address: String,
    retry: RetryPolicy,
}

impl<B> NotificationDispatcher<B> {
    pub fn new(db: B, mailer: Arc<dyn EmailSender>, from_address: String, retry: RetryPolicy) -> Self {
        Self { db, mailer, from_address, retry }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl<B> NotificationDispatcher<B>
where B: OrderManagement
{
    pub async fn execute(&self, job: NotificationJob) -> JobOutcome {
        let (content, recipient) = match &job {
            NotificationJob::OrderReceivedConfirmation { order_id } => match self.load_order(order_id).await {
                Ok(Some(order)) => (templates::order_received(&order), order.customer.email),
                Ok(None) => return JobOutcome::Skipped,
                Err(outcome) => return outcome,
            },
            NotificationJob::OrderStatusUpdate { order_id } => match self.load_order(order_id).await {
                Ok(Some(order)) => (templates::order_status(&order), order.customer.email),
                Ok(None) => return JobOutcome::Skipped,
                Err(outcome) => return outcome,
            },
            NotificationJob::OrderDeletedNotice { order_id, customer_email } => {
                (templates::order_deleted(order_id), customer_email.clone())
            },
        };
        self.deliver(&job, content, recipient).await
    }

    /// `Ok(None)` means the order has gone away and the job has nothing to do.
    async fn load_order(&self, order_id: &OrderId) -> Result<Option<Order>, JobOutcome> {
        match self.db.fetch_order(order_id).await {
            Ok(Some(order)) => Ok(Some(order)),
            Ok(None) => {
                info!("📬️ Order {order_id} no longer exists. Nothing to send.");
                Ok(None)
            },
            Err(e) => {
                error!("📬️ Could not load order {order_id} for notification. {e}");
                Err(JobOutcome::Failed)
            },
        }
    }

    async fn deliver(&self, job: &NotificationJob, content: EmailContent, recipient: String) -> JobOutcome {
        let message = EmailMessage {
            subject: content.subject,
            body: content.body,
            from: self.from_address.clone(),
            to: vec![recipient],
        };
        match deliver_with_retry(self.mailer.as_ref(), &message, &self.retry).await {
            Ok(()) => {
                debug!("📬️ {job} delivered to {}", message.to.join(", "));
                JobOutcome::Sent
            },
            Err(e) => {
                error!("📬️ {job} failed permanently. {e}");
                JobOutcome::Failed
            },
        }
    }
}
