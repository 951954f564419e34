//! # Customer notifications
//!
//! Order changes are reported to customers by email. The work is split into
//!
//! * [`NotificationJob`]s, small values describing which email to send. Jobs carry ids, not order snapshots. Status
//!   updates are rendered from the order as it is when the job runs.
//! * A [`NotificationQueue`] that accepts jobs without blocking the caller. [`JobQueue`] is the in-memory backend that
//!   runs every job on its own task.
//! * The [`NotificationDispatcher`], which loads what a job needs, renders the email and delivers it with bounded
//!   retries through an [`EmailSender`].
mod channel;
mod dispatcher;
mod jobs;
mod mailer;
mod retry;
pub mod templates;

pub use channel::{JobHandler, JobQueue, JobStats, JobStatsSnapshot, JobSubmitter};
pub use dispatcher::NotificationDispatcher;
pub use jobs::{JobOutcome, NotificationJob};
pub use mailer::{EmailError, EmailMessage, EmailSender, LogMailer, ResendMailer};
pub use retry::{deliver_with_retry, RetryPolicy};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("The notification queue has shut down")]
    QueueClosed,
}

/// Accepts notification jobs for asynchronous execution.
///
/// `submit` must return promptly. It never waits for the job to run.
pub trait NotificationQueue: Send + Sync {
    fn submit(&self, job: NotificationJob) -> Result<(), NotificationError>;
}
