//! In-memory notification queue
//!
//! Jobs are pushed onto an unbounded channel, so submitting never waits. A single consumer loop pulls jobs off the
//! channel and spawns a task for each one into a `JoinSet`, which means a job that is sleeping between retries only
//! holds up itself.
//!
//! There is no persistence. Jobs are lost if the process exits before [`JobQueue::run`] has drained them.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc,
    },
};

use log::*;
use serde::Serialize;
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinSet},
};

use super::{JobOutcome, NotificationError, NotificationJob, NotificationQueue};

pub type JobHandler = Arc<dyn Fn(NotificationJob) -> Pin<Box<dyn Future<Output = JobOutcome> + Send>> + Send + Sync>;

/// Running totals for a [`JobQueue`].
#[derive(Debug, Default)]
pub struct JobStats {
    submitted: AtomicU64,
    sent: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicI64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStatsSnapshot {
    pub submitted: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
    pub in_flight: i64,
}

impl JobStats {
    pub fn snapshot(&self) -> JobStatsSnapshot {
        JobStatsSnapshot {
            submitted: self.submitted.load(Ordering::SeqCst),
            sent: self.sent.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
        }
    }

    fn record(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Sent => &self.sent,
            JobOutcome::Skipped => &self.skipped,
            JobOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Records the result of a job task. A task that panicked or was cancelled counts as a failure.
    fn finish(&self, result: Result<JobOutcome, JoinError>) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let outcome = result.unwrap_or_else(|e| {
            error!("📬️ A notification job did not run to completion. {e}");
            JobOutcome::Failed
        });
        trace!("📬️ Job finished: {outcome:?}");
        self.record(outcome);
    }
}

pub struct JobQueue {
    listener: mpsc::UnboundedReceiver<NotificationJob>,
    sender: mpsc::UnboundedSender<NotificationJob>,
    handler: JobHandler,
    stats: Arc<JobStats>,
}

impl JobQueue {
    pub fn new(handler: JobHandler) -> Self {
        let (sender, listener) = mpsc::unbounded_channel();
        Self { listener, sender, handler, stats: Arc::new(JobStats::default()) }
    }

    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter { sender: self.sender.clone(), stats: Arc::clone(&self.stats) }
    }

    pub fn stats(&self) -> Arc<JobStats> {
        Arc::clone(&self.stats)
    }

    /// Runs until every [`JobSubmitter`] has been dropped, then waits for in-flight jobs to finish.
    pub async fn run(mut self) {
        debug!("📬️ Starting notification job queue");
        // Drop our own sender so that the loop ends once the last submitter goes away
        drop(self.sender);
        let mut running = JoinSet::new();
        loop {
            let step = tokio::select! {
                job = self.listener.recv() => QueueStep::Received(job),
                Some(result) = running.join_next() => QueueStep::Finished(result),
            };
            match step {
                QueueStep::Received(Some(job)) => {
                    trace!("📬️ Running job {job}");
                    let handler = Arc::clone(&self.handler);
                    self.stats.in_flight.fetch_add(1, Ordering::SeqCst);
                    running.spawn(async move { (handler)(job).await });
                },
                QueueStep::Received(None) => break,
                QueueStep::Finished(result) => self.stats.finish(result),
            }
        }
        if !running.is_empty() {
            debug!("📬️ Waiting for {} notification jobs to complete", running.len());
        }
        while let Some(result) = running.join_next().await {
            self.stats.finish(result);
        }
        let totals = self.stats.snapshot();
        info!(
            "📬️ Notification job queue has shut down. {} submitted, {} sent, {} skipped, {} failed",
            totals.submitted, totals.sent, totals.skipped, totals.failed
        );
    }
}

enum QueueStep {
    Received(Option<NotificationJob>),
    Finished(Result<JobOutcome, JoinError>),
}

/// The submitting half of a [`JobQueue`]. Cheap to clone.
#[derive(Clone)]
pub struct JobSubmitter {
    sender: mpsc::UnboundedSender<NotificationJob>,
    stats: Arc<JobStats>,
}

impl NotificationQueue for JobSubmitter {
    fn submit(&self, job: NotificationJob) -> Result<(), NotificationError> {
        trace!("📬️ Queueing job {job}");
        self.sender.send(job).map_err(|e| {
            error!("📬️ Could not queue {}. {e}", e.0);
            NotificationError::QueueClosed
        })?;
        self.stats.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
