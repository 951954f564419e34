use std::sync::{Arc, Mutex};

use crate::notifications::{NotificationError, NotificationJob, NotificationQueue};

/// A [`NotificationQueue`] that never runs anything. It keeps every submitted job so tests can assert on them.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    jobs: Arc<Mutex<Vec<NotificationJob>>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.clear();
        }
    }
}

impl NotificationQueue for RecordingQueue {
    fn submit(&self, job: NotificationJob) -> Result<(), NotificationError> {
        let mut jobs = self.jobs.lock().map_err(|_| NotificationError::QueueClosed)?;
        jobs.push(job);
        Ok(())
    }
}
