use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};

use super::{EmailError, EmailMessage, EmailSender};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounded retry with a fixed delay between attempts.
///
/// A message is attempted once immediately and then retried up to `max_retries` times, so a job makes at most
/// `max_retries + 1` delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, delay: DEFAULT_RETRY_DELAY }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Delivers `message`, retrying transient failures according to `policy`.
///
/// Permanent failures are returned straight away. Once the retries are used up, the last transient error is returned.
pub async fn deliver_with_retry<M>(mailer: &M, message: &EmailMessage, policy: &RetryPolicy) -> Result<(), EmailError>
where M: EmailSender + ?Sized {
    let mut attempt = 1;
    loop {
        match mailer.send_email(message.clone()).await {
            Ok(()) => {
                trace!("✉️ '{}' delivered on attempt {attempt}", message.subject);
                return Ok(());
            },
            Err(e @ EmailError::Permanent(_)) => return Err(e),
            Err(e) if attempt >= policy.max_attempts() => {
                debug!("✉️ Giving up on '{}' after {attempt} attempts", message.subject);
                return Err(e);
            },
            Err(e) => {
                warn!(
                    "✉️ Attempt {attempt} of {} to deliver '{}' failed. {e} Retrying in {:?}",
                    policy.max_attempts(),
                    message.subject,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            },
        }
    }
}
