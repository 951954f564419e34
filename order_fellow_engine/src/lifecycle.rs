//! Tracking status transition rules.
//!
//! An update that leaves the tracking status unchanged is always allowed, and is never an *effective* transition: it
//! produces no history entry and no customer notification. Whether a real change is allowed depends on the
//! [`TransitionPolicy`] the engine was configured with.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{StatusTransition, TrackingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransitionPolicy {
    /// Orders may only move forward through the lifecycle. Steps may be skipped.
    #[default]
    ForwardOnly,
    /// Any status may follow any other.
    Unrestricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("An order cannot move from {from} back to {to}")]
pub struct IllegalTransition {
    pub from: TrackingStatus,
    pub to: TrackingStatus,
}

impl TransitionPolicy {
    pub fn allows(&self, from: TrackingStatus, to: TrackingStatus) -> bool {
        match self {
            TransitionPolicy::ForwardOnly => to.rank() >= from.rank(),
            TransitionPolicy::Unrestricted => true,
        }
    }

    /// Decide what a request to move an order from `current` to `requested` amounts to.
    ///
    /// Returns `Ok(None)` for a no-op, `Ok(Some(transition))` for an effective change, and an error if the policy
    /// forbids the change.
    pub fn plan(
        &self,
        current: TrackingStatus,
        requested: TrackingStatus,
    ) -> Result<Option<StatusTransition>, IllegalTransition> {
        if current == requested {
            return Ok(None);
        }
        if self.allows(current, requested) {
            Ok(Some(StatusTransition { from: current, to: requested }))
        } else {
            Err(IllegalTransition { from: current, to: requested })
        }
    }
}
