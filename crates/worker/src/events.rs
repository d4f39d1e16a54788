//! Completion notifications for detached render jobs.
//!
//! The filesystem stays the contract for outside observers; this channel is
//! for in-process listeners (shutdown bookkeeping, tests).

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use trackreel_core::types::{Timestamp, UserId};

const DEFAULT_CAPACITY: usize = 256;

/// How a render job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum JobOutcome {
    /// The video was moved next to the working directory.
    Succeeded,
    /// The error marker was deposited instead.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub user_id: UserId,
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub finished_at: Timestamp,
}

impl JobEvent {
    pub fn new(user_id: UserId, outcome: JobOutcome) -> Self {
        Self {
            user_id,
            outcome,
            finished_at: Utc::now(),
        }
    }
}

/// Fan-out of [`JobEvent`]s.
pub struct JobEvents {
    sender: broadcast::Sender<JobEvent>,
}

impl JobEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Events published with no subscriber are dropped.
    pub fn publish(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
