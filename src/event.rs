//! Work item status notifications pushed to browser listeners.
//!
//! Publishing is fire-and-forget: nobody acknowledges an event and having
//! no subscribers is not an error. The WebSocket endpoint subscribes one
//! receiver per connection.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Topic name listeners key on.
pub const WORKITEM_TOPIC: &str = "Workitem-Notification";

const DEFAULT_CAPACITY: usize = 64;

/// Status reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkitemStatus {
    /// Part of the listener contract; this service reports `Completed`
    /// instead and never sends it.
    Success,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for WorkitemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkitemStatus::Success => "Success",
            WorkitemStatus::Completed => "Completed",
            WorkitemStatus::Failed => "Failed",
            WorkitemStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

/// One status notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkitemEvent {
    /// Absent when a submission failed before an id was assigned.
    pub workitem_id: Option<String>,
    pub status: WorkitemStatus,
    /// Download URL for artifact-producing jobs.
    pub extra_info: Option<String>,
}

impl WorkitemEvent {
    pub fn new(workitem_id: impl Into<String>, status: WorkitemStatus) -> Self {
        Self {
            workitem_id: Some(workitem_id.into()),
            status,
            extra_info: None,
        }
    }

    /// A failure not attributable to a tracked work item.
    pub fn submission_failed() -> Self {
        Self {
            workitem_id: None,
            status: WorkitemStatus::Failed,
            extra_info: None,
        }
    }

    pub fn with_extra_info(mut self, extra_info: impl Into<String>) -> Self {
        self.extra_info = Some(extra_info.into());
        self
    }
}

/// Envelope written to each WebSocket listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMessage {
    pub topic: String,
    pub data: WorkitemEvent,
}

impl From<WorkitemEvent> for TopicMessage {
    fn from(data: WorkitemEvent) -> Self {
        Self {
            topic: WORKITEM_TOPIC.to_string(),
            data,
        }
    }
}

/// Broadcast channel for [`WorkitemEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WorkitemEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber.
    pub fn publish(&self, event: WorkitemEvent) {
        tracing::info!(
            workitem_id = event.workitem_id.as_deref().unwrap_or("-"),
            status = %event.status,
            "workitem notification"
        );
        // Err only means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkitemEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
