//! Event bus for chargeboard using tokio::broadcast
//!
//! Carries the refresh lifecycle to subscribers (SSE stream, CLI).

use crate::source::Collection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Events emitted by the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataEvent {
    /// A refresh pass began
    RefreshStarted,
    /// A collection snapshot was swapped in
    CollectionUpdated { collection: Collection, records: usize },
    /// A collection kept its previous snapshot
    CollectionFailed {
        collection: Collection,
        message: String,
    },
    /// Every collection was attempted
    RefreshCompleted {
        loaded: usize,
        failed: usize,
        at: DateTime<Utc>,
    },
}

impl DataEvent {
    /// Short name, used as the SSE event field
    pub fn name(&self) -> &'static str {
        match self {
            DataEvent::RefreshStarted => "refresh_started",
            DataEvent::CollectionUpdated { .. } => "collection_updated",
            DataEvent::CollectionFailed { .. } => "collection_failed",
            DataEvent::RefreshCompleted { .. } => "refresh_completed",
        }
    }
}

/// Event bus for broadcasting data events
///
/// Uses tokio::broadcast for multi-consumer support.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DataEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create with default capacity (64 events)
    pub fn default_capacity() -> Self {
        Self::new(64)
    }

    pub fn publish(&self, event: DataEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}
