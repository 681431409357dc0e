//! Event types and EventBus for catalog services
//!
//! Events are broadcast to in-process subscribers (SSE clients). Delivery is
//! best-effort: emitting with no subscribers is not an error for callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::{FeedbackStatus, FeedbackType};

/// Catalog event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// A contributor submitted a new proposal
    FeedbackSubmitted {
        feedback_id: Uuid,
        artifact_id: Uuid,
        feedback_type: FeedbackType,
        timestamp: DateTime<Utc>,
    },

    /// A curator decided a proposal
    FeedbackReviewed {
        feedback_id: Uuid,
        artifact_id: Uuid,
        status: FeedbackStatus,
        /// True when the approval patched the artifact
        artifact_updated: bool,
        timestamp: DateTime<Utc>,
    },
}

impl CatalogEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::FeedbackSubmitted { .. } => "FeedbackSubmitted",
            CatalogEvent::FeedbackReviewed { .. } => "FeedbackReviewed",
        }
    }
}

/// Broadcast channel wrapper shared through application state
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit without caring whether anyone is listening
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(reached) => debug!("Event {} delivered to {} subscribers", event_type, reached),
            Err(_) => debug!("Event {} dropped, no subscribers", event_type),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
