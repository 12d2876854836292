//! Pluggable delivery of status change events to external systems.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::event::StatusChangedEvent;

/// Error returned when an event could not be delivered.
#[derive(Debug, Clone, Error)]
#[error("Publish error: {0}")]
pub struct PublishError(pub String);

/// Delivers status change events to an external channel (message broker,
/// push gateway). Implementations must be thread-safe.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &StatusChangedEvent) -> Result<(), PublishError>;
}

/// Publisher that only logs events. Default when no broker is configured.
#[derive(Clone, Default)]
pub struct LoggingPublisher;

impl LoggingPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(&self, event: &StatusChangedEvent) -> Result<(), PublishError> {
        tracing::info!(
            reservation_id = %event.reservation_id,
            new_state = %event.new_state,
            recipient = %event.recipient(),
            "reservation status changed"
        );
        Ok(())
    }
}

/// Publisher that records every event for test assertions.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<RwLock<Vec<StatusChangedEvent>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all published events, in publish order.
    pub async fn published(&self) -> Vec<StatusChangedEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &StatusChangedEvent) -> Result<(), PublishError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
