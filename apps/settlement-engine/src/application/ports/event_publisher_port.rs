//! Event Publisher Port (Driven Port)
//!
//! Interface for publishing option domain events to external systems.

use async_trait::async_trait;

use crate::domain::option_lifecycle::OptionEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Connection error.
    #[error("Event publish connection error: {message}")]
    ConnectionError { message: String },

    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError { message: String },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed { message: String },
}

/// Port for publishing domain events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish option events.
    async fn publish_option_events(&self, events: Vec<OptionEvent>)
    -> Result<(), EventPublishError>;

    /// Publish a single option event.
    async fn publish_option_event(&self, event: OptionEvent) -> Result<(), EventPublishError> {
        self.publish_option_events(vec![event]).await
    }
}

/// No-op event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish_option_events(
        &self,
        _events: Vec<OptionEvent>,
    ) -> Result<(), EventPublishError> {
        Ok(())
    }
}

/// Publisher that writes each event to the log as JSON.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisherPort for LoggingEventPublisher {
    async fn publish_option_events(
        &self,
        events: Vec<OptionEvent>,
    ) -> Result<(), EventPublishError> {
        for event in events {
            let payload = serde_json::to_string(&event).map_err(|e| {
                EventPublishError::SerializationError {
                    message: e.to_string(),
                }
            })?;
            tracing::info!(
                event_type = event.event_type(),
                option_id = %event.option_id(),
                payload = %payload,
                "Option event"
            );
        }
        Ok(())
    }
}
