use async_trait::async_trait;
use surgefare_shared::DomainEvent;

use crate::CoreResult;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> CoreResult<()>;
}

/// Writes events to the tracing log. Used when no broker is configured.
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> CoreResult<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| crate::CoreError::InternalError(e.to_string()))?;
        tracing::info!(topic = event.topic(), key = event.key(), "{}", payload);
        Ok(())
    }
}

/// Publish without letting a broker outage fail the caller.
pub async fn publish_best_effort(publisher: &dyn EventPublisher, event: DomainEvent) {
    if let Err(e) = publisher.publish(&event).await {
        tracing::warn!("Failed to publish {} event for {}: {}", event.topic(), event.key(), e);
    }
}
