//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
    prefix: String,
}

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }

    /// Publisher that drops every event.
    pub fn disabled() -> Self { Self::new(None, "opensase.network") }

    pub async fn connect(url: Option<&str>, prefix: &str) -> Self {
        let client = match url {
            Some(url) => match async_nats::connect(url).await {
                Ok(client) => {
                    tracing::info!(%url, "connected to NATS");
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "NATS unavailable, domain events will not be published");
                    None
                }
            },
            None => None,
        };
        Self::new(client, prefix)
    }

    /// Publish events best-effort; failures are logged and never surface to callers.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        let Some(client) = &self.client else { return };
        for event in events {
            let subject = format!("{}.{}", self.prefix, event.subject());
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => { tracing::error!(%subject, error = %e, "failed to encode domain event"); continue; }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "failed to publish domain event");
            }
        }
    }
}
