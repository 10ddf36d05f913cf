use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use forgecart_events::{Event, EventBus, EventEnvelope, JsonEnvelope, tenant_group};
use forgecart_sales::OrderEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("failed to serialize notification: {0}")]
    Serialize(String),

    #[error("notification channel failed: {0}")]
    Channel(String),
}

/// A message addressed to one tenant group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub group: String,
    pub envelope: JsonEnvelope,
}

/// Fire-and-forget delivery to a named group.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, group: &str, envelope: &JsonEnvelope) -> Result<(), NotifyError>;
}

/// Channel backed by an in-process [`EventBus`].
#[derive(Debug, Clone)]
pub struct BusNotificationChannel<B> {
    bus: B,
}

impl<B> BusNotificationChannel<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<B> NotificationChannel for BusNotificationChannel<B>
where
    B: EventBus<Notification>,
{
    async fn publish(&self, group: &str, envelope: &JsonEnvelope) -> Result<(), NotifyError> {
        self.bus
            .publish(Notification {
                group: group.to_string(),
                envelope: envelope.clone(),
            })
            .map_err(|e| NotifyError::Channel(format!("{e:?}")))
    }
}

/// Redis pub/sub channel; the group name is the Redis channel.
///
/// Pub/sub is not durable: subscribers that are offline miss messages.
#[cfg(feature = "redis")]
#[derive(Debug, Clone)]
pub struct RedisPubSubChannel {
    client: redis::Client,
}

#[cfg(feature = "redis")]
impl RedisPubSubChannel {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, NotifyError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(|e| NotifyError::Channel(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl NotificationChannel for RedisPubSubChannel {
    async fn publish(&self, group: &str, envelope: &JsonEnvelope) -> Result<(), NotifyError> {
        use redis::Commands;

        let payload = serde_json::to_string(envelope).map_err(|e| NotifyError::Serialize(e.to_string()))?;
        let client = self.client.clone();
        let channel = group.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = client.get_connection().map_err(|e| NotifyError::Channel(e.to_string()))?;
            let _: i64 = conn
                .publish(&channel, payload)
                .map_err(|e| NotifyError::Channel(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| NotifyError::Channel(e.to_string()))?
    }
}

/// Publishes committed order events to the tenant's group.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self { channel }
    }

    /// Best-effort: failures are logged, never returned.
    #[instrument(skip(self, event), fields(event_type = event.event_type(), order_id = %event.order_id()))]
    pub async fn dispatch(&self, event: &OrderEvent) {
        let tenant_id = event.tenant_id();
        let envelope = match EventEnvelope::from_event(tenant_id, *event.order_id().as_uuid(), "sales.order", event) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "failed to serialize order notification");
                return;
            }
        };

        let group = tenant_group(tenant_id);
        match self.channel.publish(&group, &envelope).await {
            Ok(()) => debug!(group = %group, "order notification published"),
            Err(e) => warn!(error = %e, group = %group, "order notification failed"),
        }
    }
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgecart_core::{Money, TenantId};
    use forgecart_events::InMemoryEventBus;
    use forgecart_parties::CustomerId;
    use forgecart_sales::{OrderId, OrderPlaced};

    struct BrokenChannel;

    #[async_trait]
    impl NotificationChannel for BrokenChannel {
        async fn publish(&self, _group: &str, _envelope: &JsonEnvelope) -> Result<(), NotifyError> {
            Err(NotifyError::Channel("down".to_string()))
        }
    }

    fn placed(tenant_id: TenantId) -> OrderEvent {
        OrderEvent::OrderPlaced(OrderPlaced {
            tenant_id,
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            total_amount: Money::from_minor(500),
            item_count: 1,
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn dispatch_publishes_to_tenant_group() {
        let bus: Arc<InMemoryEventBus<Notification>> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let dispatcher = NotificationDispatcher::new(Arc::new(BusNotificationChannel::new(bus.clone())));
        let tenant = TenantId::new();

        dispatcher.dispatch(&placed(tenant)).await;

        let received = sub.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].group, tenant_group(tenant));
        assert_eq!(received[0].envelope.event_type(), "sales.order.placed");
        assert_eq!(received[0].envelope.tenant_id(), tenant);
    }

    #[tokio::test]
    async fn channel_failure_is_swallowed() {
        let dispatcher = NotificationDispatcher::new(Arc::new(BrokenChannel));
        dispatcher.dispatch(&placed(TenantId::new())).await;
    }
}
