use std::{convert::Infallible, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use forgecart_core::{TenantId, UserId};
use forgecart_events::JsonEnvelope;
use forgecart_infra::checkout::{
    CartReconciler, CheckoutError, CheckoutFailure, CheckoutRequest, OrderAccess, OrderOrchestrator,
};
use forgecart_infra::config::AppConfig;
use forgecart_infra::side_effects::{
    Cache, CacheError, CacheInvalidator, InMemoryCache, NotificationChannel, NotificationDispatcher, NotifyError,
};
use forgecart_infra::store::{CommerceStore, InMemoryCommerceStore, PgCommerceStore, StoreError};
use forgecart_products::ProductId;
use forgecart_sales::{CardAuthorizer, CartItem, CartOwner, Order, OrderId, OrderStatus, PaymentAuthorizer};

/// Realtime message broadcast via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Notification channel feeding the SSE broadcast. Lossy: no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct RealtimeChannel {
    tx: broadcast::Sender<RealtimeMessage>,
}

impl RealtimeChannel {
    pub fn new(tx: broadcast::Sender<RealtimeMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationChannel for RealtimeChannel {
    async fn publish(&self, _group: &str, envelope: &JsonEnvelope) -> Result<(), NotifyError> {
        let payload = serde_json::to_value(envelope).map_err(|e| NotifyError::Serialize(e.to_string()))?;
        let _ = self.tx.send(RealtimeMessage {
            tenant_id: envelope.tenant_id(),
            topic: envelope.event_type().to_string(),
            payload,
        });
        Ok(())
    }
}

/// Publishes to every channel; reports the first failure after trying all of them.
pub struct FanoutChannel {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl FanoutChannel {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl NotificationChannel for FanoutChannel {
    async fn publish(&self, group: &str, envelope: &JsonEnvelope) -> Result<(), NotifyError> {
        let mut first_err = None;
        for channel in &self.channels {
            if let Err(e) = channel.publish(group, envelope).await {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[derive(Debug, Error)]
pub enum ServiceBuildError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Whose cart a cart operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartTarget {
    /// The customer linked to this user (created on first write).
    Principal(UserId),
    /// An anonymous session cart.
    Session(String),
}

#[derive(Clone)]
pub enum AppServices {
    InMemory {
        store: Arc<InMemoryCommerceStore>,
        orders: OrderOrchestrator<InMemoryCommerceStore>,
        carts: CartReconciler<InMemoryCommerceStore>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
    },
    Persistent {
        store: Arc<PgCommerceStore>,
        orders: OrderOrchestrator<PgCommerceStore>,
        carts: CartReconciler<PgCommerceStore>,
        realtime_tx: broadcast::Sender<RealtimeMessage>,
    },
}

macro_rules! with_services {
    ($services:expr, |$orders:ident, $carts:ident| $body:expr) => {
        match $services {
            AppServices::InMemory {
                orders: $orders,
                carts: $carts,
                ..
            } => $body,
            AppServices::Persistent {
                orders: $orders,
                carts: $carts,
                ..
            } => $body,
        }
    };
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServiceBuildError> {
    if config.use_persistent_stores {
        return build_persistent_services(config).await;
    }
    Ok(AppServices::in_memory(Arc::new(InMemoryCommerceStore::new()), config.payment_timeout))
}

async fn build_persistent_services(config: &AppConfig) -> Result<AppServices, ServiceBuildError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Backend("DATABASE_URL is not configured".to_string()))?;
    let store = Arc::new(PgCommerceStore::connect(database_url).await?);
    store.migrate().await?;

    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);
    let realtime: Arc<dyn NotificationChannel> = Arc::new(RealtimeChannel::new(realtime_tx.clone()));

    #[cfg(feature = "redis")]
    let (channel, cache): (Arc<dyn NotificationChannel>, Arc<dyn Cache>) = {
        use forgecart_infra::side_effects::{RedisCache, RedisPubSubChannel};
        let pubsub: Arc<dyn NotificationChannel> = Arc::new(RedisPubSubChannel::new(&config.redis_url)?);
        (
            Arc::new(FanoutChannel::new(vec![pubsub, realtime])),
            Arc::new(RedisCache::new(&config.redis_url)?),
        )
    };
    #[cfg(not(feature = "redis"))]
    let (channel, cache): (Arc<dyn NotificationChannel>, Arc<dyn Cache>) = {
        tracing::warn!("redis feature not enabled; notifications are local and the cache is in-process");
        (realtime, Arc::new(InMemoryCache::new()))
    };

    tracing::info!("persistent stores initialized");
    let (orders, carts) = wire(store.clone(), channel, cache, config.payment_timeout);
    Ok(AppServices::Persistent {
        store,
        orders,
        carts,
        realtime_tx,
    })
}

fn wire<S: CommerceStore>(
    store: Arc<S>,
    channel: Arc<dyn NotificationChannel>,
    cache: Arc<dyn Cache>,
    payment_timeout: Duration,
) -> (OrderOrchestrator<S>, CartReconciler<S>) {
    let payments: Arc<dyn PaymentAuthorizer> = Arc::new(CardAuthorizer::new());
    let orders = OrderOrchestrator::new(
        store.clone(),
        payments,
        NotificationDispatcher::new(channel),
        CacheInvalidator::new(cache),
    )
    .with_payment_timeout(payment_timeout);
    (orders, CartReconciler::new(store))
}

impl AppServices {
    /// In-memory wiring (dev/test) around an existing store.
    pub fn in_memory(store: Arc<InMemoryCommerceStore>, payment_timeout: Duration) -> Self {
        let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);
        let channel: Arc<dyn NotificationChannel> = Arc::new(RealtimeChannel::new(realtime_tx.clone()));
        let (orders, carts) = wire(store.clone(), channel, Arc::new(InMemoryCache::new()), payment_timeout);
        AppServices::InMemory {
            store,
            orders,
            carts,
            realtime_tx,
        }
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        match self {
            AppServices::InMemory { realtime_tx, .. } => realtime_tx,
            AppServices::Persistent { realtime_tx, .. } => realtime_tx,
        }
    }

    pub async fn place_order(&self, tenant_id: TenantId, request: CheckoutRequest) -> Result<Order, CheckoutFailure> {
        with_services!(self, |orders, _carts| orders.place_order(tenant_id, request).await)
    }

    pub async fn find_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        access: OrderAccess,
    ) -> Result<Order, CheckoutFailure> {
        with_services!(self, |orders, _carts| orders.find_order(tenant_id, order_id, access).await)
    }

    pub async fn cancel_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        access: OrderAccess,
    ) -> Result<Order, CheckoutFailure> {
        with_services!(self, |orders, _carts| orders.cancel_order(tenant_id, order_id, access).await)
    }

    pub async fn transition_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, CheckoutFailure> {
        with_services!(self, |orders, _carts| orders.transition_order(tenant_id, order_id, next).await)
    }

    pub async fn add_to_cart(
        &self,
        tenant_id: TenantId,
        target: CartTarget,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, CheckoutError> {
        with_services!(self, |_orders, carts| match target {
            CartTarget::Principal(user) => carts.add_item_for_principal(tenant_id, user, product_id, quantity).await,
            CartTarget::Session(session) => {
                let owner = CartOwner::session(session)?;
                carts.add_item(tenant_id, &owner, product_id, quantity).await
            }
        })
    }

    pub async fn cart(&self, tenant_id: TenantId, target: CartTarget) -> Result<Vec<CartItem>, CheckoutError> {
        with_services!(self, |_orders, carts| match target {
            CartTarget::Principal(user) => carts.cart_for_principal(tenant_id, user).await,
            CartTarget::Session(session) => {
                let owner = CartOwner::session(session)?;
                carts.cart(tenant_id, &owner).await
            }
        })
    }

    pub async fn merge_session_cart(
        &self,
        tenant_id: TenantId,
        session_id: &str,
        principal_id: UserId,
    ) -> Result<Vec<CartItem>, CheckoutError> {
        with_services!(self, |_orders, carts| carts
            .merge_session_cart(tenant_id, session_id, principal_id)
            .await)
    }
}

pub fn tenant_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgecart_core::Money;
    use forgecart_events::EventEnvelope;
    use forgecart_parties::CustomerId;
    use forgecart_sales::{OrderEvent, OrderPlaced};

    struct Failing;

    #[async_trait]
    impl NotificationChannel for Failing {
        async fn publish(&self, _group: &str, _envelope: &JsonEnvelope) -> Result<(), NotifyError> {
            Err(NotifyError::Channel("down".to_string()))
        }
    }

    fn envelope(tenant_id: TenantId) -> JsonEnvelope {
        let event = OrderEvent::OrderPlaced(OrderPlaced {
            tenant_id,
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            total_amount: Money::from_minor(100),
            item_count: 1,
            occurred_at: Utc::now(),
        });
        EventEnvelope::from_event(tenant_id, *event.order_id().as_uuid(), "sales.order", &event).unwrap()
    }

    #[tokio::test]
    async fn realtime_channel_tags_messages_with_tenant_and_topic() {
        let (tx, mut rx) = broadcast::channel(4);
        let tenant = TenantId::new();

        RealtimeChannel::new(tx).publish("company-x", &envelope(tenant)).await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.tenant_id, tenant);
        assert_eq!(msg.topic, "sales.order.placed");
    }

    #[tokio::test]
    async fn fanout_reaches_healthy_channels_despite_failures() {
        let (tx, mut rx) = broadcast::channel(4);
        let fanout = FanoutChannel::new(vec![Arc::new(Failing), Arc::new(RealtimeChannel::new(tx))]);

        let result = fanout.publish("company-x", &envelope(TenantId::new())).await;

        assert!(matches!(result, Err(NotifyError::Channel(_))));
        assert!(rx.recv().await.is_ok());
    }
}
