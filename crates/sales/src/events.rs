use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{Money, TenantId};
use forgecart_events::Event;
use forgecart_parties::CustomerId;

use crate::{Order, OrderId, OrderStatus};

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub total_amount: Money,
    pub item_count: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub previous_status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Committed order facts published to tenant notification groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderStatusChanged),
    OrderCancelled(OrderCancelled),
}

impl OrderEvent {
    pub fn placed(order: &Order, occurred_at: DateTime<Utc>) -> Self {
        use forgecart_core::TenantOwned;
        OrderEvent::OrderPlaced(OrderPlaced {
            tenant_id: order.tenant_id(),
            order_id: order.id_typed(),
            customer_id: order.customer_id(),
            total_amount: order.total_amount(),
            item_count: order.items().len(),
            occurred_at,
        })
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::OrderStatusChanged(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            OrderEvent::OrderPlaced(e) => e.tenant_id,
            OrderEvent::OrderStatusChanged(e) => e.tenant_id,
            OrderEvent::OrderCancelled(e) => e.tenant_id,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "sales.order.placed",
            OrderEvent::OrderStatusChanged(_) => "sales.order.status_changed",
            OrderEvent::OrderCancelled(_) => "sales.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderStatusChanged(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}
