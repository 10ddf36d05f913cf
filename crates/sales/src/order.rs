use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, Entity, Money, TenantId, TenantOwned, uuid_newtype};
use forgecart_parties::{AddressId, CustomerId};
use forgecart_products::ProductId;

uuid_newtype!(
    /// Order identifier (tenant-scoped via the order's `tenant_id`).
    OrderId,
    "OrderId"
);

/// Order status lifecycle.
///
/// `Pending → Paid → Processing → Shipped → Delivered`; `Cancelled` is
/// reachable from `Pending`, `Paid` and `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Paid | Processing, Cancelled)
        )
    }

    pub fn is_cancellable(self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Order line: immutable snapshot of product, quantity and unit price at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.times(self.quantity)
    }
}

/// A reserved line with the price captured from the product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Aggregate root: Order plus its item snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    tenant_id: TenantId,
    customer_id: CustomerId,
    address_id: AddressId,
    status: OrderStatus,
    total_amount: Money,
    order_date: DateTime<Utc>,
    items: Vec<OrderItem>,
}

fn total_of(items: &[OrderItem]) -> Result<Money, DomainError> {
    items
        .iter()
        .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.line_total()?))
}

impl Order {
    /// Build a paid order from priced lines (payment is authorized before placement).
    pub fn place(
        tenant_id: TenantId,
        customer_id: CustomerId,
        address_id: AddressId,
        lines: &[PricedLine],
        order_date: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        let mut items = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            let line_no = u32::try_from(idx + 1)
                .map_err(|_| DomainError::validation("too many order lines"))?;
            items.push(OrderItem {
                line_no,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        let total_amount = total_of(&items)?;

        Ok(Self {
            id: OrderId::new(),
            tenant_id,
            customer_id,
            address_id,
            status: OrderStatus::Paid,
            total_amount,
            order_date,
            items,
        })
    }

    /// Rehydrate a persisted order, re-checking the total against its items.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: OrderId,
        tenant_id: TenantId,
        customer_id: CustomerId,
        address_id: AddressId,
        status: OrderStatus,
        total_amount: Money,
        order_date: DateTime<Utc>,
        mut items: Vec<OrderItem>,
    ) -> Result<Self, DomainError> {
        items.sort_by_key(|i| i.line_no);
        if total_of(&items)? != total_amount {
            return Err(DomainError::invariant(format!(
                "order {id} total does not match its items"
            )));
        }
        Ok(Self {
            id,
            tenant_id,
            customer_id,
            address_id,
            status,
            total_amount,
            order_date,
            items,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn address_id(&self) -> AddressId {
        self.address_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Move to `next` along the fulfilment path. Cancellation goes through [`Order::cancel`].
    ///
    /// Returns the previous status.
    pub fn transition(&mut self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if next == OrderStatus::Cancelled {
            return Err(DomainError::validation("use cancel to cancel an order"));
        }
        self.move_to(next)
    }

    /// Cancel the order. The caller releases reserved stock for every item.
    pub fn cancel(&mut self) -> Result<OrderStatus, DomainError> {
        self.move_to(OrderStatus::Cancelled)
    }

    fn move_to(&mut self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::conflict(format!(
                "order cannot move from {} to {next}",
                self.status
            )));
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Order {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn line(quantity: i64, price: u64) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(),
            quantity,
            unit_price: Money::from_minor(price),
        }
    }

    fn placed(lines: &[PricedLine]) -> Result<Order, DomainError> {
        Order::place(test_tenant_id(), CustomerId::new(), AddressId::new(), lines, Utc::now())
    }

    #[test]
    fn place_computes_total_and_numbers_lines() {
        let order = placed(&[line(2, 1_000), line(3, 250)]).unwrap();

        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.total_amount(), Money::from_minor(2_750));
        let numbers: Vec<u32> = order.items().iter().map(|i| i.line_no).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn place_rejects_empty_and_non_positive_lines() {
        match placed(&[]).unwrap_err() {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
        match placed(&[line(0, 100)]).unwrap_err() {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn total_overflow_is_validation_error() {
        match placed(&[line(2, u64::MAX)]).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("overflow")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn fulfilment_path_is_linear() {
        let mut order = placed(&[line(1, 100)]).unwrap();

        assert_eq!(order.transition(OrderStatus::Processing).unwrap(), OrderStatus::Paid);
        assert!(matches!(order.transition(OrderStatus::Delivered), Err(DomainError::Conflict(_))));
        order.transition(OrderStatus::Shipped).unwrap();
        order.transition(OrderStatus::Delivered).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn cancel_only_before_shipping() {
        let mut order = placed(&[line(1, 100)]).unwrap();
        assert!(matches!(order.transition(OrderStatus::Cancelled), Err(DomainError::Validation(_))));
        assert_eq!(order.cancel().unwrap(), OrderStatus::Paid);
        assert!(matches!(order.cancel(), Err(DomainError::Conflict(_))));

        let mut shipped = placed(&[line(1, 100)]).unwrap();
        shipped.transition(OrderStatus::Processing).unwrap();
        shipped.transition(OrderStatus::Shipped).unwrap();
        assert!(matches!(shipped.cancel(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn from_parts_rejects_inconsistent_total() {
        let order = placed(&[line(2, 500)]).unwrap();
        let err = Order::from_parts(
            order.id_typed(),
            order.tenant_id(),
            order.customer_id(),
            order.address_id(),
            order.status(),
            Money::from_minor(999),
            order.order_date(),
            order.items().to_vec(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the order total always equals the sum of quantity × unit price.
            #[test]
            fn total_equals_sum_of_lines(
                lines in proptest::collection::vec((1i64..1_000, 0u64..1_000_000), 1..20)
            ) {
                let priced: Vec<PricedLine> = lines.iter().map(|(q, p)| line(*q, *p)).collect();
                let order = placed(&priced).unwrap();
                let expected: u64 = lines.iter().map(|(q, p)| (*q as u64) * p).sum();
                prop_assert_eq!(order.total_amount(), Money::from_minor(expected));
            }
        }
    }
}
