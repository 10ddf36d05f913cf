use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{Money, TenantId, TenantOwned, UserId};
use forgecart_parties::{AddressId, CustomerForm, CustomerId, ShippingAddressForm};
use forgecart_products::ProductId;
use forgecart_sales::{CartItem, CartOwner, LineRequest, Order, OrderStatus, PaymentInstrument};

// -------------------------
// Request DTOs
// -------------------------

/// Checkout payload.
///
/// `user_id` lets an administrator place an order on behalf of another user;
/// everyone else checks out as themselves. An empty `items` list checks out
/// the customer's cart.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub company_id: Option<TenantId>,
    #[serde(default)]
    pub customer: CustomerForm,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddressForm>,
    #[serde(default)]
    pub payment: Option<PaymentInstrument>,
    #[serde(default)]
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TenantQuery {
    #[serde(default)]
    pub company_id: Option<TenantId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CartQuery {
    #[serde(default)]
    pub company_id: Option<TenantId>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemBody {
    #[serde(default)]
    pub company_id: Option<TenantId>,
    /// Anonymous cart; ignored when the request is authenticated.
    #[serde(default)]
    pub session_id: Option<String>,
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct MergeCartBody {
    #[serde(default)]
    pub company_id: Option<TenantId>,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub company_id: Option<TenantId>,
    pub status: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Option<Money>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub company_id: TenantId,
    pub customer_id: CustomerId,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub order_date: DateTime<Utc>,
    pub items: Vec<OrderLineResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id_typed().to_string(),
            company_id: order.tenant_id(),
            customer_id: order.customer_id(),
            address_id: order.address_id(),
            status: order.status(),
            total_amount: order.total_amount(),
            order_date: order.order_date(),
            items: order
                .items()
                .iter()
                .map(|item| OrderLineResponse {
                    line_no: item.line_no,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total().ok(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub id: String,
    pub product_id: ProductId,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub company_id: TenantId,
    pub owner: Option<CartOwner>,
    pub items: Vec<CartLineResponse>,
}

impl CartResponse {
    pub fn new(company_id: TenantId, items: &[CartItem]) -> Self {
        Self {
            company_id,
            owner: items.first().map(|i| i.owner.clone()),
            items: items
                .iter()
                .map(|i| CartLineResponse {
                    id: i.id.to_string(),
                    product_id: i.product_id,
                    quantity: i.quantity,
                    added_at: i.added_at,
                })
                .collect(),
        }
    }
}
