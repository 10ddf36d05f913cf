//! Sales domain module (orders, carts, checkout lines, payment contract).
//!
//! Pure domain logic plus the payment-authorizer seam; no storage, no HTTP.

pub mod cart;
pub mod checkout;
pub mod events;
pub mod order;
pub mod payment;

pub use cart::{CartItem, CartItemId, CartOwner};
pub use checkout::{LineRequest, lines_from_cart, merge_duplicate_lines};
pub use events::{OrderCancelled, OrderEvent, OrderPlaced, OrderStatusChanged};
pub use order::{Order, OrderId, OrderItem, OrderStatus, PricedLine};
pub use payment::{CardAuthorizer, PaymentAuthorizer, PaymentError, PaymentInstrument};
