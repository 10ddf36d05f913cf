//! Domain events and their tenant-scoped distribution.
//!
//! Events describe facts that already happened (an order was placed, a status
//! changed). They are wrapped in an [`EventEnvelope`] carrying the tenant and
//! published on an [`EventBus`] **after** the owning transaction committed.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::{JsonEnvelope, TenantScoped, tenant_group};
