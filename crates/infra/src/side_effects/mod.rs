//! Post-commit side effects.
//!
//! Both dispatchers run only after a successful commit. They observe committed
//! orders and never mutate them; every failure is logged and swallowed.

pub mod cache;
pub mod notifications;

pub use cache::{Cache, CacheError, CacheInvalidator, InMemoryCache, catalog_key, orders_key};
pub use notifications::{
    BusNotificationChannel, Notification, NotificationChannel, NotificationDispatcher, NotifyError,
};

#[cfg(feature = "redis")]
pub use cache::RedisCache;
#[cfg(feature = "redis")]
pub use notifications::RedisPubSubChannel;
