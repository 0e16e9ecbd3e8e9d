//! Shared identifier types.

mod types;

pub use types::{ItemId, NotificationId, OrderId, ShopId, UserId};
