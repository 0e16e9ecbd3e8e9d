//! Domain layer for the marketplace order engine.
//!
//! This crate holds the pure model, free of any storage concerns:
//! - `Money` and the per-item stock ledger arithmetic on `Item`
//! - `Shop`, the ownership record consulted for authorization
//! - the `Order` aggregate with its `OrderStatus` state machine
//! - customer `Notification`s raised on status changes

pub mod item;
pub mod money;
pub mod notification;
pub mod order;
pub mod shop;

pub use item::{Item, StockError, StockReservation};
pub use money::Money;
pub use notification::Notification;
pub use order::{
    LineItem, Order, OrderError, OrderEvent, OrderParts, OrderPlacedData, OrderStatus,
    StatusChangedData, UnknownStatus,
};
pub use shop::Shop;
