//! Order aggregate and related types.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderParts};
pub use events::{OrderEvent, OrderPlacedData, StatusChangedData};
pub use state::{OrderStatus, UnknownStatus};
pub use value_objects::LineItem;

use common::ItemId;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no line items.
    #[error("Order has no items")]
    EmptyOrder,

    /// A line asked for zero units.
    #[error("Invalid quantity for item {item_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item_id: ItemId, quantity: u32 },

    /// The status change is not in the transition table.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Price times quantity, or the sum of the lines, does not fit in `Money`.
    #[error("Order total is too large")]
    TotalOverflow,
}
