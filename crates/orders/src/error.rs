//! Engine error types.

use common::{ItemId, NotificationId, OrderId, ShopId};
use domain::{OrderError, OrderStatus, StockError};
use store::StoreError;
use thiserror::Error;

/// Coarse classification of an [`EngineError`], used for status mapping
/// and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InsufficientStock,
    InvalidTransition,
    InvalidInput,
    TransactionAborted,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::TransactionAborted => "transaction_aborted",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`crate::OrderEngine`] operations.
///
/// Every variant except `TransactionAborted` and `Store` is a business-rule
/// failure: the operation was rejected and nothing was written.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A requested item does not exist or is not sold by the order's shop.
    #[error("Item with ID {0} not found")]
    ItemNotFound(ItemId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Shop not found: {0}")]
    ShopNotFound(ShopId),

    /// No notification with this id is addressed to the caller.
    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    /// The actor does not own the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not enough stock for {item_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        item_id: ItemId,
        item_name: String,
        available: u32,
        requested: u32,
    },

    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Invalid quantity for item {item_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item_id: ItemId, quantity: u32 },

    #[error("Order total is too large")]
    TotalOverflow,

    #[error("Order has {lines} lines, at most {max} are allowed")]
    TooManyLines { lines: usize, max: usize },

    /// Restoring stock would overflow the item's counter.
    #[error("Stock overflow for item {0}")]
    StockOverflow(ItemId),

    /// The storage backend could not commit. Nothing was applied; safe to retry.
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ItemNotFound(_)
            | EngineError::OrderNotFound(_)
            | EngineError::ShopNotFound(_)
            | EngineError::NotificationNotFound(_) => ErrorKind::NotFound,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            EngineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            EngineError::EmptyOrder
            | EngineError::InvalidQuantity { .. }
            | EngineError::TooManyLines { .. }
            | EngineError::TotalOverflow => ErrorKind::InvalidInput,
            EngineError::TransactionAborted(_) => ErrorKind::TransactionAborted,
            EngineError::StockOverflow(_) | EngineError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::TransactionAborted(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TransactionAborted(reason) => EngineError::TransactionAborted(reason),
            other => EngineError::Store(other),
        }
    }
}

impl From<OrderError> for EngineError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyOrder => EngineError::EmptyOrder,
            OrderError::InvalidQuantity { item_id, quantity } => {
                EngineError::InvalidQuantity { item_id, quantity }
            }
            OrderError::InvalidTransition { from, to } => {
                EngineError::InvalidTransition { from, to }
            }
            OrderError::TotalOverflow => EngineError::TotalOverflow,
        }
    }
}

impl EngineError {
    /// Attaches the item id to a stock ledger failure.
    pub(crate) fn from_stock(item_id: ItemId, e: StockError) -> Self {
        match e {
            StockError::Insufficient {
                item_id,
                item_name,
                available,
                requested,
            } => EngineError::InsufficientStock {
                item_id,
                item_name,
                available,
                requested,
            },
            StockError::InvalidQuantity { quantity } => {
                EngineError::InvalidQuantity { item_id, quantity }
            }
            StockError::Overflow { item_id } => EngineError::StockOverflow(item_id),
        }
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
