//! Marketplace order engine.
//!
//! Places orders as a single transaction across every requested item's
//! stock, and drives the order lifecycle:
//!
//! ```text
//! pending ──► confirmed ──► shipped ──► delivered
//!    │
//!    └──► cancelled   (stock handed back)
//! ```
//!
//! Customers are notified of every status change.

mod commands;
mod config;
mod engine;
mod error;
mod ledger;
mod notifier;

pub use commands::{OrderFilter, OrderLine, PlaceOrder, PlacedOrder};
pub use config::EngineConfig;
pub use engine::OrderEngine;
pub use error::{EngineError, ErrorKind, Result};
pub use ledger::StockLedger;
pub use notifier::{InMemoryEmitter, LogEmitter, NotificationEmitter, NotifyError};
