//! Transactional persistence for the marketplace order engine.
//!
//! Every multi-row change goes through a [`StoreTransaction`] obtained from
//! [`MarketStore::begin`]. Staged writes become visible only on `commit`;
//! dropping the transaction discards them.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryMarketStore, InMemoryTransaction};
pub use postgres::{PostgresMarketStore, PostgresTransaction};
pub use query::{OrderQuery, OrderScope};
pub use store::{MarketStore, StoreTransaction};
