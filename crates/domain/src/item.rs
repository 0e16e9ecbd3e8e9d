//! Listed items and the per-item stock ledger.

use common::{ItemId, ShopId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Errors raised by stock ledger operations on a single item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// Requested quantity exceeds what is on hand.
    #[error("Not enough stock for {item_name}. Available: {available}, Requested: {requested}")]
    Insufficient {
        item_id: ItemId,
        item_name: String,
        available: u32,
        requested: u32,
    },

    /// Quantity of zero.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Restoring would overflow the stock counter.
    #[error("Stock overflow for item {item_id}")]
    Overflow { item_id: ItemId },
}

/// Snapshot of an item taken at the instant stock was reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// An item listed by a shop.
///
/// `stock` is unsigned and only changes through [`Item::reserve`] and
/// [`Item::restore`], so it can never go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub shop_id: ShopId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    stock: u32,
}

impl Item {
    pub fn new(
        id: ItemId,
        shop_id: ShopId,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id,
            shop_id,
            name: name.into(),
            description: None,
            price,
            stock,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Units currently available.
    pub fn stock(&self) -> u32 {
        self.stock
    }

    /// Decrements stock by `quantity` and snapshots name and price.
    ///
    /// On failure the item is left untouched.
    pub fn reserve(&mut self, quantity: u32) -> Result<StockReservation, StockError> {
        if quantity == 0 {
            return Err(StockError::InvalidQuantity { quantity });
        }
        if self.stock < quantity {
            return Err(StockError::Insufficient {
                item_id: self.id,
                item_name: self.name.clone(),
                available: self.stock,
                requested: quantity,
            });
        }

        self.stock -= quantity;
        Ok(StockReservation {
            item_id: self.id,
            name: self.name.clone(),
            unit_price: self.price,
            quantity,
        })
    }

    /// Returns `quantity` units to stock.
    pub fn restore(&mut self, quantity: u32) -> Result<(), StockError> {
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or(StockError::Overflow { item_id: self.id })?;
        Ok(())
    }
}
