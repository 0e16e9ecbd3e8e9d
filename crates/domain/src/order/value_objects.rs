//! Value objects for the order domain.

use common::ItemId;
use serde::{Deserialize, Serialize};

use crate::item::StockReservation;
use crate::money::Money;

/// One line of a placed order.
///
/// Name and price are copied from the item at placement time so later edits
/// to the listing never change a historical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(item_id: ItemId, name: impl Into<String>, unit_price: Money, quantity: u32) -> Self {
        Self {
            item_id,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns the total price for this line (quantity * unit_price), or
    /// `None` if it overflows.
    pub fn total_price(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

impl From<StockReservation> for LineItem {
    fn from(reservation: StockReservation) -> Self {
        Self {
            item_id: reservation.item_id,
            name: reservation.name,
            unit_price: reservation.unit_price,
            quantity: reservation.quantity,
        }
    }
}
