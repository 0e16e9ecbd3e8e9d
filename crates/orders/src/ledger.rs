//! Stock ledger over the items locked by one transaction.

use std::collections::HashMap;

use common::ItemId;
use domain::{Item, StockReservation};
use store::StoreTransaction;

use crate::error::{EngineError, Result};

/// The set of items a unit of work has locked, with pending stock changes.
///
/// `reserve` and `restore` only touch the in-memory copies; [`StockLedger::flush`]
/// writes every changed item back through the transaction. The changes become
/// visible to others only when that transaction commits.
#[derive(Debug)]
pub struct StockLedger {
    items: HashMap<ItemId, Item>,
    dirty: Vec<ItemId>,
}

impl StockLedger {
    /// Locks the given items inside `tx`. Ids that do not resolve are absent
    /// from the ledger.
    pub async fn lock<T: StoreTransaction>(tx: &mut T, ids: &[ItemId]) -> Result<Self> {
        let items = tx
            .lock_items(ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        Ok(Self {
            items,
            dirty: Vec::new(),
        })
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Takes `quantity` units of an item, returning the name and price at this instant.
    pub fn reserve(&mut self, item_id: ItemId, quantity: u32) -> Result<StockReservation> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;

        let reservation = item
            .reserve(quantity)
            .map_err(|e| EngineError::from_stock(item_id, e))?;
        self.mark_dirty(item_id);
        Ok(reservation)
    }

    /// Puts `quantity` units of an item back.
    pub fn restore(&mut self, item_id: ItemId, quantity: u32) -> Result<()> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;

        item.restore(quantity)
            .map_err(|e| EngineError::from_stock(item_id, e))?;
        self.mark_dirty(item_id);
        Ok(())
    }

    /// Writes every changed item back through `tx`.
    pub async fn flush<T: StoreTransaction>(self, tx: &mut T) -> Result<()> {
        for id in &self.dirty {
            if let Some(item) = self.items.get(id) {
                tx.save_item_stock(item).await?;
            }
        }
        Ok(())
    }

    fn mark_dirty(&mut self, item_id: ItemId) {
        if !self.dirty.contains(&item_id) {
            self.dirty.push(item_id);
        }
    }
}
