//! Shop ownership record.

use common::{ShopId, UserId};
use serde::{Deserialize, Serialize};

/// A shop listed on the marketplace.
///
/// Only the fields the order engine needs are modelled here; everything
/// else about a shop is managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: UserId,
    pub name: String,
}

impl Shop {
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: ShopId::new(),
            owner_id,
            name: name.into(),
        }
    }

    /// Returns true if `user` owns this shop.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}
