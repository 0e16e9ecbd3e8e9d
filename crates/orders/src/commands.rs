//! Inputs and outputs of engine operations.

use common::{ItemId, OrderId, ShopId, UserId};
use domain::{Money, OrderStatus};

/// One requested (item, quantity) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self { item_id, quantity }
    }
}

/// Command to place an order with one shop.
///
/// Lines are reserved in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub customer_id: UserId,
    pub shop_id: ShopId,
    pub lines: Vec<OrderLine>,
}

impl PlaceOrder {
    pub fn new(customer_id: UserId, shop_id: ShopId) -> Self {
        Self {
            customer_id,
            shop_id,
            lines: Vec::new(),
        }
    }

    /// Appends a line.
    pub fn line(mut self, item_id: ItemId, quantity: u32) -> Self {
        self.lines.push(OrderLine::new(item_id, quantity));
        self
    }
}

/// Result of a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Money,
}

/// Which orders to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    /// Orders the user placed.
    ByCustomer(UserId),

    /// Orders received by a shop. `actor` must own the shop.
    ByShop {
        shop_id: ShopId,
        actor: UserId,
        status: Option<OrderStatus>,
    },
}
