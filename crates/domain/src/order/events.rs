//! Order domain events.

use chrono::{DateTime, Utc};
use common::{OrderId, ShopId, UserId};
use serde::{Deserialize, Serialize};

use super::{LineItem, OrderStatus};
use crate::money::Money;

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed with its stock already reserved.
    OrderPlaced(OrderPlacedData),

    /// Order moved to a new status.
    StatusChanged(StatusChangedData),
}

impl OrderEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::StatusChanged(_) => "StatusChanged",
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(data) => data.order_id,
            OrderEvent::StatusChanged(data) => data.order_id,
        }
    }

    pub(crate) fn status_changed(
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: UserId,
    ) -> Self {
        OrderEvent::StatusChanged(StatusChangedData {
            order_id,
            from,
            to,
            changed_by,
            changed_at: Utc::now(),
        })
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub shop_id: ShopId,

    /// Line snapshots in the order they were requested.
    pub lines: Vec<LineItem>,

    /// Sum of `unit_price * quantity` across `lines`.
    pub total: Money,

    pub placed_at: DateTime<Utc>,
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,

    /// The actor who made the change.
    pub changed_by: UserId,

    pub changed_at: DateTime<Utc>,
}
