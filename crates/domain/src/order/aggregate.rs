//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, ShopId, UserId};
use serde::{Deserialize, Serialize};

use super::events::{OrderPlacedData, StatusChangedData};
use super::{LineItem, OrderError, OrderEvent, OrderStatus};
use crate::money::Money;

/// Order aggregate root.
///
/// An order belongs to exactly one shop. Its lines and total are fixed when
/// it is placed; afterwards only the status moves, and only along
/// [`OrderStatus::TRANSITIONS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: UserId,
    shop_id: ShopId,
    lines: Vec<LineItem>,
    total: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Persisted fields of an order, used by storage backends to rebuild one.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub customer_id: UserId,
    pub shop_id: ShopId,
    pub lines: Vec<LineItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order from already-reserved line snapshots.
    ///
    /// Returns the new aggregate together with the `OrderPlaced` event it was
    /// built from.
    pub fn place(
        order_id: OrderId,
        customer_id: UserId,
        shop_id: ShopId,
        lines: Vec<LineItem>,
    ) -> Result<(Order, OrderEvent), OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                item_id: line.item_id,
                quantity: line.quantity,
            });
        }

        let total = lines
            .iter()
            .map(LineItem::total_price)
            .try_fold(Money::zero(), |acc, line_total| acc.checked_add(line_total?))
            .ok_or(OrderError::TotalOverflow)?;
        let data = OrderPlacedData {
            order_id,
            customer_id,
            shop_id,
            lines,
            total,
            placed_at: Utc::now(),
        };
        let order = Order::from_placed(&data);

        Ok((order, OrderEvent::OrderPlaced(data)))
    }

    /// Rebuilds an order from its persisted fields.
    pub fn from_parts(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            customer_id: parts.customer_id,
            shop_id: parts.shop_id,
            lines: parts.lines,
            total: parts.total,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    fn from_placed(data: &OrderPlacedData) -> Self {
        Self {
            id: data.order_id,
            customer_id: data.customer_id,
            shop_id: data.shop_id,
            lines: data.lines.clone(),
            total: data.total,
            status: OrderStatus::Pending,
            created_at: data.placed_at,
            updated_at: data.placed_at,
        }
    }

    /// Applies an event to the aggregate, updating its state.
    pub fn apply(&mut self, event: OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(data) => *self = Order::from_placed(&data),
            OrderEvent::StatusChanged(data) => self.apply_status_changed(data),
        }
    }

    fn apply_status_changed(&mut self, data: StatusChangedData) {
        self.status = data.to;
        self.updated_at = data.changed_at;
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> UserId {
        self.customer_id
    }

    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    /// Line snapshots in the order they were requested.
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_placed_by(&self, user: UserId) -> bool {
        self.customer_id == user
    }
}

// Command methods (return events)
impl Order {
    /// Moves the order one step along the fulfilment path.
    ///
    /// Cancellation is not reachable from here; it must go through
    /// [`Order::cancel`] so the reserved stock is handed back.
    pub fn advance(&self, to: OrderStatus, actor: UserId) -> Result<OrderEvent, OrderError> {
        if self.status.next_forward() != Some(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        Ok(OrderEvent::status_changed(self.id, self.status, to, actor))
    }

    /// Cancels a pending order.
    pub fn cancel(&self, actor: UserId) -> Result<OrderEvent, OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }

        Ok(OrderEvent::status_changed(
            self.id,
            self.status,
            OrderStatus::Cancelled,
            actor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ItemId;

    fn line(price: i64, quantity: u32) -> LineItem {
        LineItem::new(ItemId::new(), "Widget", Money::from_cents(price), quantity)
    }

    fn placed(lines: Vec<LineItem>) -> Order {
        Order::place(OrderId::new(), UserId::new(), ShopId::new(), lines)
            .unwrap()
            .0
    }

    fn advanced(mut order: Order, to: OrderStatus) -> Order {
        let event = order.advance(to, UserId::new()).unwrap();
        order.apply(event);
        order
    }

    #[test]
    fn test_place_computes_total_and_starts_pending() {
        let (order, event) = Order::place(
            OrderId::new(),
            UserId::new(),
            ShopId::new(),
            vec![line(100, 3), line(250, 2)],
        )
        .unwrap();

        assert_eq!(order.total().cents(), 800);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_quantity(), 5);
        assert_eq!(event.event_type(), "OrderPlaced");
        assert_eq!(event.order_id(), order.id());
    }

    #[test]
    fn test_total_equals_sum_of_line_totals() {
        let order = placed(vec![line(199, 7), line(1, 1), line(5000, 2)]);
        let expected = order
            .lines()
            .iter()
            .map(|line| line.unit_price.cents() * i64::from(line.quantity))
            .sum::<i64>();
        assert_eq!(order.total().cents(), expected);
    }

    #[test]
    fn test_lines_keep_request_order() {
        let first = line(100, 1);
        let second = line(200, 1);
        let order = placed(vec![first.clone(), second.clone()]);
        assert_eq!(order.lines(), &[first, second]);
    }

    #[test]
    fn test_place_rejects_empty() {
        let result = Order::place(OrderId::new(), UserId::new(), ShopId::new(), vec![]);
        assert_eq!(result.unwrap_err(), OrderError::EmptyOrder);
    }

    #[test]
    fn test_place_rejects_zero_quantity() {
        let result = Order::place(
            OrderId::new(),
            UserId::new(),
            ShopId::new(),
            vec![line(100, 1), line(100, 0)],
        );
        assert!(matches!(
            result,
            Err(OrderError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn test_place_rejects_line_total_overflow() {
        let result = Order::place(
            OrderId::new(),
            UserId::new(),
            ShopId::new(),
            vec![line(i64::MAX / 2, 3)],
        );
        assert_eq!(result.unwrap_err(), OrderError::TotalOverflow);
    }

    #[test]
    fn test_place_rejects_order_total_overflow() {
        let result = Order::place(
            OrderId::new(),
            UserId::new(),
            ShopId::new(),
            vec![line(i64::MAX - 10, 1), line(100, 1)],
        );
        assert_eq!(result.unwrap_err(), OrderError::TotalOverflow);
    }

    #[test]
    fn test_forward_chain_to_delivered() {
        let order = placed(vec![line(100, 1)]);
        let order = advanced(order, OrderStatus::Confirmed);
        let order = advanced(order, OrderStatus::Shipped);
        let order = advanced(order, OrderStatus::Delivered);
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_advance_cannot_skip_or_go_back() {
        let order = placed(vec![line(100, 1)]);
        assert_eq!(
            order.advance(OrderStatus::Shipped, UserId::new()),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped,
            })
        );

        let order = advanced(order, OrderStatus::Confirmed);
        assert!(order.advance(OrderStatus::Pending, UserId::new()).is_err());
        assert!(order.advance(OrderStatus::Confirmed, UserId::new()).is_err());
    }

    #[test]
    fn test_advance_cannot_cancel() {
        let order = placed(vec![line(100, 1)]);
        assert!(matches!(
            order.advance(OrderStatus::Cancelled, UserId::new()),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let mut order = placed(vec![line(100, 1)]);
        let event = order.cancel(order.customer_id()).unwrap();
        order.apply(event);
        assert_eq!(order.status(), OrderStatus::Cancelled);

        assert_eq!(
            order.cancel(order.customer_id()),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Cancelled,
            })
        );

        let confirmed = advanced(placed(vec![line(100, 1)]), OrderStatus::Confirmed);
        assert!(confirmed.cancel(confirmed.customer_id()).is_err());
    }

    #[test]
    fn test_status_change_does_not_touch_lines_or_total() {
        let order = placed(vec![line(100, 3)]);
        let total = order.total();
        let lines = order.lines().to_vec();

        let order = advanced(order, OrderStatus::Confirmed);
        assert_eq!(order.total(), total);
        assert_eq!(order.lines(), lines.as_slice());
        assert!(order.updated_at() >= order.created_at());
    }

    #[test]
    fn test_from_parts_roundtrip() {
        let order = placed(vec![line(100, 2)]);
        let rebuilt = Order::from_parts(OrderParts {
            id: order.id(),
            customer_id: order.customer_id(),
            shop_id: order.shop_id(),
            lines: order.lines().to_vec(),
            total: order.total(),
            status: order.status(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        });
        assert_eq!(rebuilt, order);
    }
}
