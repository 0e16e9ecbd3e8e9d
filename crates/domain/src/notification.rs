//! Customer notifications.

use chrono::{DateTime, Utc};
use common::{NotificationId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// A message addressed to one user, optionally about one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub read: bool,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: UserId, message: impl Into<String>, order_id: Option<OrderId>) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            message: message.into(),
            read: false,
            order_id,
            created_at: Utc::now(),
        }
    }

    /// Builds the notice sent to a customer when their order changes status.
    pub fn order_status(customer_id: UserId, order_id: OrderId, status: OrderStatus) -> Self {
        Self::new(
            customer_id,
            format!("Your order #{} is now {status}.", order_id.short()),
            Some(order_id),
        )
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_message() {
        let order_id = OrderId::new();
        let customer = UserId::new();
        let n = Notification::order_status(customer, order_id, OrderStatus::Shipped);

        assert_eq!(
            n.message,
            format!("Your order #{} is now shipped.", order_id.short())
        );
        assert_eq!(n.user_id, customer);
        assert_eq!(n.order_id, Some(order_id));
        assert!(!n.read);
    }

    #[test]
    fn test_mark_read() {
        let mut n = Notification::new(UserId::new(), "hello", None);
        n.mark_read();
        assert!(n.read);
    }
}
