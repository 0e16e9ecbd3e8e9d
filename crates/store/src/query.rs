use common::{ShopId, UserId};
use domain::{Order, OrderStatus};

/// Which side of the marketplace an order listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Orders placed by this customer.
    Customer(UserId),

    /// Orders received by this shop.
    Shop(ShopId),
}

/// Builder for constructing order listings.
///
/// Results are always newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub scope: OrderScope,

    /// Only orders currently in this status.
    pub status: Option<OrderStatus>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a query for a customer's orders.
    pub fn by_customer(customer_id: UserId) -> Self {
        Self::new(OrderScope::Customer(customer_id))
    }

    /// Creates a query for a shop's orders.
    pub fn by_shop(shop_id: ShopId) -> Self {
        Self::new(OrderScope::Shop(shop_id))
    }

    fn new(scope: OrderScope) -> Self {
        Self {
            scope,
            status: None,
            limit: None,
            offset: None,
        }
    }

    /// Filters by current status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `order` falls inside this query's filters
    /// (paging is applied separately).
    pub fn matches(&self, order: &Order) -> bool {
        let in_scope = match self.scope {
            OrderScope::Customer(customer_id) => order.customer_id() == customer_id,
            OrderScope::Shop(shop_id) => order.shop_id() == shop_id,
        };
        in_scope && self.status.is_none_or(|status| order.status() == status)
    }
}
