use async_trait::async_trait;
use common::{ItemId, NotificationId, OrderId, ShopId, UserId};
use domain::{Item, Notification, Order, Shop};

use crate::{OrderQuery, Result};

/// A unit of work over the marketplace tables.
///
/// Rows returned by the `lock_*` methods stay locked against other
/// transactions until this one commits or is dropped. Writes are staged and
/// become visible to other readers only on [`StoreTransaction::commit`].
/// Dropping the transaction without committing rolls everything back.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a shop (no lock; shops are not mutated by the engine).
    async fn shop(&mut self, id: ShopId) -> Result<Option<Shop>>;

    /// Locks and returns the items with the given ids.
    ///
    /// Rows are locked in ascending id order so two transactions touching
    /// the same items cannot deadlock on lock order. Ids that do not resolve
    /// are simply absent from the result; duplicates are returned once.
    async fn lock_items(&mut self, ids: &[ItemId]) -> Result<Vec<Item>>;

    /// Writes back an item's stock level. The item must have been locked.
    async fn save_item_stock(&mut self, item: &Item) -> Result<()>;

    /// Locks and returns an order.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Inserts a newly placed order.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Writes back an order's status and `updated_at`.
    async fn save_order_status(&mut self, order: &Order) -> Result<()>;

    /// Inserts a notification record.
    async fn insert_notification(&mut self, notification: &Notification) -> Result<()>;

    /// Makes every staged write visible atomically.
    ///
    /// Fails with `TransactionAborted` if the backend could not commit; in
    /// that case nothing was applied.
    async fn commit(self) -> Result<()>;

    /// Discards every staged write.
    async fn rollback(self) -> Result<()>;
}

/// Core trait for marketplace store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MarketStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::Transaction>;

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>>;

    async fn item(&self, id: ItemId) -> Result<Option<Item>>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders matching the query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Lists a user's notifications, newest first.
    async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>>;

    /// Sets the read flag on a notification addressed to `user_id`.
    ///
    /// Returns None if no such notification exists for that user.
    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<Option<Notification>>;

    /// Inserts or replaces a shop record.
    async fn upsert_shop(&self, shop: &Shop) -> Result<()>;

    /// Inserts or replaces an item record, including its stock level.
    async fn upsert_item(&self, item: &Item) -> Result<()>;
}
