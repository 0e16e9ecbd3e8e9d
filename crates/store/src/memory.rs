use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{ItemId, NotificationId, OrderId, ShopId, UserId};
use domain::{Item, Notification, Order, Shop};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    OrderQuery, Result, StoreError,
    store::{MarketStore, StoreTransaction},
};

#[derive(Debug, Clone)]
struct StoredOrder {
    order: Order,
    /// Commit sequence, breaks ties between equal `created_at` values.
    seq: u64,
}

#[derive(Debug, Default)]
struct MarketState {
    shops: HashMap<ShopId, Shop>,
    items: HashMap<ItemId, Item>,
    orders: HashMap<OrderId, StoredOrder>,
    notifications: Vec<Notification>,
    next_seq: u64,
}

/// In-memory store implementation for tests and local runs.
///
/// A transaction holds the single state lock for its whole lifetime, so
/// units of work are fully serialized. Writes are staged inside the
/// transaction and applied on commit.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    state: Arc<Mutex<MarketState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryMarketStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the commit of the next transaction opened fail with
    /// `TransactionAborted`, as a storage fault would.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of notifications stored.
    pub async fn notification_count(&self) -> usize {
        self.state.lock().await.notifications.len()
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let fail_commit = self.fail_next_commit.swap(false, Ordering::SeqCst);

        Ok(InMemoryTransaction {
            state: guard,
            items: HashMap::new(),
            inserted_orders: Vec::new(),
            updated_orders: HashMap::new(),
            notifications: Vec::new(),
            fail_commit,
        })
    }

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>> {
        Ok(self.state.lock().await.shops.get(&id).cloned())
    }

    async fn item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.state.lock().await.items.get(&id).cloned())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|stored| stored.order.clone()))
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut matching: Vec<&StoredOrder> = state
            .orders
            .values()
            .filter(|stored| query.matches(&stored.order))
            .collect();

        // Newest first
        matching.sort_by(|a, b| {
            b.order
                .created_at()
                .cmp(&a.order.created_at())
                .then(b.seq.cmp(&a.seq))
        });

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|stored| stored.order.clone())
            .collect())
    }

    async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let state = self.state.lock().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<Option<Notification>> {
        let mut state = self.state.lock().await;
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id);

        Ok(notification.map(|n| {
            n.mark_read();
            n.clone()
        }))
    }

    async fn upsert_shop(&self, shop: &Shop) -> Result<()> {
        self.state.lock().await.shops.insert(shop.id, shop.clone());
        Ok(())
    }

    async fn upsert_item(&self, item: &Item) -> Result<()> {
        self.state.lock().await.items.insert(item.id, item.clone());
        Ok(())
    }
}

/// Unit of work over an [`InMemoryMarketStore`].
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<MarketState>,
    items: HashMap<ItemId, Item>,
    inserted_orders: Vec<Order>,
    updated_orders: HashMap<OrderId, Order>,
    notifications: Vec<Notification>,
    fail_commit: bool,
}

impl InMemoryTransaction {
    fn staged_order(&self, id: OrderId) -> Option<&Order> {
        self.inserted_orders
            .iter()
            .find(|order| order.id() == id)
            .or_else(|| self.updated_orders.get(&id))
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn shop(&mut self, id: ShopId) -> Result<Option<Shop>> {
        Ok(self.state.shops.get(&id).cloned())
    }

    async fn lock_items(&mut self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        Ok(ids
            .into_iter()
            .filter_map(|id| {
                self.items
                    .get(&id)
                    .or_else(|| self.state.items.get(&id))
                    .cloned()
            })
            .collect())
    }

    async fn save_item_stock(&mut self, item: &Item) -> Result<()> {
        if !self.items.contains_key(&item.id) && !self.state.items.contains_key(&item.id) {
            return Err(StoreError::InvalidData(format!(
                "item {} does not exist",
                item.id
            )));
        }
        self.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        if let Some(order) = self.staged_order(id) {
            return Ok(Some(order.clone()));
        }
        Ok(self.state.orders.get(&id).map(|stored| stored.order.clone()))
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.state.orders.contains_key(&order.id()) || self.staged_order(order.id()).is_some()
        {
            return Err(StoreError::InvalidData(format!(
                "order {} already exists",
                order.id()
            )));
        }
        self.inserted_orders.push(order.clone());
        Ok(())
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        if let Some(staged) = self
            .inserted_orders
            .iter_mut()
            .find(|staged| staged.id() == order.id())
        {
            *staged = order.clone();
            return Ok(());
        }
        if !self.state.orders.contains_key(&order.id()) {
            return Err(StoreError::InvalidData(format!(
                "order {} does not exist",
                order.id()
            )));
        }
        self.updated_orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn insert_notification(&mut self, notification: &Notification) -> Result<()> {
        self.notifications.push(notification.clone());
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTransaction {
            mut state,
            items,
            inserted_orders,
            updated_orders,
            notifications,
            fail_commit,
        } = self;

        if fail_commit {
            tracing::debug!("injected commit failure, discarding staged writes");
            return Err(StoreError::TransactionAborted(
                "injected commit failure".to_string(),
            ));
        }

        state.items.extend(items);

        for order in inserted_orders {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.orders.insert(order.id(), StoredOrder { order, seq });
        }

        for (id, order) in updated_orders {
            if let Some(stored) = state.orders.get_mut(&id) {
                stored.order = order;
            }
        }

        state.notifications.extend(notifications);
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
