//! The order engine: placement, lifecycle and the notification inbox.

use std::time::Instant;

use common::{ItemId, NotificationId, OrderId, UserId};
use domain::{LineItem, Notification, Order, OrderStatus};
use store::{MarketStore, OrderQuery, StoreTransaction};

use crate::commands::{OrderFilter, PlaceOrder, PlacedOrder};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::ledger::StockLedger;
use crate::notifier::NotificationEmitter;

/// Runs every order operation as one unit of work against the store.
///
/// Placement and cancellation touch several rows (items and the order) and
/// commit them together or not at all. An early return drops the open
/// transaction, which rolls it back. Notifications are recorded inside the
/// same transaction as the status change and handed to the emitter only
/// after commit.
pub struct OrderEngine<S: MarketStore, N: NotificationEmitter> {
    store: S,
    emitter: N,
    config: EngineConfig,
}

impl<S: MarketStore, N: NotificationEmitter> OrderEngine<S, N> {
    pub fn new(store: S, emitter: N) -> Self {
        Self::with_config(store, emitter, EngineConfig::default())
    }

    pub fn with_config(store: S, emitter: N, config: EngineConfig) -> Self {
        Self {
            store,
            emitter,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn emitter(&self) -> &N {
        &self.emitter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reserves stock for every line and records a pending order.
    ///
    /// All-or-nothing: if any line fails, no stock moves and no order exists.
    #[tracing::instrument(
        skip(self, cmd),
        fields(customer_id = %cmd.customer_id, shop_id = %cmd.shop_id, lines = cmd.lines.len())
    )]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<PlacedOrder> {
        let start = Instant::now();
        let result = self.try_place_order(&cmd).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %placed.order_id,
                    total = %placed.total,
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("orders_placement_failed_total", "reason" => e.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %e, "order placement rejected");
            }
        }

        result
    }

    async fn try_place_order(&self, cmd: &PlaceOrder) -> Result<PlacedOrder> {
        self.validate_lines(cmd)?;

        let mut tx = self.store.begin().await?;

        if tx.shop(cmd.shop_id).await?.is_none() {
            return Err(EngineError::ShopNotFound(cmd.shop_id));
        }

        let ids: Vec<ItemId> = cmd.lines.iter().map(|line| line.item_id).collect();
        let mut ledger = StockLedger::lock(&mut tx, &ids).await?;

        let mut lines = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            // Items listed by another shop are invisible to this order
            if ledger
                .item(line.item_id)
                .is_none_or(|item| item.shop_id != cmd.shop_id)
            {
                return Err(EngineError::ItemNotFound(line.item_id));
            }

            let reservation = ledger.reserve(line.item_id, line.quantity)?;
            lines.push(LineItem::from(reservation));
        }

        let (order, event) = Order::place(OrderId::new(), cmd.customer_id, cmd.shop_id, lines)?;
        tracing::debug!(event_type = event.event_type(), order_id = %order.id(), "order built");

        ledger.flush(&mut tx).await?;
        tx.insert_order(&order).await?;
        tx.commit().await?;

        Ok(PlacedOrder {
            order_id: order.id(),
            total: order.total(),
        })
    }

    fn validate_lines(&self, cmd: &PlaceOrder) -> Result<()> {
        if cmd.lines.is_empty() {
            return Err(EngineError::EmptyOrder);
        }
        if cmd.lines.len() > self.config.max_lines_per_order {
            return Err(EngineError::TooManyLines {
                lines: cmd.lines.len(),
                max: self.config.max_lines_per_order,
            });
        }
        if let Some(line) = cmd.lines.iter().find(|line| line.quantity == 0) {
            return Err(EngineError::InvalidQuantity {
                item_id: line.item_id,
                quantity: line.quantity,
            });
        }
        Ok(())
    }

    /// Moves an order one step along `pending → confirmed → shipped → delivered`.
    ///
    /// Only the owner of the order's shop may do this. The customer is notified.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        actor: UserId,
        status: OrderStatus,
    ) -> Result<Order> {
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        let shop = tx
            .shop(order.shop_id())
            .await?
            .ok_or(EngineError::ShopNotFound(order.shop_id()))?;
        if !shop.is_owned_by(actor) {
            return Err(EngineError::Forbidden(
                "only the shop owner may update this order".to_string(),
            ));
        }

        let event = order.advance(status, actor)?;
        order.apply(event);

        let notification =
            Notification::order_status(order.customer_id(), order.id(), order.status());
        tx.save_order_status(&order).await?;
        tx.insert_notification(&notification).await?;
        tx.commit().await?;

        metrics::counter!("order_status_changes_total", "status" => order.status().as_str())
            .increment(1);
        tracing::info!(%order_id, status = %order.status(), "order status updated");

        self.deliver(&notification).await;
        Ok(order)
    }

    /// Cancels a pending order and returns its stock.
    ///
    /// Only the customer who placed the order may cancel it. Stock restoration,
    /// the status change and the customer notification commit together.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, actor: UserId) -> Result<Order> {
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if !order.is_placed_by(actor) {
            return Err(EngineError::Forbidden(
                "only the customer who placed this order may cancel it".to_string(),
            ));
        }

        let event = order.cancel(actor)?;

        let ids: Vec<ItemId> = order.lines().iter().map(|line| line.item_id).collect();
        let mut ledger = StockLedger::lock(&mut tx, &ids).await?;
        for line in order.lines() {
            if ledger.item(line.item_id).is_none() {
                tracing::warn!(
                    %order_id,
                    item_id = %line.item_id,
                    "item no longer exists, stock not restored"
                );
                continue;
            }
            ledger.restore(line.item_id, line.quantity)?;
        }
        ledger.flush(&mut tx).await?;

        order.apply(event);

        let notification =
            Notification::order_status(order.customer_id(), order.id(), order.status());
        tx.save_order_status(&order).await?;
        tx.insert_notification(&notification).await?;
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        metrics::counter!("order_status_changes_total", "status" => order.status().as_str())
            .increment(1);
        tracing::info!(%order_id, restored_units = order.total_quantity(), "order cancelled");

        self.deliver(&notification).await;
        Ok(order)
    }

    /// Lists orders newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let query = match filter {
            OrderFilter::ByCustomer(customer_id) => OrderQuery::by_customer(customer_id),
            OrderFilter::ByShop {
                shop_id,
                actor,
                status,
            } => {
                let shop = self
                    .store
                    .shop(shop_id)
                    .await?
                    .ok_or(EngineError::ShopNotFound(shop_id))?;
                if !shop.is_owned_by(actor) {
                    return Err(EngineError::Forbidden(
                        "only the shop owner may list its orders".to_string(),
                    ));
                }

                let query = OrderQuery::by_shop(shop_id);
                match status {
                    Some(status) => query.status(status),
                    None => query,
                }
            }
        };

        Ok(self.store.list_orders(query).await?)
    }

    /// Fetches one order. Visible to its customer and to the shop owner.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId, actor: UserId) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if order.is_placed_by(actor) {
            return Ok(order);
        }

        let owns_shop = self
            .store
            .shop(order.shop_id())
            .await?
            .is_some_and(|shop| shop.is_owned_by(actor));
        if !owns_shop {
            return Err(EngineError::Forbidden(
                "order belongs to another customer".to_string(),
            ));
        }
        Ok(order)
    }

    /// Returns the user's notifications, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
        Ok(self.store.notifications_for(user_id).await?)
    }

    /// Marks one of the user's notifications as read.
    #[tracing::instrument(skip(self))]
    pub async fn mark_notification_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> Result<Notification> {
        self.store
            .mark_notification_read(notification_id, user_id)
            .await?
            .ok_or(EngineError::NotificationNotFound(notification_id))
    }

    async fn deliver(&self, notification: &Notification) {
        if let Err(e) = self.emitter.notify(notification).await {
            metrics::counter!("notifications_delivery_failed_total").increment(1);
            tracing::warn!(
                error = %e,
                notification_id = %notification.id,
                user_id = %notification.user_id,
                "notification delivery failed"
            );
        }
    }
}
