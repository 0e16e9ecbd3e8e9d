use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemId, NotificationId, OrderId, ShopId, UserId};
use domain::{Item, LineItem, Money, Notification, Order, OrderParts, OrderStatus, Shop};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

use crate::{
    OrderQuery, OrderScope, Result, StoreError,
    store::{MarketStore, StoreTransaction},
};

const ITEM_COLUMNS: &str = "id, shop_id, name, description, price_cents, stock";
const ORDER_COLUMNS: &str =
    "id, customer_id, shop_id, lines, total_cents, status, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, message, read, order_id, created_at";

/// PostgreSQL-backed store implementation.
///
/// Transactions run at READ COMMITTED; every row the engine mutates is
/// read with `SELECT ... FOR UPDATE` first, so concurrent reservations of
/// the same item queue behind each other and each sees the stock left by
/// the previous one.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn row_to_shop(row: &PgRow) -> Result<Shop> {
    Ok(Shop {
        id: ShopId::from_uuid(row.try_get::<Uuid, _>("id")?),
        owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
        name: row.try_get("name")?,
    })
}

fn row_to_item(row: &PgRow) -> Result<Item> {
    let id = ItemId::from_uuid(row.try_get::<Uuid, _>("id")?);
    let stock: i64 = row.try_get("stock")?;
    let stock = u32::try_from(stock)
        .map_err(|_| StoreError::InvalidData(format!("item {id} has stock {stock}")))?;

    let mut item = Item::new(
        id,
        ShopId::from_uuid(row.try_get::<Uuid, _>("shop_id")?),
        row.try_get::<String, _>("name")?,
        Money::from_cents(row.try_get("price_cents")?),
        stock,
    );
    item.description = row.try_get("description")?;
    Ok(item)
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
    let lines: Vec<LineItem> = serde_json::from_value(row.try_get("lines")?)?;
    let status: String = row.try_get("status")?;
    let status: OrderStatus = status
        .parse()
        .map_err(|e| StoreError::InvalidData(format!("order {id}: {e}")))?;

    Ok(Order::from_parts(OrderParts {
        id,
        customer_id: UserId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
        shop_id: ShopId::from_uuid(row.try_get::<Uuid, _>("shop_id")?),
        lines,
        total: Money::from_cents(row.try_get("total_cents")?),
        status,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    }))
}

fn row_to_notification(row: &PgRow) -> Result<Notification> {
    Ok(Notification {
        id: NotificationId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        message: row.try_get("message")?,
        read: row.try_get("read")?,
        order_id: row
            .try_get::<Option<Uuid>, _>("order_id")?
            .map(OrderId::from_uuid),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTransaction { tx })
    }

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>> {
        let row = sqlx::query("SELECT id, owner_id, name FROM shops WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_shop).transpose()
    }

    async fn item(&self, id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE ");
        let mut param_count = 1;

        // Build dynamic query
        let scope_id = match query.scope {
            OrderScope::Customer(customer_id) => {
                sql.push_str("customer_id = $1");
                customer_id.as_uuid()
            }
            OrderScope::Shop(shop_id) => {
                sql.push_str("shop_id = $1");
                shop_id.as_uuid()
            }
        };
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, seq DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql).bind(scope_id);
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status.as_str());
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_order).collect()
    }

    async fn notifications_for(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, seq DESC
            "#
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notifications SET read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_notification).transpose()
    }

    async fn upsert_shop(&self, shop: &Shop) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shops (id, owner_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                name = EXCLUDED.name
            "#,
        )
        .bind(shop.id.as_uuid())
        .bind(shop.owner_id.as_uuid())
        .bind(&shop.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, shop_id, name, description, price_cents, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                shop_id = EXCLUDED.shop_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                updated_at = NOW()
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.shop_id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .bind(i64::from(item.stock()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Unit of work over a [`PostgresMarketStore`], backed by a database transaction.
///
/// Dropping it without calling `commit` rolls the database transaction back.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn shop(&mut self, id: ShopId) -> Result<Option<Shop>> {
        let row = sqlx::query("SELECT id, owner_id, name FROM shops WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_shop).transpose()
    }

    async fn lock_items(&mut self, ids: &[ItemId]) -> Result<Vec<Item>> {
        let uuids: Vec<Uuid> = ids.iter().map(ItemId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(uuids)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn save_item_stock(&mut self, item: &Item) -> Result<()> {
        let result = sqlx::query("UPDATE items SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(item.id.as_uuid())
            .bind(i64::from(item.stock()))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::InvalidData(format!(
                "item {} does not exist",
                item.id
            )));
        }
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let lines = serde_json::to_value(order.lines())?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, shop_id, lines, total_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(order.shop_id().as_uuid())
        .bind(lines)
        .bind(order.total().cents())
        .bind(order.status().as_str())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn save_order_status(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.updated_at())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::InvalidData(format!(
                "order {} does not exist",
                order.id()
            )));
        }
        Ok(())
    }

    async fn insert_notification(&mut self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, read, order_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.order_id.map(|id| id.as_uuid()))
        .bind(notification.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
