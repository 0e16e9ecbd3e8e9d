//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use common::{ItemId, OrderId, ShopId, UserId};
use domain::{Item, LineItem, Money, Notification, Order, OrderStatus, Shop};
use sqlx::PgPool;
use store::{MarketStore, OrderQuery, PostgresMarketStore, StoreError, StoreTransaction};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_marketplace_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresMarketStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE notifications, orders, items, shops")
        .execute(&pool)
        .await
        .unwrap();

    PostgresMarketStore::new(pool)
}

async fn seed_shop(store: &PostgresMarketStore) -> Shop {
    let shop = Shop::new(UserId::new(), "Corner Shop");
    store.upsert_shop(&shop).await.unwrap();
    shop
}

async fn seed_item(store: &PostgresMarketStore, shop: &Shop, stock: u32) -> Item {
    let item = Item::new(
        ItemId::new(),
        shop.id,
        "Widget",
        Money::from_cents(1250),
        stock,
    )
    .with_description("A fine widget");
    store.upsert_item(&item).await.unwrap();
    item
}

fn pending_order(customer: UserId, shop: &Shop, item: &Item, quantity: u32) -> Order {
    Order::place(
        OrderId::new(),
        customer,
        shop.id,
        vec![LineItem::new(item.id, item.name.clone(), item.price, quantity)],
    )
    .unwrap()
    .0
}

#[tokio::test]
async fn upsert_and_read_back_records() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 7).await;

    assert_eq!(store.shop(shop.id).await.unwrap(), Some(shop.clone()));

    let loaded = store.item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded, item);
    assert_eq!(loaded.stock(), 7);

    assert!(store.item(ItemId::new()).await.unwrap().is_none());
    assert!(store.shop(ShopId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn lock_items_returns_sorted_rows_and_skips_missing() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let a = seed_item(&store, &shop, 1).await;
    let b = seed_item(&store, &shop, 2).await;

    let mut tx = store.begin().await.unwrap();
    let locked = tx.lock_items(&[b.id, ItemId::new(), a.id]).await.unwrap();
    tx.rollback().await.unwrap();

    let mut expected = vec![a.id, b.id];
    expected.sort();
    let got: Vec<ItemId> = locked.iter().map(|item| item.id).collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn commit_applies_stock_order_and_notification_together() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 5).await;
    let customer = UserId::new();
    let order = pending_order(customer, &shop, &item, 2);

    let mut tx = store.begin().await.unwrap();
    let mut locked = tx.lock_items(&[item.id]).await.unwrap();
    locked[0].reserve(2).unwrap();
    tx.save_item_stock(&locked[0]).await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.insert_notification(&Notification::order_status(
        customer,
        order.id(),
        OrderStatus::Pending,
    ))
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.item(item.id).await.unwrap().unwrap().stock(), 3);

    let loaded = store.order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.lines(), order.lines());
    assert_eq!(loaded.total(), Money::from_cents(2500));
    assert_eq!(loaded.status(), OrderStatus::Pending);

    assert_eq!(store.notifications_for(customer).await.unwrap().len(), 1);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 5).await;
    let order = pending_order(UserId::new(), &shop, &item, 5);

    {
        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_items(&[item.id]).await.unwrap();
        locked[0].reserve(5).unwrap();
        tx.save_item_stock(&locked[0]).await.unwrap();
        tx.insert_order(&order).await.unwrap();
    }

    assert_eq!(store.item(item.id).await.unwrap().unwrap().stock(), 5);
    assert!(store.order(order.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn status_update_persists() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 5).await;
    let mut order = pending_order(UserId::new(), &shop, &item, 1);

    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let locked = tx.lock_order(order.id()).await.unwrap().unwrap();
    let event = locked.advance(OrderStatus::Confirmed, shop.owner_id).unwrap();
    order.apply(event);
    tx.save_order_status(&order).await.unwrap();
    tx.commit().await.unwrap();

    let loaded = store.order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.status(), OrderStatus::Confirmed);
}

#[tokio::test]
async fn locked_item_blocks_second_transaction_until_commit() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 1).await;

    let mut tx1 = store.begin().await.unwrap();
    let mut locked = tx1.lock_items(&[item.id]).await.unwrap();

    let other = store.clone();
    let item_id = item.id;
    let waiter = tokio::spawn(async move {
        let mut tx2 = other.begin().await.unwrap();
        let seen = tx2.lock_items(&[item_id]).await.unwrap();
        tx2.rollback().await.unwrap();
        seen[0].stock()
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiter.is_finished());

    locked[0].reserve(1).unwrap();
    tx1.save_item_stock(&locked[0]).await.unwrap();
    tx1.commit().await.unwrap();

    // The waiter observes the committed stock, not the stale value
    let seen = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, 0);
}

#[tokio::test]
async fn negative_stock_violates_check_constraint() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 1).await;

    let err = sqlx::query("UPDATE items SET stock = -1 WHERE id = $1")
        .bind(item.id.as_uuid())
        .execute(store.pool())
        .await
        .unwrap_err();

    let err = StoreError::from(err);
    assert!(matches!(err, StoreError::TransactionAborted(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn list_orders_newest_first_with_filters() {
    let store = get_test_store().await;
    let shop = seed_shop(&store).await;
    let item = seed_item(&store, &shop, 10).await;
    let customer = UserId::new();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = pending_order(customer, &shop, &item, 1);
        ids.push(order.id());
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();
    }
    ids.reverse();

    let listed: Vec<OrderId> = store
        .list_orders(OrderQuery::by_customer(customer))
        .await
        .unwrap()
        .iter()
        .map(Order::id)
        .collect();
    assert_eq!(listed, ids);

    let page = store
        .list_orders(OrderQuery::by_shop(shop.id).offset(1).limit(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), ids[1]);

    let pending = store
        .list_orders(OrderQuery::by_shop(shop.id).status(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 3);

    let shipped = store
        .list_orders(OrderQuery::by_shop(shop.id).status(OrderStatus::Shipped))
        .await
        .unwrap();
    assert!(shipped.is_empty());

    let other_customer = store
        .list_orders(OrderQuery::by_customer(UserId::new()))
        .await
        .unwrap();
    assert!(other_customer.is_empty());
}

#[tokio::test]
async fn mark_notification_read_only_for_recipient() {
    let store = get_test_store().await;
    let recipient = UserId::new();
    let notification = Notification::new(recipient, "hello", None);

    let mut tx = store.begin().await.unwrap();
    tx.insert_notification(&notification).await.unwrap();
    tx.commit().await.unwrap();

    let stranger = store
        .mark_notification_read(notification.id, UserId::new())
        .await
        .unwrap();
    assert!(stranger.is_none());

    let marked = store
        .mark_notification_read(notification.id, recipient)
        .await
        .unwrap()
        .unwrap();
    assert!(marked.read);

    let listed = store.notifications_for(recipient).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].read);
}
