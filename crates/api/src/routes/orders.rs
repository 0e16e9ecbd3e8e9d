//! Order placement, lifecycle and listing endpoints.

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ItemId, OrderId, ShopId};
use domain::{LineItem, Order, OrderStatus};
use orders::{NotificationEmitter, OrderFilter, PlaceOrder};
use serde::{Deserialize, Serialize};
use store::MarketStore;

use crate::error::ApiError;
use crate::extract::{Actor, JsonBody};
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub shop_id: String,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ShopOrdersParams {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct PlacedOrderResponse {
    pub order_id: String,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub shop_id: String,
    pub status: OrderStatus,
    pub items: Vec<LineItemResponse>,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub item_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

impl From<&LineItem> for LineItemResponse {
    fn from(line: &LineItem) -> Self {
        Self {
            item_id: line.item_id.to_string(),
            name: line.name.clone(),
            unit_price_cents: line.unit_price.cents(),
            quantity: line.quantity,
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order.customer_id().to_string(),
            shop_id: order.shop_id().to_string(),
            status: order.status(),
            items: order.lines().iter().map(LineItemResponse::from).collect(),
            total_cents: order.total().cents(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /api/orders: reserve stock and place an order as the caller.
#[tracing::instrument(skip(state, req))]
pub async fn place<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(customer_id): Actor,
    JsonBody(req): JsonBody<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrderResponse>), ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let shop_id: ShopId = parse_id("shop_id", &req.shop_id)?;
    let mut cmd = PlaceOrder::new(customer_id, shop_id);
    for line in &req.items {
        let item_id: ItemId = parse_id("item_id", &line.item_id)?;
        cmd = cmd.line(item_id, line.quantity);
    }

    let placed = state.engine.place_order(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlacedOrderResponse {
            order_id: placed.order_id.to_string(),
            total_cents: placed.total.cents(),
        }),
    ))
}

/// GET /api/orders/mine: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn mine<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(customer_id): Actor,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let orders = state
        .engine
        .list_orders(OrderFilter::ByCustomer(customer_id))
        .await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/shop/{shop_id}: a shop's orders, for its owner.
#[tracing::instrument(skip(state))]
pub async fn by_shop<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(actor): Actor,
    Path(shop_id): Path<String>,
    Query(params): Query<ShopOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let shop_id: ShopId = parse_id("shop_id", &shop_id)?;
    let status = params.status.as_deref().map(parse_status).transpose()?;

    let orders = state
        .engine
        .list_orders(OrderFilter::ByShop {
            shop_id,
            actor,
            status,
        })
        .await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let order_id: OrderId = parse_id("order id", &id)?;
    let order = state.engine.get_order(order_id, actor).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /api/orders/{id}/status: shop owner moves the order forward.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let order_id: OrderId = parse_id("order id", &id)?;
    let status = parse_status(&req.status)?;

    let order = state.engine.update_status(order_id, actor, status).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /api/orders/{id}/cancel: customer cancels a pending order.
#[tracing::instrument(skip(state))]
pub async fn cancel<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let order_id: OrderId = parse_id("order id", &id)?;
    let order = state.engine.cancel_order(order_id, actor).await?;
    Ok(Json(OrderResponse::from(&order)))
}

pub(crate) fn parse_id<T: FromStr>(field: &str, value: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}

fn parse_status(value: &str) -> Result<OrderStatus, ApiError> {
    value
        .parse()
        .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))
}
