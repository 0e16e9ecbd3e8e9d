//! Notification inbox endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::NotificationId;
use domain::Notification;
use orders::NotificationEmitter;
use serde::Serialize;
use store::MarketStore;

use super::orders::parse_id;
use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub message: String,
    pub read: bool,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.to_string(),
            message: n.message.clone(),
            read: n.read,
            order_id: n.order_id.map(|id| id.to_string()),
            created_at: n.created_at,
        }
    }
}

/// GET /api/notifications: the caller's notifications, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(user_id): Actor,
) -> Result<Json<Vec<NotificationResponse>>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let notifications = state.engine.notifications(user_id).await?;
    Ok(Json(
        notifications
            .iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

/// PUT /api/notifications/{id}/read
#[tracing::instrument(skip(state))]
pub async fn mark_read<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Actor(user_id): Actor,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError>
where
    S: MarketStore + 'static,
    N: NotificationEmitter + 'static,
{
    let notification_id: NotificationId = parse_id("notification id", &id)?;
    let notification = state
        .engine
        .mark_notification_read(notification_id, user_id)
        .await?;
    Ok(Json(NotificationResponse::from(&notification)))
}
