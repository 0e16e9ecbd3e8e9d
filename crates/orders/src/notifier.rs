//! Notification delivery collaborator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use domain::Notification;
use thiserror::Error;

/// Delivery failure reported by an emitter.
#[derive(Debug, Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Pushes a stored notification out to its recipient.
///
/// Called only after the transaction that recorded the notification has
/// committed. Failures are reported back but never undo the status change.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Emitter that writes each notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmitter;

#[async_trait]
impl NotificationEmitter for LogEmitter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            order_id = ?notification.order_id.map(|id| id.to_string()),
            message = %notification.message,
            "notification delivered"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryEmitterState {
    delivered: Vec<Notification>,
    fail_deliveries: bool,
}

/// In-memory emitter for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmitter {
    state: Arc<Mutex<InMemoryEmitterState>>,
}

impl InMemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the emitter to reject every delivery while `fail` is set.
    pub fn set_fail_deliveries(&self, fail: bool) {
        self.state().fail_deliveries = fail;
    }

    /// Returns the notifications delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<Notification> {
        self.state().delivered.clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.state().delivered.len()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryEmitterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NotificationEmitter for InMemoryEmitter {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut state = self.state();
        if state.fail_deliveries {
            return Err(NotifyError("recipient unreachable".to_string()));
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    #[tokio::test]
    async fn test_records_deliveries() {
        let emitter = InMemoryEmitter::new();
        let notification = Notification::new(UserId::new(), "hello", None);

        emitter.notify(&notification).await.unwrap();

        assert_eq!(emitter.delivery_count(), 1);
        assert_eq!(emitter.delivered()[0], notification);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let emitter = InMemoryEmitter::new();
        emitter.set_fail_deliveries(true);

        let result = emitter
            .notify(&Notification::new(UserId::new(), "hello", None))
            .await;
        assert!(result.is_err());
        assert_eq!(emitter.delivery_count(), 0);

        emitter.set_fail_deliveries(false);
        emitter
            .notify(&Notification::new(UserId::new(), "again", None))
            .await
            .unwrap();
        assert_eq!(emitter.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_log_emitter_never_fails() {
        let result = LogEmitter
            .notify(&Notification::new(UserId::new(), "hello", None))
            .await;
        assert!(result.is_ok());
    }
}
