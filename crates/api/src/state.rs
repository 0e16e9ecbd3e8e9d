use orders::{NotificationEmitter, OrderEngine};
use store::MarketStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketStore, N: NotificationEmitter> {
    pub engine: OrderEngine<S, N>,
}

impl<S: MarketStore, N: NotificationEmitter> AppState<S, N> {
    pub fn new(engine: OrderEngine<S, N>) -> Self {
        Self { engine }
    }
}
