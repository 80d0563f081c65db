pub mod common;
pub mod earnings;
pub mod orders;
pub mod payments;
pub mod stores;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        earnings::EarningsService, orders::OrderService, stores::StoreService,
        subscriptions::SubscriptionService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub stores: Arc<StoreService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub earnings: Arc<EarningsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db_pool.clone(), event_sender.clone())),
            stores: Arc::new(StoreService::new(
                db_pool.clone(),
                config.subscription_warning_days,
            )),
            subscriptions: Arc::new(SubscriptionService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.subscription_period_days,
            )),
            earnings: Arc::new(EarningsService::new(db_pool, event_sender)),
        }
    }
}
