pub mod common;
pub mod orders;
pub mod payments;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    notifications::{ConfirmationDispatcher, NotificationGateway},
    services::{
        lifecycle::OrderLifecycle, orders::OrderService, payments::PaymentService,
        pricing::PricingPolicy,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub order: Arc<OrderService>,
    pub payment: Arc<PaymentService>,
}

impl AppServices {
    /// Wires the order and payment services around one lifecycle and notification gateway.
    pub fn new(
        db_pool: Arc<DbPool>,
        gateway: Arc<dyn NotificationGateway>,
        config: &AppConfig,
    ) -> Self {
        let dispatcher = ConfirmationDispatcher::new(gateway, config.notification_timeout());
        let lifecycle = Arc::new(OrderLifecycle::new(db_pool, dispatcher));
        let policy = PricingPolicy::from_config(config);

        Self {
            order: Arc::new(OrderService::new(lifecycle.clone(), policy.clone())),
            payment: Arc::new(PaymentService::new(lifecycle, policy)),
        }
    }
}
