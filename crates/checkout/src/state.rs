//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cielo::CieloClient;
use crate::config::CheckoutConfig;
use crate::db::PgOrderStore;
use crate::services::PaymentService;

/// The concrete payment service the binary wires together.
pub type CheckoutPaymentService = PaymentService<CieloClient, PgOrderStore>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    pool: PgPool,
    payments: CheckoutPaymentService,
}

impl AppState {
    /// Bundle the state constructed at startup.
    #[must_use]
    pub fn new(config: CheckoutConfig, pool: PgPool, payments: CheckoutPaymentService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn payments(&self) -> &CheckoutPaymentService {
        &self.inner.payments
    }
}
