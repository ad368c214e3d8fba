//! Database operations for the checkout `PostgreSQL`.
//!
//! # Database: `patinhas_checkout`
//!
//! ## Tables (schema `checkout`)
//!
//! - `customers` - checkout-time customers, created on first purchase
//! - `orders` - orders with payment state and the raw gateway response
//!   snapshot (`vendor_response JSONB`)
//! - `order_items` - line items owned exclusively by their order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/checkout/migrations/` and run via:
//! ```bash
//! cargo run -p patinhas-cli -- migrate
//! ```
//! They are never run automatically on startup.

pub mod customers;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use patinhas_core::{
    CheckoutCustomer, NewOrder, Order, OrderStatus, PaymentId, PaymentStatus,
};

pub use orders::PgOrderStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// The persistence operations the payment service depends on.
///
/// A trait seam so tests can substitute an in-memory store; production
/// wires in [`PgOrderStore`].
pub trait OrderStore: Send + Sync {
    /// Persist a checkout result: find-or-create the customer by email and
    /// insert the order with its items, atomically.
    fn create_order(
        &self,
        customer: &CheckoutCustomer,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Look up an order by its gateway payment id.
    fn order_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Update order and payment status after a capture/void, stamping the
    /// transition timestamps. Returns the updated order.
    fn update_payment_state(
        &self,
        payment_id: &PaymentId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
