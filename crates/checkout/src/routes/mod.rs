//! HTTP route handlers for the checkout service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                            - Liveness (no dependencies)
//! GET  /health/ready                      - Readiness (database ping)
//!
//! # Payments
//! POST /api/checkout                      - Process a checkout
//! GET  /api/payments/{payment_id}         - Query gateway payment status
//! POST /api/payments/{payment_id}/capture - Capture (optionally partial)
//! POST /api/payments/{payment_id}/cancel  - Void (optionally partial)
//! ```
//!
//! All payment routes answer with the service's result envelope: HTTP 200
//! for the success half, 422 for the failure half. The envelope itself is
//! the contract; status codes are a convenience for callers.

pub mod checkout;
pub mod payments;

use axum::{
    Router,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/checkout", post(checkout::process))
        .route("/api/payments/{payment_id}", get(payments::query))
        .route("/api/payments/{payment_id}/capture", post(payments::capture))
        .route("/api/payments/{payment_id}/cancel", post(payments::cancel))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
async fn readiness(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<&'static str, AppError> {
    sqlx::query("SELECT 1")
        .fetch_one(state.pool())
        .await
        .map_err(|e| AppError::Database(e.into()))?;
    Ok("ok")
}
