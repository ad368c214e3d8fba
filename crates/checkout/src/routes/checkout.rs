//! Checkout submission handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use patinhas_core::CheckoutRequest;

use crate::services::PaymentOutcome;
use crate::state::AppState;

/// `POST /api/checkout` - run a checkout through the payment service.
///
/// The response body is always the payment envelope; the status code just
/// mirrors its `success` flag.
pub async fn process(State(state): State<AppState>, Json(request): Json<CheckoutRequest>) -> Response {
    let outcome = state.payments().process_payment(request).await;
    envelope_response(outcome)
}

/// Envelope-to-HTTP translation shared by the payment routes.
pub(super) fn envelope_response(outcome: PaymentOutcome) -> Response {
    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(outcome)).into_response()
}
