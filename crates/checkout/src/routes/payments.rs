//! Payment lifecycle handlers: query, capture, void.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;

use patinhas_core::{Amount, PaymentId};

use crate::state::AppState;

use super::checkout::envelope_response;

/// Optional body for capture/cancel: a partial amount in reais.
#[derive(Debug, Default, Deserialize)]
pub struct AmountBody {
    #[serde(default)]
    pub amount: Option<Amount>,
}

/// `GET /api/payments/{payment_id}` - read-only status query.
pub async fn query(State(state): State<AppState>, Path(payment_id): Path<String>) -> Response {
    let payment_id = PaymentId::new(payment_id);
    envelope_response(state.payments().query_payment(&payment_id).await)
}

/// `POST /api/payments/{payment_id}/capture` - capture an authorized
/// transaction, partially when an amount is supplied.
pub async fn capture(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    body: Option<Json<AmountBody>>,
) -> Response {
    let payment_id = PaymentId::new(payment_id);
    let amount = body.and_then(|Json(b)| b.amount);
    envelope_response(state.payments().capture_payment(&payment_id, amount).await)
}

/// `POST /api/payments/{payment_id}/cancel` - void a transaction, partially
/// when an amount is supplied.
pub async fn cancel(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    body: Option<Json<AmountBody>>,
) -> Response {
    let payment_id = PaymentId::new(payment_id);
    let amount = body.and_then(|Json(b)| b.amount);
    envelope_response(state.payments().cancel_payment(&payment_id, amount).await)
}
