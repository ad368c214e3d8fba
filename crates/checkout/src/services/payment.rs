//! The payment orchestrator.
//!
//! Single entry point from checkout submission to persisted order: builds
//! the gateway request for the chosen payment method, persists the outcome,
//! and maps gateway status codes into the domain vocabulary. The service
//! NEVER returns an error to its caller - every path, including gateway and
//! persistence failures, produces the uniform [`PaymentOutcome`] envelope.
//!
//! For a single checkout the ordering is fixed: gateway call happens-before
//! order persistence happens-before the (best-effort) confirmation email.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, instrument, warn};

use patinhas_core::{
    Amount, CheckoutRequest, NewOrder, OrderRef, OrderStatus, PaymentId, PaymentMethod,
    PaymentStatus,
};

use crate::cielo::types::{BoletoPayment, CreditCardPayment, CustomerData, PixPayment};
use crate::cielo::{CieloError, PaymentGateway};
use crate::db::{OrderStore, RepositoryError};

use super::email::EmailService;

/// Statement descriptor shown on credit card bills.
const SOFT_DESCRIPTOR: &str = "PATINHAS";

/// Internal failure taxonomy; collapsed into the rejection envelope before
/// leaving the service.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway call failed (already normalized).
    #[error(transparent)]
    Gateway(#[from] CieloError),

    /// Persisting the order failed after the gateway call.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The payment method is defined on the wire but not processable.
    #[error("payment method '{0}' is not supported")]
    UnsupportedMethod(&'static str),

    /// The checkout carried no line items.
    #[error("checkout has no items")]
    EmptyCart,
}

/// The uniform result envelope.
///
/// Wire shape on success: `{success, orderId, paymentId, status,
/// transactionDetails}`; on failure: `{success, error, statusCode?,
/// details?}`. Callers (API routes) translate this into an HTTP response;
/// the service itself never throws.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentOutcome {
    Approved(PaymentConfirmation),
    Rejected(PaymentRejection),
}

/// Success half of the envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    /// Always `true`.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    pub status: PaymentStatus,
    /// Raw gateway response, passed through for the caller (QR codes,
    /// boleto URLs, authentication URLs all live here).
    pub transaction_details: serde_json::Value,
}

/// Failure half of the envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRejection {
    /// Always `false`.
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PaymentOutcome {
    fn approved(
        order_id: Option<OrderRef>,
        payment_id: Option<PaymentId>,
        status: PaymentStatus,
        transaction_details: serde_json::Value,
    ) -> Self {
        Self::Approved(PaymentConfirmation {
            success: true,
            order_id,
            payment_id,
            status,
            transaction_details,
        })
    }

    /// Collapse an internal failure into the rejection envelope, logging it
    /// at the appropriate level on the way out.
    fn from_error(err: PaymentError) -> Self {
        let rejection = match err {
            PaymentError::Gateway(CieloError::Api {
                status,
                message,
                details,
                ..
            }) => {
                warn!(status, error = %message, "gateway rejected payment");
                PaymentRejection {
                    success: false,
                    error: message,
                    status_code: Some(status),
                    details,
                }
            }
            PaymentError::Gateway(err @ CieloError::MissingCredentials) => {
                error!(error = %err, "gateway misconfigured");
                PaymentRejection {
                    success: false,
                    error: err.to_string(),
                    status_code: None,
                    details: None,
                }
            }
            PaymentError::Repository(err) => {
                error!(error = %err, "order persistence failed");
                PaymentRejection {
                    success: false,
                    error: "failed to persist order".to_string(),
                    status_code: None,
                    details: None,
                }
            }
            err @ (PaymentError::UnsupportedMethod(_) | PaymentError::EmptyCart) => {
                warn!(error = %err, "checkout rejected");
                PaymentRejection {
                    success: false,
                    error: err.to_string(),
                    status_code: None,
                    details: None,
                }
            }
        };
        Self::Rejected(rejection)
    }

    /// Whether this is the success half of the envelope.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Approved(_))
    }
}

/// Domain-level payment orchestrator.
///
/// Gateway and store are injected at construction - built once at process
/// start, no module-level singletons - which is also what lets tests swap
/// in fakes.
pub struct PaymentService<G, S> {
    gateway: G,
    store: S,
    notifier: Option<EmailService>,
}

impl<G: PaymentGateway, S: OrderStore> PaymentService<G, S> {
    /// Create a service without a confirmation-email notifier.
    pub const fn new(gateway: G, store: S) -> Self {
        Self {
            gateway,
            store,
            notifier: None,
        }
    }

    /// Create a service that sends best-effort confirmation emails.
    pub const fn with_notifier(gateway: G, store: S, notifier: EmailService) -> Self {
        Self {
            gateway,
            store,
            notifier: Some(notifier),
        }
    }

    /// Process one checkout into a created (or failed) order.
    #[instrument(skip(self, checkout), fields(method = checkout.payment_method.kind()))]
    pub async fn process_payment(&self, checkout: CheckoutRequest) -> PaymentOutcome {
        match self.try_process(checkout).await {
            Ok(outcome) => outcome,
            Err(err) => PaymentOutcome::from_error(err),
        }
    }

    async fn try_process(&self, checkout: CheckoutRequest) -> Result<PaymentOutcome, PaymentError> {
        if checkout.items.is_empty() {
            return Err(PaymentError::EmptyCart);
        }

        let order_ref = OrderRef::generate();
        // Totals are recomputed from the line items plus shipping; client
        // supplied totals are never trusted.
        let total = checkout.total();
        let customer = CustomerData::from(&checkout.customer);
        let method_kind = checkout.payment_method.kind();

        let response = match checkout.payment_method.clone() {
            PaymentMethod::CreditCard {
                card,
                installments,
                capture,
            } => {
                self.gateway
                    .create_credit_card_payment(CreditCardPayment {
                        order_ref: order_ref.clone(),
                        customer,
                        amount: total,
                        card,
                        installments,
                        capture,
                        soft_descriptor: SOFT_DESCRIPTOR.to_string(),
                    })
                    .await?
            }
            // The debit request/response shapes exist end to end, but the
            // capture semantics after redirect authentication were never
            // settled; refuse at the service boundary.
            PaymentMethod::DebitCard { .. } => {
                return Err(PaymentError::UnsupportedMethod("debito"));
            }
            PaymentMethod::Pix { expiration_minutes } => {
                self.gateway
                    .create_pix_payment(PixPayment {
                        order_ref: order_ref.clone(),
                        customer,
                        amount: total,
                        expiration_minutes,
                    })
                    .await?
            }
            PaymentMethod::Boleto {
                due_date,
                instructions,
                boleto_number,
            } => {
                self.gateway
                    .create_boleto_payment(BoletoPayment {
                        order_ref: order_ref.clone(),
                        customer,
                        amount: total,
                        due_date,
                        instructions,
                        demonstrative: None,
                        boleto_number,
                    })
                    .await?
            }
        };

        let payment_status =
            PaymentStatus::from_vendor_code(response.body.payment.status.unwrap_or(0));
        let payment_id = response.body.payment.payment_id.clone().map(PaymentId::new);

        let order = self
            .store
            .create_order(
                &checkout.customer,
                NewOrder {
                    reference: order_ref,
                    items: checkout.items.clone(),
                    shipping_cost: checkout.shipping_cost,
                    total,
                    status: OrderStatus::Pending,
                    payment_method: method_kind.to_string(),
                    payment_status,
                    payment_id: payment_id.clone(),
                    vendor_response: response.raw.clone(),
                },
            )
            .await?;

        self.notify(&checkout, &order).await;

        Ok(PaymentOutcome::approved(
            Some(order.reference),
            payment_id,
            payment_status,
            response.raw,
        ))
    }

    /// Read-only status query against the gateway's query host.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn query_payment(&self, payment_id: &PaymentId) -> PaymentOutcome {
        match self.gateway.get_transaction(payment_id).await {
            Ok(response) => {
                let status =
                    PaymentStatus::from_vendor_code(response.body.payment.status.unwrap_or(0));
                let order_ref = match response.body.merchant_order_id {
                    Some(reference) => Some(OrderRef::new(reference)),
                    // Older transactions don't echo the merchant order id;
                    // fall back to the locally persisted order.
                    None => self
                        .store
                        .order_by_payment_id(payment_id)
                        .await
                        .ok()
                        .flatten()
                        .map(|order| order.reference),
                };
                PaymentOutcome::approved(
                    order_ref,
                    Some(payment_id.clone()),
                    status,
                    response.raw,
                )
            }
            Err(err) => PaymentOutcome::from_error(err.into()),
        }
    }

    /// Capture an authorized transaction (fully, or partially with
    /// `amount`) and move the order to `processing`.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn capture_payment(
        &self,
        payment_id: &PaymentId,
        amount: Option<Amount>,
    ) -> PaymentOutcome {
        match self.try_update(payment_id, amount, OrderStatus::Processing, false).await {
            Ok(outcome) => outcome,
            Err(err) => PaymentOutcome::from_error(err),
        }
    }

    /// Void a transaction (fully, or partially with `amount`) and cancel
    /// the order, stamping `cancelled_at`.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn cancel_payment(
        &self,
        payment_id: &PaymentId,
        amount: Option<Amount>,
    ) -> PaymentOutcome {
        match self.try_update(payment_id, amount, OrderStatus::Cancelled, true).await {
            Ok(outcome) => outcome,
            Err(err) => PaymentOutcome::from_error(err),
        }
    }

    async fn try_update(
        &self,
        payment_id: &PaymentId,
        amount: Option<Amount>,
        order_status: OrderStatus,
        void: bool,
    ) -> Result<PaymentOutcome, PaymentError> {
        let amount_cents = amount.map(|a| a.as_cents());
        let response = if void {
            self.gateway.cancel_transaction(payment_id, amount_cents).await?
        } else {
            self.gateway.capture_transaction(payment_id, amount_cents).await?
        };

        let payment_status = PaymentStatus::from_vendor_code(response.body.status.unwrap_or(0));

        // The gateway-side effect is already applied at this point; if the
        // order is missing locally the rejection envelope surfaces that
        // inconsistency rather than hiding it.
        let order = self
            .store
            .update_payment_state(payment_id, order_status, payment_status)
            .await?;

        Ok(PaymentOutcome::approved(
            Some(order.reference),
            Some(payment_id.clone()),
            payment_status,
            response.raw,
        ))
    }

    async fn notify(&self, checkout: &CheckoutRequest, order: &patinhas_core::Order) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(err) = notifier
            .send_order_confirmation(&checkout.customer, order)
            .await
        {
            warn!(
                order_ref = %order.reference,
                error = %err,
                "order confirmation email failed"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_envelope_wire_keys() {
        let outcome = PaymentOutcome::approved(
            Some(OrderRef::new("ORD-0a1b2c3d")),
            Some(PaymentId::new("24bc8366")),
            PaymentStatus::Pending,
            serde_json::json!({"Payment": {"Status": 1}}),
        );

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["orderId"], "ORD-0a1b2c3d");
        assert_eq!(json["paymentId"], "24bc8366");
        assert_eq!(json["status"], "pendente");
        assert_eq!(json["transactionDetails"]["Payment"]["Status"], 1);
    }

    #[test]
    fn test_rejection_envelope_wire_keys() {
        let outcome = PaymentOutcome::from_error(PaymentError::Gateway(CieloError::Api {
            status: 422,
            code: Some(126),
            message: "Credit Card Expiration Date is invalid".to_string(),
            details: Some(serde_json::json!([{"Code": 126}])),
        }));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Credit Card Expiration Date is invalid");
        assert_eq!(json["statusCode"], 422);
        assert_eq!(json["details"][0]["Code"], 126);
    }

    #[test]
    fn test_rejection_envelope_omits_absent_fields() {
        let outcome = PaymentOutcome::from_error(PaymentError::EmptyCart);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "checkout has no items");
        assert_eq!(json.get("statusCode"), None);
        assert_eq!(json.get("details"), None);
    }

    #[test]
    fn test_unsupported_method_message() {
        let outcome =
            PaymentOutcome::from_error(PaymentError::UnsupportedMethod("debito"));
        assert!(!outcome.is_success());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "payment method 'debito' is not supported");
    }

    #[test]
    fn test_repository_failure_uses_generic_message() {
        let outcome = PaymentOutcome::from_error(PaymentError::Repository(
            RepositoryError::NotFound,
        ));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "failed to persist order");
        assert_eq!(json.get("statusCode"), None);
    }
}
