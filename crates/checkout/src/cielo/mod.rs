//! Cielo e-commerce API client.
//!
//! Translates domain payment requests into gateway API calls and back, for
//! credit card, debit card, PIX, and boleto transactions, plus the
//! capture/void/query operations on existing transactions.
//!
//! # Architecture
//!
//! - `client` - the HTTP client; sandbox/production hosts selected by
//!   configuration, `MerchantId`/`MerchantKey`/`RequestId` headers on every
//!   request
//! - `types` - gateway wire types (PascalCase JSON) and the pure request
//!   builders
//! - `retry` - bounded exponential backoff around every call
//!
//! The [`PaymentGateway`] trait is the seam the payment service depends on;
//! [`CieloClient`] is the production implementation.

pub mod client;
pub mod retry;
pub mod types;

pub use client::CieloClient;
pub use retry::{RetryPolicy, with_retry};

use serde::Deserialize;
use thiserror::Error;

use patinhas_core::PaymentId;

use types::{
    BoletoPayment, CreditCardPayment, DebitCardPayment, GatewayResponse, PixPayment,
    SaleResponse, SaleUpdateResponse,
};

/// HTTP statuses the gateway returns for client-side mistakes (bad
/// credentials, malformed or unprocessable requests). Retrying these cannot
/// succeed.
const NON_RETRIABLE_STATUSES: [u16; 4] = [400, 401, 403, 422];

/// Errors that can occur when interacting with the Cielo API.
///
/// Anything that is not already a gateway error - connection failures,
/// timeouts, undecodable bodies - is normalized into [`CieloError::Api`]
/// with status 500 by the `From` conversions below, so callers only ever
/// see the gateway taxonomy.
#[derive(Debug, Error)]
pub enum CieloError {
    /// Merchant credentials are absent. Raised at construction; the client
    /// never starts in a degraded mode.
    #[error("Cielo merchant credentials are not configured")]
    MissingCredentials,

    /// The gateway rejected or failed the request.
    #[error("Cielo API error (status {status}): {message}")]
    Api {
        /// HTTP status of the gateway response (500 for normalized
        /// network/decoding failures).
        status: u16,
        /// Vendor error code, when the body carried one.
        code: Option<i64>,
        /// Human-readable message.
        message: String,
        /// Raw vendor error payload, when one was returned.
        details: Option<serde_json::Value>,
    },
}

impl CieloError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Statuses 400, 401, 403, and 422 are client errors - bad auth, bad
    /// data - and are surfaced after exactly one attempt. Everything else
    /// (5xx, timeouts, connection resets) is considered transient.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::MissingCredentials => false,
            Self::Api { status, .. } => !NON_RETRIABLE_STATUSES.contains(status),
        }
    }

    /// The HTTP status attached to the error, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::MissingCredentials => None,
        }
    }

    /// Build an error from a non-success gateway response body.
    ///
    /// The gateway reports errors as `[{"Code": ..., "Message": ...}]`;
    /// bodies that don't parse are carried as plain text.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Vec<ApiErrorEntry>> = serde_json::from_str(body).ok();
        let details = serde_json::from_str(body).ok();

        match parsed.as_ref().and_then(|entries| entries.first()) {
            Some(entry) => Self::Api {
                status,
                code: entry.code,
                message: entry.message.clone(),
                details,
            },
            None => Self::Api {
                status,
                code: None,
                message: if body.trim().is_empty() {
                    format!("gateway returned status {status}")
                } else {
                    body.trim().to_string()
                },
                details,
            },
        }
    }
}

impl From<reqwest::Error> for CieloError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api {
            status: 500,
            code: None,
            message: format!("gateway request failed: {err}"),
            details: None,
        }
    }
}

impl From<serde_json::Error> for CieloError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api {
            status: 500,
            code: None,
            message: format!("gateway response could not be decoded: {err}"),
            details: None,
        }
    }
}

/// One entry of the gateway's error array body.
#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(rename = "Code")]
    code: Option<i64>,
    #[serde(rename = "Message")]
    message: String,
}

/// The gateway operations the payment service depends on.
///
/// A trait seam so tests can substitute a fake; production wires in
/// [`CieloClient`]. Constructed once at process start and passed in
/// explicitly - no module-level singletons.
pub trait PaymentGateway: Send + Sync {
    /// Create a credit card sale (authorize, optionally capture).
    fn create_credit_card_payment(
        &self,
        payment: CreditCardPayment,
    ) -> impl Future<Output = Result<GatewayResponse<SaleResponse>, CieloError>> + Send;

    /// Create a debit card sale with redirect authentication.
    fn create_debit_card_payment(
        &self,
        payment: DebitCardPayment,
    ) -> impl Future<Output = Result<GatewayResponse<SaleResponse>, CieloError>> + Send;

    /// Create a PIX sale; the response carries the QR code artifacts.
    fn create_pix_payment(
        &self,
        payment: PixPayment,
    ) -> impl Future<Output = Result<GatewayResponse<SaleResponse>, CieloError>> + Send;

    /// Create a boleto sale; the response carries the slip URL and numbers.
    fn create_boleto_payment(
        &self,
        payment: BoletoPayment,
    ) -> impl Future<Output = Result<GatewayResponse<SaleResponse>, CieloError>> + Send;

    /// Capture an authorized transaction, partially when `amount_cents` is
    /// given.
    fn capture_transaction(
        &self,
        payment_id: &PaymentId,
        amount_cents: Option<i64>,
    ) -> impl Future<Output = Result<GatewayResponse<SaleUpdateResponse>, CieloError>> + Send;

    /// Void a transaction, partially when `amount_cents` is given.
    fn cancel_transaction(
        &self,
        payment_id: &PaymentId,
        amount_cents: Option<i64>,
    ) -> impl Future<Output = Result<GatewayResponse<SaleUpdateResponse>, CieloError>> + Send;

    /// Read-only status query against the query API host.
    fn get_transaction(
        &self,
        payment_id: &PaymentId,
    ) -> impl Future<Output = Result<GatewayResponse<SaleResponse>, CieloError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_statuses_are_not_retriable() {
        for status in [400, 401, 403, 422] {
            let err = CieloError::Api {
                status,
                code: None,
                message: "rejected".to_string(),
                details: None,
            };
            assert!(!err.is_retriable(), "status {status} must not be retried");
        }
    }

    #[test]
    fn test_server_errors_are_retriable() {
        for status in [500, 502, 503, 504] {
            let err = CieloError::Api {
                status,
                code: None,
                message: "upstream broke".to_string(),
                details: None,
            };
            assert!(err.is_retriable(), "status {status} must be retried");
        }
    }

    #[test]
    fn test_missing_credentials_not_retriable() {
        assert!(!CieloError::MissingCredentials.is_retriable());
    }

    #[test]
    fn test_from_response_parses_error_array() {
        let body = r#"[{"Code": 126, "Message": "Credit Card Expiration Date is invalid"}]"#;
        let err = CieloError::from_response(400, body);
        match err {
            CieloError::Api {
                status,
                code,
                message,
                details,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, Some(126));
                assert_eq!(message, "Credit Card Expiration Date is invalid");
                assert!(details.is_some());
            }
            CieloError::MissingCredentials => panic!("expected Api error"),
        }
    }

    #[test]
    fn test_from_response_handles_unparseable_body() {
        let err = CieloError::from_response(502, "Bad Gateway");
        match err {
            CieloError::Api {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(code, None);
                assert_eq!(message, "Bad Gateway");
            }
            CieloError::MissingCredentials => panic!("expected Api error"),
        }
    }

    #[test]
    fn test_from_response_empty_body() {
        let err = CieloError::from_response(503, "");
        assert_eq!(
            err.to_string(),
            "Cielo API error (status 503): gateway returned status 503"
        );
    }

    #[test]
    fn test_network_failure_normalizes_to_500() {
        // serde_json errors take the same normalization path as reqwest ones
        let parse_err =
            serde_json::from_str::<serde_json::Value>("{").expect_err("must not parse");
        let err = CieloError::from(parse_err);
        assert_eq!(err.status_code(), Some(500));
        assert!(err.is_retriable());
    }
}
