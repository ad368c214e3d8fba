//! Cielo API HTTP client.
//!
//! Sends sale/capture/void/query requests to the gateway with merchant
//! credentials and a fresh `RequestId` per attempt, wrapping every call in
//! the bounded-backoff retry helper. Card numbers are masked in every log
//! line; the full PAN only ever appears inside the request body.

use std::sync::Arc;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use patinhas_core::PaymentId;

use crate::config::CieloConfig;

use super::retry::{RetryPolicy, with_retry};
use super::types::{
    BoletoPayment, CreditCardPayment, DebitCardPayment, GatewayResponse, PixPayment, SaleRequest,
    SaleResponse, SaleUpdateResponse,
};
use super::{CieloError, PaymentGateway};

/// Cielo API client.
///
/// Cheap to clone; all state lives behind an `Arc`. Construct once at
/// process start and hand it to the payment service.
#[derive(Clone)]
pub struct CieloClient {
    inner: Arc<CieloClientInner>,
}

struct CieloClientInner {
    client: reqwest::Client,
    merchant_id: String,
    merchant_key: SecretString,
    /// Transactional API host.
    api_base: String,
    /// Read-only query API host.
    query_base: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CieloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CieloClient")
            .field("merchant_id", &self.inner.merchant_id)
            .field("merchant_key", &"[REDACTED]")
            .field("api_base", &self.inner.api_base)
            .field("query_base", &self.inner.query_base)
            .finish_non_exhaustive()
    }
}

impl CieloClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CieloError::MissingCredentials`] when the merchant id or
    /// key is empty - fail fast, no silent degraded mode - or a normalized
    /// error if the HTTP client cannot be built.
    pub fn new(config: &CieloConfig) -> Result<Self, CieloError> {
        if config.merchant_id.trim().is_empty()
            || config.merchant_key.expose_secret().trim().is_empty()
        {
            return Err(CieloError::MissingCredentials);
        }

        let client = reqwest::Client::builder()
            .timeout(config.environment.request_timeout())
            .build()?;

        Ok(Self {
            inner: Arc::new(CieloClientInner {
                client,
                merchant_id: config.merchant_id.clone(),
                merchant_key: config.merchant_key.clone(),
                api_base: config.environment.api_base().to_string(),
                query_base: config.environment.query_base().to_string(),
                retry: config.retry,
            }),
        })
    }

    /// The configured merchant id (used for boleto identification).
    #[must_use]
    pub fn merchant_id(&self) -> &str {
        &self.inner.merchant_id
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Send one request and decode the response, keeping the raw body.
    ///
    /// A fresh `RequestId` is generated here, i.e. per attempt - retries are
    /// distinguishable on the gateway side, and idempotency rests on
    /// `MerchantOrderId` alone.
    async fn send<T: DeserializeOwned + Default>(
        &self,
        method: Method,
        url: String,
        query: Option<(&str, i64)>,
        body: Option<&SaleRequest>,
    ) -> Result<GatewayResponse<T>, CieloError> {
        let mut request = self
            .inner
            .client
            .request(method, url)
            .header("MerchantId", &self.inner.merchant_id)
            .header("MerchantKey", self.inner.merchant_key.expose_secret())
            .header("RequestId", Uuid::new_v4().to_string());

        if let Some(pair) = query {
            request = request.query(&[pair]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(CieloError::from_response(status.as_u16(), &text));
        }

        // Capture/void responses can be bodyless on some acquirers.
        let raw: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        let body: T = if raw.is_null() {
            T::default()
        } else {
            serde_json::from_value(raw.clone())?
        };

        Ok(GatewayResponse { body, raw })
    }

    async fn post_sale(
        &self,
        request: SaleRequest,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        let url = format!("{}/1/sales", self.inner.api_base);
        with_retry(&self.inner.retry, || {
            self.send(Method::POST, url.clone(), None, Some(&request))
        })
        .await
    }
}

impl PaymentGateway for CieloClient {
    #[instrument(
        skip(self, payment),
        fields(order_ref = %payment.order_ref, amount_cents = payment.amount.as_cents())
    )]
    async fn create_credit_card_payment(
        &self,
        payment: CreditCardPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        debug!(
            card = %payment.card.masked_number(),
            installments = payment.installments,
            capture = payment.capture,
            "creating credit card payment"
        );
        self.post_sale(payment.into_sale_request()).await
    }

    #[instrument(
        skip(self, payment),
        fields(order_ref = %payment.order_ref, amount_cents = payment.amount.as_cents())
    )]
    async fn create_debit_card_payment(
        &self,
        payment: DebitCardPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        debug!(
            card = %payment.card.masked_number(),
            "creating debit card payment with authentication"
        );
        self.post_sale(payment.into_sale_request()).await
    }

    #[instrument(
        skip(self, payment),
        fields(order_ref = %payment.order_ref, amount_cents = payment.amount.as_cents())
    )]
    async fn create_pix_payment(
        &self,
        payment: PixPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        debug!("creating PIX payment");
        self.post_sale(payment.into_sale_request()).await
    }

    #[instrument(
        skip(self, payment),
        fields(order_ref = %payment.order_ref, amount_cents = payment.amount.as_cents())
    )]
    async fn create_boleto_payment(
        &self,
        payment: BoletoPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        debug!("creating boleto payment");
        let request = payment.into_sale_request(&self.inner.merchant_id);
        self.post_sale(request).await
    }

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    async fn capture_transaction(
        &self,
        payment_id: &PaymentId,
        amount_cents: Option<i64>,
    ) -> Result<GatewayResponse<SaleUpdateResponse>, CieloError> {
        let url = format!("{}/1/sales/{payment_id}/capture", self.inner.api_base);
        with_retry(&self.inner.retry, || {
            self.send(
                Method::PUT,
                url.clone(),
                amount_cents.map(|cents| ("amount", cents)),
                None,
            )
        })
        .await
    }

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    async fn cancel_transaction(
        &self,
        payment_id: &PaymentId,
        amount_cents: Option<i64>,
    ) -> Result<GatewayResponse<SaleUpdateResponse>, CieloError> {
        let url = format!("{}/1/sales/{payment_id}/void", self.inner.api_base);
        with_retry(&self.inner.retry, || {
            self.send(
                Method::PUT,
                url.clone(),
                amount_cents.map(|cents| ("amount", cents)),
                None,
            )
        })
        .await
    }

    #[instrument(skip(self), fields(payment_id = %payment_id))]
    async fn get_transaction(
        &self,
        payment_id: &PaymentId,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        let url = format!("{}/1/sales/{payment_id}", self.inner.query_base);
        with_retry(&self.inner.retry, || {
            self.send(Method::GET, url.clone(), None, None)
        })
        .await
    }
}
