//! Integration test support for Patinhas.
//!
//! Provides in-process fakes for the two seams the payment service depends
//! on - the gateway and the order store - so checkout flows can run end to
//! end without the network or a database:
//!
//! - [`FakeGateway`] builds the real wire requests (through the same
//!   builders production uses), records them for assertions, and answers
//!   with scripted gateway responses.
//! - [`MemoryStore`] keeps orders and customers in memory with the same
//!   find-or-create and status-stamping semantics as the Postgres store.
//!
//! ```bash
//! cargo test -p patinhas-integration-tests
//! ```

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::json;

use patinhas_checkout::cielo::types::{
    BoletoPayment, CreditCardPayment, DebitCardPayment, GatewayResponse, PixPayment, SaleRequest,
    SaleResponse, SaleUpdateResponse,
};
use patinhas_checkout::cielo::{CieloError, PaymentGateway};
use patinhas_checkout::db::{OrderStore, RepositoryError};
use patinhas_core::{
    CheckoutCustomer, CustomerId, NewOrder, Order, OrderId, OrderStatus, PaymentId, PaymentStatus,
};

/// Merchant id the fake pretends to be configured with.
pub const FAKE_MERCHANT_ID: &str = "f47ac10b58cc4372a567";

/// Everything the fake gateway saw, for assertions.
#[derive(Debug, Default)]
pub struct Recorded {
    /// Wire requests built for `POST /1/sales`.
    pub sales: Vec<SaleRequest>,
    /// Capture calls: payment id and optional partial amount (cents).
    pub captures: Vec<(PaymentId, Option<i64>)>,
    /// Void calls: payment id and optional partial amount (cents).
    pub voids: Vec<(PaymentId, Option<i64>)>,
    /// Query calls.
    pub queries: Vec<PaymentId>,
}

struct FakeGatewayInner {
    sale_status: AtomicI64,
    update_status: AtomicI64,
    /// When non-zero, every call fails with this HTTP status.
    fail_status: AtomicU16,
    payment_id: Mutex<String>,
    last_order_ref: Mutex<Option<String>>,
    recorded: Mutex<Recorded>,
}

/// Scripted in-memory [`PaymentGateway`].
#[derive(Clone)]
pub struct FakeGateway {
    inner: Arc<FakeGatewayInner>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    /// A gateway that authorizes everything with `Payment.Status = 1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeGatewayInner {
                sale_status: AtomicI64::new(1),
                update_status: AtomicI64::new(2),
                fail_status: AtomicU16::new(0),
                payment_id: Mutex::new("24bc8366-fc31-4d6c-8555-17049a836a07".to_string()),
                last_order_ref: Mutex::new(None),
                recorded: Mutex::new(Recorded::default()),
            }),
        }
    }

    /// Script the `Payment.Status` returned for new sales.
    pub fn set_sale_status(&self, status: i64) {
        self.inner.sale_status.store(status, Ordering::SeqCst);
    }

    /// Script the `Status` returned for capture/void calls.
    pub fn set_update_status(&self, status: i64) {
        self.inner.update_status.store(status, Ordering::SeqCst);
    }

    /// Make every call fail with the given HTTP status.
    pub fn fail_with_status(&self, status: u16) {
        self.inner.fail_status.store(status, Ordering::SeqCst);
    }

    /// The payment id the fake hands out.
    #[must_use]
    pub fn payment_id(&self) -> PaymentId {
        PaymentId::new(self.inner.payment_id.lock().unwrap().clone())
    }

    /// Run assertions against everything the gateway recorded.
    pub fn with_recorded<R>(&self, f: impl FnOnce(&Recorded) -> R) -> R {
        f(&self.inner.recorded.lock().unwrap())
    }

    fn check_failure(&self) -> Result<(), CieloError> {
        let status = self.inner.fail_status.load(Ordering::SeqCst);
        if status == 0 {
            return Ok(());
        }
        Err(CieloError::from_response(
            status,
            r#"[{"Code": 126, "Message": "scripted gateway failure"}]"#,
        ))
    }

    fn record_sale(&self, request: SaleRequest) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        self.check_failure()?;

        let order_ref = request.merchant_order_id.clone();
        *self.inner.last_order_ref.lock().unwrap() = Some(order_ref.clone());

        let raw = json!({
            "MerchantOrderId": order_ref,
            "Payment": {
                "PaymentId": self.inner.payment_id.lock().unwrap().clone(),
                "Status": self.inner.sale_status.load(Ordering::SeqCst),
            }
        });
        let body: SaleResponse = serde_json::from_value(raw.clone()).unwrap();

        self.inner.recorded.lock().unwrap().sales.push(request);

        Ok(GatewayResponse { body, raw })
    }

    fn update_response(&self) -> Result<GatewayResponse<SaleUpdateResponse>, CieloError> {
        self.check_failure()?;
        let raw = json!({
            "Status": self.inner.update_status.load(Ordering::SeqCst),
            "ReturnCode": "6",
            "ReturnMessage": "Operation Successful"
        });
        let body: SaleUpdateResponse = serde_json::from_value(raw.clone()).unwrap();
        Ok(GatewayResponse { body, raw })
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_credit_card_payment(
        &self,
        payment: CreditCardPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        self.record_sale(payment.into_sale_request())
    }

    async fn create_debit_card_payment(
        &self,
        payment: DebitCardPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        self.record_sale(payment.into_sale_request())
    }

    async fn create_pix_payment(
        &self,
        payment: PixPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        self.record_sale(payment.into_sale_request())
    }

    async fn create_boleto_payment(
        &self,
        payment: BoletoPayment,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        self.record_sale(payment.into_sale_request(FAKE_MERCHANT_ID))
    }

    async fn capture_transaction(
        &self,
        payment_id: &PaymentId,
        amount_cents: Option<i64>,
    ) -> Result<GatewayResponse<SaleUpdateResponse>, CieloError> {
        let response = self.update_response();
        self.inner
            .recorded
            .lock()
            .unwrap()
            .captures
            .push((payment_id.clone(), amount_cents));
        response
    }

    async fn cancel_transaction(
        &self,
        payment_id: &PaymentId,
        amount_cents: Option<i64>,
    ) -> Result<GatewayResponse<SaleUpdateResponse>, CieloError> {
        let response = self.update_response();
        self.inner
            .recorded
            .lock()
            .unwrap()
            .voids
            .push((payment_id.clone(), amount_cents));
        response
    }

    async fn get_transaction(
        &self,
        payment_id: &PaymentId,
    ) -> Result<GatewayResponse<SaleResponse>, CieloError> {
        self.check_failure()?;
        self.inner
            .recorded
            .lock()
            .unwrap()
            .queries
            .push(payment_id.clone());

        let order_ref = self
            .inner
            .last_order_ref
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "ORD-unknown".to_string());
        let raw = json!({
            "MerchantOrderId": order_ref,
            "Payment": {
                "PaymentId": payment_id.as_str(),
                "Status": self.inner.sale_status.load(Ordering::SeqCst),
            }
        });
        let body: SaleResponse = serde_json::from_value(raw.clone()).unwrap();
        Ok(GatewayResponse { body, raw })
    }
}

struct MemoryStoreInner {
    customers: Mutex<Vec<(String, CustomerId)>>,
    orders: Mutex<Vec<Order>>,
    snapshots: Mutex<Vec<serde_json::Value>>,
    next_customer_id: AtomicI32,
    next_order_id: AtomicI32,
}

/// In-memory [`OrderStore`] with the Postgres store's semantics.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                customers: Mutex::new(Vec::new()),
                orders: Mutex::new(Vec::new()),
                snapshots: Mutex::new(Vec::new()),
                next_customer_id: AtomicI32::new(1),
                next_order_id: AtomicI32::new(1),
            }),
        }
    }

    /// Number of persisted orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.inner.orders.lock().unwrap().len()
    }

    /// Number of known customers.
    #[must_use]
    pub fn customer_count(&self) -> usize {
        self.inner.customers.lock().unwrap().len()
    }

    /// Clone of the most recently persisted order.
    #[must_use]
    pub fn last_order(&self) -> Option<Order> {
        self.inner.orders.lock().unwrap().last().cloned()
    }

    /// The raw gateway snapshot stored with the most recent order.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<serde_json::Value> {
        self.inner.snapshots.lock().unwrap().last().cloned()
    }
}

impl OrderStore for MemoryStore {
    async fn create_order(
        &self,
        customer: &CheckoutCustomer,
        order: NewOrder,
    ) -> Result<Order, RepositoryError> {
        let customer_id = {
            let mut customers = self.inner.customers.lock().unwrap();
            customers
                .iter()
                .find(|(email, _)| email == customer.email.as_str())
                .map(|(_, id)| *id)
                .unwrap_or_else(|| {
                    let id = CustomerId::new(
                        self.inner.next_customer_id.fetch_add(1, Ordering::SeqCst),
                    );
                    customers.push((customer.email.as_str().to_string(), id));
                    id
                })
        };

        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(self.inner.next_order_id.fetch_add(1, Ordering::SeqCst)),
            reference: order.reference,
            customer_id,
            items: order.items,
            shipping_cost: order.shipping_cost,
            total: order.total,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            payment_id: order.payment_id,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            completed_at: None,
        };

        self.inner.orders.lock().unwrap().push(stored.clone());
        self.inner
            .snapshots
            .lock()
            .unwrap()
            .push(order.vendor_response);

        Ok(stored)
    }

    async fn order_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .inner
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|order| order.payment_id.as_ref() == Some(payment_id))
            .cloned())
    }

    async fn update_payment_state(
        &self,
        payment_id: &PaymentId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let mut orders = self.inner.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|order| order.payment_id.as_ref() == Some(payment_id))
            .ok_or(RepositoryError::NotFound)?;

        let now = Utc::now();
        order.status = status;
        order.payment_status = payment_status;
        order.updated_at = now;
        if status == OrderStatus::Cancelled && order.cancelled_at.is_none() {
            order.cancelled_at = Some(now);
        }
        if status == OrderStatus::Completed && order.completed_at.is_none() {
            order.completed_at = Some(now);
        }

        Ok(order.clone())
    }
}
