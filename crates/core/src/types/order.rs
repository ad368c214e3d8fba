//! Checkout input and order aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CustomerId, OrderId, OrderRef, PaymentId, ProductId};
use super::identity::{Document, Email};
use super::method::PaymentMethod;
use super::money::Amount;
use super::status::{OrderStatus, PaymentStatus};

/// A postal address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub zip_code: String,
    pub city: String,
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "BRA".to_string()
}

/// The customer as submitted at checkout time.
///
/// Not an aggregate root here: persisted as a customer row on first
/// purchase, referenced by id from the order afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCustomer {
    pub name: String,
    pub email: Email,
    /// CPF document.
    pub document: Document,
    pub address: Address,
}

/// A line item: product snapshot + quantity + unit price.
///
/// The snapshot is intentional - catalog prices move, order history doesn't.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Amount,
    pub quantity: u32,
}

impl OrderItem {
    /// Line subtotal: `unit_price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Amount {
        self.unit_price.times(self.quantity)
    }
}

/// Everything the payment service needs to process one checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer: CheckoutCustomer,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_cost: Amount,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// The order total: sum of line subtotals plus shipping.
    ///
    /// This is the value persisted on the order and sent to the gateway -
    /// totals are always recomputed here, never trusted from the client.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.items.iter().map(OrderItem::subtotal).sum::<Amount>() + self.shipping_cost
    }
}

/// A persisted order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub reference: OrderRef,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub shipping_cost: Amount,
    pub total: Amount,
    pub status: OrderStatus,
    /// The `tipo` discriminant of the method used.
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An order about to be inserted.
///
/// `vendor_response` is the raw gateway response body, stored verbatim as an
/// opaque audit snapshot - the application maps statuses out of it but never
/// mutates it.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub reference: OrderRef,
    pub items: Vec<OrderItem>,
    pub shipping_cost: Amount,
    pub total: Amount,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<PaymentId>,
    pub vendor_response: serde_json::Value,
}
