//! Order persistence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use patinhas_core::{
    Amount, CheckoutCustomer, CustomerId, NewOrder, Order, OrderId, OrderItem, OrderRef,
    OrderStatus, PaymentId, PaymentStatus, ProductId,
};

use super::{OrderStore, RepositoryError, customers};

/// Postgres-backed [`OrderStore`].
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, order_id: i32) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT product_id, name, unit_price, quantity
            FROM checkout.order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ItemRow::into_item).collect()
    }
}

impl OrderStore for PgOrderStore {
    async fn create_order(
        &self,
        customer: &CheckoutCustomer,
        order: NewOrder,
    ) -> Result<Order, RepositoryError> {
        // One transaction around find-or-create customer and the order
        // insert: a crash between the two writes must not leave a customer
        // row pointing at a checkout that never happened, or vice versa.
        let mut tx = self.pool.begin().await?;

        let customer_id = customers::find_or_create(&mut tx, customer).await?;

        let row: OrderRow = sqlx::query_as(
            r"
            INSERT INTO checkout.orders
                (reference, customer_id, shipping_cost, total, status,
                 payment_method, payment_status, payment_id, vendor_response)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, reference, customer_id, shipping_cost, total, status,
                      payment_method, payment_status, payment_id,
                      created_at, updated_at, cancelled_at, completed_at
            ",
        )
        .bind(order.reference.as_str())
        .bind(customer_id)
        .bind(order.shipping_cost.reais())
        .bind(order.total.reais())
        .bind(order.status.as_str())
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .bind(order.payment_id.as_ref().map(PaymentId::as_str))
        .bind(&order.vendor_response)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::Conflict("item quantity exceeds supported range".to_string())
            })?;
            sqlx::query(
                r"
                INSERT INTO checkout.order_items
                    (order_id, product_id, name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.unit_price.reais())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.into_order(order.items)
    }

    async fn order_by_payment_id(
        &self,
        payment_id: &PaymentId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, reference, customer_id, shipping_cost, total, status,
                   payment_method, payment_status, payment_id,
                   created_at, updated_at, cancelled_at, completed_at
            FROM checkout.orders
            WHERE payment_id = $1
            ",
        )
        .bind(payment_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(row.id).await?;
                Ok(Some(row.into_order(items)?))
            }
            None => Ok(None),
        }
    }

    async fn update_payment_state(
        &self,
        payment_id: &PaymentId,
        status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            UPDATE checkout.orders SET
                status = $2,
                payment_status = $3,
                updated_at = now(),
                cancelled_at = CASE
                    WHEN $2 = 'cancelled' AND cancelled_at IS NULL THEN now()
                    ELSE cancelled_at
                END,
                completed_at = CASE
                    WHEN $2 = 'completed' AND completed_at IS NULL THEN now()
                    ELSE completed_at
                END
            WHERE payment_id = $1
            RETURNING id, reference, customer_id, shipping_cost, total, status,
                      payment_method, payment_status, payment_id,
                      created_at, updated_at, cancelled_at, completed_at
            ",
        )
        .bind(payment_id.as_str())
        .bind(status.as_str())
        .bind(payment_status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        let items = self.load_items(row.id).await?;
        row.into_order(items)
    }
}

/// Flat order row as stored.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    reference: String,
    customer_id: i32,
    shipping_cost: Decimal,
    total: Decimal,
    status: String,
    payment_method: String,
    payment_status: String,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = self.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;
        let payment_status = self.payment_status.parse::<PaymentStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment status in database: {e}"))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            reference: OrderRef::new(self.reference),
            customer_id: CustomerId::new(self.customer_id),
            items,
            shipping_cost: Amount::new(self.shipping_cost),
            total: Amount::new(self.total),
            status,
            payment_method: self.payment_method,
            payment_status,
            payment_id: self.payment_id.map(PaymentId::new),
            created_at: self.created_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
            completed_at: self.completed_at,
        })
    }
}

/// Flat line-item row as stored.
#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: i32,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl ItemRow {
    fn into_item(self) -> Result<OrderItem, RepositoryError> {
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption("negative item quantity in database".to_string())
        })?;
        Ok(OrderItem {
            product_id: ProductId::new(self.product_id),
            name: self.name,
            unit_price: Amount::new(self.unit_price),
            quantity,
        })
    }
}
