//! Customer persistence.
//!
//! Customers are created the first time they check out and found by email
//! afterwards. These helpers take a connection rather than the pool so the
//! payment flow can run them inside the same transaction as the order
//! insert.

use sqlx::PgConnection;
use sqlx::Row;

use patinhas_core::{CheckoutCustomer, CustomerId};

use super::RepositoryError;

/// Find a customer id by email.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_email(
    conn: &mut PgConnection,
    email: &str,
) -> Result<Option<CustomerId>, RepositoryError> {
    let row = sqlx::query("SELECT id FROM checkout.customers WHERE email = $1")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| CustomerId::new(r.get("id"))))
}

/// Find a customer by email or create one from the checkout submission.
///
/// The caller decides the transaction boundary; run this on the same
/// connection as the order insert so a crash between the two writes cannot
/// leave a half-persisted checkout.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if either query fails.
pub async fn find_or_create(
    conn: &mut PgConnection,
    customer: &CheckoutCustomer,
) -> Result<CustomerId, RepositoryError> {
    if let Some(id) = find_by_email(&mut *conn, customer.email.as_str()).await? {
        return Ok(id);
    }

    let row = sqlx::query(
        r"
        INSERT INTO checkout.customers
            (name, email, document, street, number, complement, zip_code, city, state, country)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        ",
    )
    .bind(&customer.name)
    .bind(customer.email.as_str())
    .bind(customer.document.as_str())
    .bind(&customer.address.street)
    .bind(&customer.address.number)
    .bind(&customer.address.complement)
    .bind(&customer.address.zip_code)
    .bind(&customer.address.city)
    .bind(&customer.address.state)
    .bind(&customer.address.country)
    .fetch_one(&mut *conn)
    .await?;

    Ok(CustomerId::new(row.get("id")))
}
