//! Order confirmation emails over SMTP.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::SinglePart,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use patinhas_core::{CheckoutCustomer, Order};

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for order confirmations.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the order confirmation for a freshly persisted order.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent. Callers treat
    /// this as best-effort: a failed confirmation never fails the checkout.
    pub async fn send_order_confirmation(
        &self,
        customer: &CheckoutCustomer,
        order: &Order,
    ) -> Result<(), EmailError> {
        let subject = format!("Pedido {} recebido - Patinhas", order.reference);
        let body = confirmation_body(customer, order);

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(customer
                .email
                .as_str()
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .singlepart(SinglePart::plain(body))?;

        self.mailer.send(message).await?;

        Ok(())
    }
}

/// Plain-text confirmation body.
fn confirmation_body(customer: &CheckoutCustomer, order: &Order) -> String {
    use std::fmt::Write;

    let mut body = format!(
        "Olá {},\n\nRecebemos seu pedido {}.\n\nItens:\n",
        customer.name, order.reference
    );
    for item in &order.items {
        let _ = writeln!(
            body,
            "  {} x{} - R$ {}",
            item.name,
            item.quantity,
            item.subtotal()
        );
    }
    let _ = write!(
        body,
        "\nFrete: R$ {}\nTotal: R$ {}\nPagamento: {} ({})\n\nEquipe Patinhas",
        order.shipping_cost, order.total, order.payment_method, order.payment_status
    );
    body
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core::str::FromStr;
    use patinhas_core::{
        Address, Amount, CustomerId, Document, Email, OrderId, OrderItem, OrderRef, OrderStatus,
        PaymentStatus, ProductId,
    };
    use rust_decimal::Decimal;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            reference: OrderRef::new("ORD-0a1b2c3d"),
            customer_id: CustomerId::new(1),
            items: vec![OrderItem {
                product_id: ProductId::new(10),
                name: "Ração Premium 10kg".to_string(),
                unit_price: Amount::new(Decimal::from_str("50.00").unwrap()),
                quantity: 2,
            }],
            shipping_cost: Amount::from_cents(1550),
            total: Amount::from_cents(11550),
            status: OrderStatus::Pending,
            payment_method: "pix".to_string(),
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            completed_at: None,
        }
    }

    fn customer() -> CheckoutCustomer {
        CheckoutCustomer {
            name: "Maria P Silva".to_string(),
            email: Email::parse("maria@example.com").unwrap(),
            document: Document::parse("529.982.247-25").unwrap(),
            address: Address {
                street: "Rua das Acácias".to_string(),
                number: "123".to_string(),
                complement: None,
                zip_code: "01310-100".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                country: "BRA".to_string(),
            },
        }
    }

    #[test]
    fn test_confirmation_body_contents() {
        let body = confirmation_body(&customer(), &order());
        assert!(body.contains("Maria P Silva"));
        assert!(body.contains("ORD-0a1b2c3d"));
        assert!(body.contains("Ração Premium 10kg x2 - R$ 100.00"));
        assert!(body.contains("Frete: R$ 15.50"));
        assert!(body.contains("Total: R$ 115.50"));
        assert!(body.contains("pix (pendente)"));
    }
}
