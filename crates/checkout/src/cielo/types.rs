//! Gateway wire types and request builders.
//!
//! The gateway speaks PascalCase JSON. Request construction is pure - the
//! builders here turn domain payment descriptions into [`SaleRequest`]
//! bodies without touching the network, which is also where reais become
//! integer cents via [`Amount::as_cents`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use patinhas_core::{Amount, CardData, CheckoutCustomer, OrderRef};

/// Default PIX QR code validity when the checkout doesn't specify one.
pub const DEFAULT_PIX_EXPIRATION_MINUTES: u32 = 60;

/// Bank integration the gateway issues boletos through.
pub const BOLETO_PROVIDER: &str = "Bradesco2";

/// Instructions printed on the slip when the checkout supplies none.
pub const DEFAULT_BOLETO_INSTRUCTIONS: &str = "Não receber após o vencimento.";

/// The gateway truncates merchant identification to this many characters.
const IDENTIFICATION_MAX_LEN: usize = 14;

// =============================================================================
// Domain-side payment descriptions (inputs to the builders)
// =============================================================================

/// A credit card sale to be created.
#[derive(Debug, Clone)]
pub struct CreditCardPayment {
    pub order_ref: OrderRef,
    pub customer: CustomerData,
    pub amount: Amount,
    pub card: CardData,
    pub installments: u32,
    /// Capture immediately instead of authorize-only.
    pub capture: bool,
    /// Statement descriptor shown on the cardholder's bill.
    pub soft_descriptor: String,
}

/// A debit card sale to be created. Authentication is always on; the
/// customer must be redirected to the returned authentication URL.
#[derive(Debug, Clone)]
pub struct DebitCardPayment {
    pub order_ref: OrderRef,
    pub customer: CustomerData,
    pub amount: Amount,
    pub card: CardData,
    /// Where the gateway sends the customer back after authentication.
    pub return_url: String,
}

/// A PIX sale to be created.
#[derive(Debug, Clone)]
pub struct PixPayment {
    pub order_ref: OrderRef,
    pub customer: CustomerData,
    pub amount: Amount,
    /// QR code validity; defaults to [`DEFAULT_PIX_EXPIRATION_MINUTES`].
    pub expiration_minutes: Option<u32>,
}

/// A boleto sale to be created.
#[derive(Debug, Clone)]
pub struct BoletoPayment {
    pub order_ref: OrderRef,
    pub customer: CustomerData,
    pub amount: Amount,
    pub due_date: Option<NaiveDate>,
    pub instructions: Option<String>,
    pub demonstrative: Option<String>,
    /// Slip number; defaults to the order reference.
    pub boleto_number: Option<String>,
}

// =============================================================================
// Wire types (requests)
// =============================================================================

/// `POST /1/sales` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaleRequest {
    pub merchant_order_id: String,
    pub customer: CustomerData,
    pub payment: PaymentRequestData,
}

/// Customer as the gateway expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerData {
    pub name: String,
    pub email: String,
    /// CPF digits.
    pub identity: String,
    pub identity_type: String,
    pub address: AddressData,
    pub delivery_address: AddressData,
}

impl From<&CheckoutCustomer> for CustomerData {
    fn from(customer: &CheckoutCustomer) -> Self {
        let address = AddressData::from(&customer.address);
        Self {
            name: customer.name.clone(),
            email: customer.email.as_str().to_string(),
            identity: customer.document.as_str().to_string(),
            identity_type: "CPF".to_string(),
            // The storefront collects a single address; billing and delivery
            // are the same on the wire.
            delivery_address: address.clone(),
            address,
        }
    }
}

/// Address as the gateway expects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressData {
    pub street: String,
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub zip_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl From<&patinhas_core::Address> for AddressData {
    fn from(address: &patinhas_core::Address) -> Self {
        Self {
            street: address.street.clone(),
            number: address.number.clone(),
            complement: address.complement.clone(),
            zip_code: address.zip_code.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            country: address.country.clone(),
        }
    }
}

/// The `Payment` node of a sale request; `Type` discriminates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "Type", rename_all_fields = "PascalCase")]
pub enum PaymentRequestData {
    CreditCard {
        amount: i64,
        installments: u32,
        soft_descriptor: String,
        capture: bool,
        credit_card: CardRequestData,
    },
    DebitCard {
        amount: i64,
        /// Always true: debit requires redirect authentication.
        authenticate: bool,
        return_url: String,
        debit_card: CardRequestData,
    },
    Pix {
        amount: i64,
        /// Seconds of QR code validity.
        qr_code_expiration: u32,
    },
    Boleto {
        amount: i64,
        provider: String,
        boleto_number: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        expiration_date: Option<String>,
        identification: String,
        instructions: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        demonstrative: Option<String>,
    },
}

/// Card fields as the gateway expects them. Passed through verbatim from
/// checkout input; masking happens only in logs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardRequestData {
    pub card_number: String,
    pub holder: String,
    /// `MM/YYYY`.
    pub expiration_date: String,
    pub security_code: String,
    pub brand: String,
}

impl From<CardData> for CardRequestData {
    fn from(card: CardData) -> Self {
        Self {
            card_number: card.number,
            holder: card.holder,
            expiration_date: card.expiration,
            security_code: card.security_code,
            brand: card.brand,
        }
    }
}

// =============================================================================
// Request builders
// =============================================================================

impl CreditCardPayment {
    /// Build the sale request body.
    #[must_use]
    pub fn into_sale_request(self) -> SaleRequest {
        SaleRequest {
            merchant_order_id: self.order_ref.into_inner(),
            customer: self.customer,
            payment: PaymentRequestData::CreditCard {
                amount: self.amount.as_cents(),
                installments: self.installments,
                soft_descriptor: self.soft_descriptor,
                capture: self.capture,
                credit_card: self.card.into(),
            },
        }
    }
}

impl DebitCardPayment {
    /// Build the sale request body. `Authenticate` is always set.
    #[must_use]
    pub fn into_sale_request(self) -> SaleRequest {
        SaleRequest {
            merchant_order_id: self.order_ref.into_inner(),
            customer: self.customer,
            payment: PaymentRequestData::DebitCard {
                amount: self.amount.as_cents(),
                authenticate: true,
                return_url: self.return_url,
                debit_card: self.card.into(),
            },
        }
    }
}

impl PixPayment {
    /// Build the sale request body. The gateway takes the expiration in
    /// seconds.
    #[must_use]
    pub fn into_sale_request(self) -> SaleRequest {
        let minutes = self
            .expiration_minutes
            .unwrap_or(DEFAULT_PIX_EXPIRATION_MINUTES);
        SaleRequest {
            merchant_order_id: self.order_ref.into_inner(),
            customer: self.customer,
            payment: PaymentRequestData::Pix {
                amount: self.amount.as_cents(),
                qr_code_expiration: minutes.saturating_mul(60),
            },
        }
    }
}

impl BoletoPayment {
    /// Build the sale request body.
    ///
    /// `BoletoNumber` defaults to the order reference, the provider is
    /// fixed, and `Identification` is the first 14 characters of the
    /// merchant id.
    #[must_use]
    pub fn into_sale_request(self, merchant_id: &str) -> SaleRequest {
        let boleto_number = self
            .boleto_number
            .unwrap_or_else(|| self.order_ref.as_str().to_string());
        SaleRequest {
            merchant_order_id: self.order_ref.into_inner(),
            customer: self.customer,
            payment: PaymentRequestData::Boleto {
                amount: self.amount.as_cents(),
                provider: BOLETO_PROVIDER.to_string(),
                boleto_number,
                expiration_date: self
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string()),
                identification: merchant_id.chars().take(IDENTIFICATION_MAX_LEN).collect(),
                instructions: self
                    .instructions
                    .unwrap_or_else(|| DEFAULT_BOLETO_INSTRUCTIONS.to_string()),
                demonstrative: self.demonstrative,
            },
        }
    }
}

// =============================================================================
// Wire types (responses)
// =============================================================================

/// A gateway response: the typed view plus the raw body.
///
/// The raw JSON is what gets persisted alongside the order as the audit
/// snapshot - the application never mutates it, only maps statuses out of
/// the typed view.
#[derive(Debug, Clone)]
pub struct GatewayResponse<T> {
    pub body: T,
    pub raw: serde_json::Value,
}

/// Sale creation / query response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SaleResponse {
    pub merchant_order_id: Option<String>,
    pub payment: PaymentResponseData,
}

/// The `Payment` node of a sale response. Everything is optional: which
/// artifacts come back depends on the payment type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PaymentResponseData {
    pub payment_id: Option<String>,
    pub status: Option<i64>,
    #[serde(rename = "Type")]
    pub payment_type: Option<String>,
    pub amount: Option<i64>,
    pub captured_amount: Option<i64>,
    pub return_code: Option<String>,
    pub return_message: Option<String>,
    pub authorization_code: Option<String>,
    pub proof_of_sale: Option<String>,
    pub tid: Option<String>,
    /// Debit: where to redirect the customer for authentication.
    pub authentication_url: Option<String>,
    /// PIX: QR code image, base64-encoded PNG.
    pub qr_code_base64_image: Option<String>,
    /// PIX: copy-paste payload.
    pub qr_code_string: Option<String>,
    /// Boleto: printable slip URL.
    pub url: Option<String>,
    /// Boleto: barcode number.
    pub bar_code_number: Option<String>,
    /// Boleto: digitable line.
    pub digitable_line: Option<String>,
}

/// Capture/void response (`PUT /1/sales/{id}/capture|void`). The gateway
/// answers these without the sale wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SaleUpdateResponse {
    pub status: Option<i64>,
    pub return_code: Option<String>,
    pub return_message: Option<String>,
    pub authorization_code: Option<String>,
    pub proof_of_sale: Option<String>,
    pub tid: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use patinhas_core::{Address, Document, Email};
    use rust_decimal::Decimal;

    fn customer() -> CustomerData {
        CustomerData::from(&CheckoutCustomer {
            name: "Maria P Silva".to_string(),
            email: Email::parse("maria@example.com").unwrap(),
            document: Document::parse("529.982.247-25").unwrap(),
            address: Address {
                street: "Rua das Acácias".to_string(),
                number: "123".to_string(),
                complement: Some("ap 42".to_string()),
                zip_code: "01310-100".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                country: "BRA".to_string(),
            },
        })
    }

    fn card() -> CardData {
        CardData {
            number: "4111111111111111".to_string(),
            holder: "MARIA P SILVA".to_string(),
            expiration: "12/2030".to_string(),
            security_code: "123".to_string(),
            brand: "Visa".to_string(),
        }
    }

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_customer_duplicates_delivery_address() {
        let data = customer();
        assert_eq!(data.identity, "52998224725");
        assert_eq!(data.identity_type, "CPF");
        assert_eq!(data.address.street, data.delivery_address.street);
        assert_eq!(data.address.zip_code, data.delivery_address.zip_code);
    }

    #[test]
    fn test_credit_card_request_amount_in_cents() {
        let request = CreditCardPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("19.995"),
            card: card(),
            installments: 3,
            capture: true,
            soft_descriptor: "PATINHAS".to_string(),
        }
        .into_sale_request();

        match &request.payment {
            PaymentRequestData::CreditCard {
                amount,
                installments,
                capture,
                credit_card,
                soft_descriptor,
            } => {
                // round(19.995 * 100), midpoint away from zero
                assert_eq!(*amount, 2000);
                assert_eq!(*installments, 3);
                assert!(*capture);
                assert_eq!(soft_descriptor, "PATINHAS");
                // card fields pass through verbatim
                assert_eq!(credit_card.card_number, "4111111111111111");
                assert_eq!(credit_card.expiration_date, "12/2030");
            }
            other => panic!("expected credit card payment, got {other:?}"),
        }
    }

    #[test]
    fn test_credit_card_request_serializes_pascal_case() {
        let request = CreditCardPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("130.00"),
            card: card(),
            installments: 1,
            capture: false,
            soft_descriptor: "PATINHAS".to_string(),
        }
        .into_sale_request();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["MerchantOrderId"], "ORD-0a1b2c3d");
        assert_eq!(json["Payment"]["Type"], "CreditCard");
        assert_eq!(json["Payment"]["Amount"], 13000);
        assert_eq!(json["Payment"]["Capture"], false);
        assert_eq!(
            json["Payment"]["CreditCard"]["CardNumber"],
            "4111111111111111"
        );
        assert_eq!(json["Customer"]["IdentityType"], "CPF");
        assert_eq!(json["Customer"]["DeliveryAddress"]["City"], "São Paulo");
    }

    #[test]
    fn test_debit_card_request_always_authenticates() {
        let request = DebitCardPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("75.50"),
            card: card(),
            return_url: "https://loja.patinhas.pet/pedido/confirmado".to_string(),
        }
        .into_sale_request();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Payment"]["Type"], "DebitCard");
        assert_eq!(json["Payment"]["Authenticate"], true);
        assert_eq!(
            json["Payment"]["ReturnUrl"],
            "https://loja.patinhas.pet/pedido/confirmado"
        );
        assert_eq!(json["Payment"]["Amount"], 7550);
    }

    #[test]
    fn test_pix_request_default_expiration() {
        let request = PixPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("130.00"),
            expiration_minutes: None,
        }
        .into_sale_request();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Payment"]["Type"], "Pix");
        // 60 minutes, sent in seconds
        assert_eq!(json["Payment"]["QrCodeExpiration"], 3600);
    }

    #[test]
    fn test_pix_request_explicit_expiration() {
        let request = PixPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("130.00"),
            expiration_minutes: Some(15),
        }
        .into_sale_request();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Payment"]["QrCodeExpiration"], 900);
    }

    #[test]
    fn test_boleto_number_defaults_to_order_reference() {
        let request = BoletoPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("88.00"),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 15),
            instructions: None,
            demonstrative: None,
            boleto_number: None,
        }
        .into_sale_request("1234567890ABCDEF0123");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Payment"]["Type"], "Boleto");
        assert_eq!(json["Payment"]["BoletoNumber"], "ORD-0a1b2c3d");
        assert_eq!(json["Payment"]["Provider"], "Bradesco2");
        assert_eq!(json["Payment"]["ExpirationDate"], "2026-09-15");
        assert_eq!(json["Payment"]["Instructions"], DEFAULT_BOLETO_INSTRUCTIONS);
        // first 14 chars of the merchant id
        assert_eq!(json["Payment"]["Identification"], "1234567890ABCD");
    }

    #[test]
    fn test_boleto_explicit_number_wins() {
        let request = BoletoPayment {
            order_ref: OrderRef::new("ORD-0a1b2c3d"),
            customer: customer(),
            amount: amount("88.00"),
            due_date: None,
            instructions: Some("Pagável em qualquer agência.".to_string()),
            demonstrative: None,
            boleto_number: Some("000042".to_string()),
        }
        .into_sale_request("1234567890ABCDEF0123");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Payment"]["BoletoNumber"], "000042");
        assert_eq!(json["Payment"]["Instructions"], "Pagável em qualquer agência.");
        assert_eq!(json["Payment"].get("ExpirationDate"), None);
    }

    #[test]
    fn test_sale_response_parses_pix_artifacts() {
        let body = r#"{
            "MerchantOrderId": "ORD-0a1b2c3d",
            "Payment": {
                "PaymentId": "24bc8366-fc31-4d6c-8555-17049a836a07",
                "Type": "Pix",
                "Status": 12,
                "Amount": 13000,
                "QrCodeBase64Image": "aGVsbG8=",
                "QrCodeString": "00020101br.gov.bcb.pix"
            }
        }"#;
        let response: SaleResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.merchant_order_id.as_deref(), Some("ORD-0a1b2c3d"));
        assert_eq!(response.payment.status, Some(12));
        assert_eq!(
            response.payment.qr_code_string.as_deref(),
            Some("00020101br.gov.bcb.pix")
        );
    }

    #[test]
    fn test_sale_update_response_parses_without_wrapper() {
        let body = r#"{"Status": 2, "ReturnCode": "6", "ReturnMessage": "Operation Successful"}"#;
        let response: SaleUpdateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, Some(2));
        assert_eq!(response.return_code.as_deref(), Some("6"));
    }

    #[test]
    fn test_sale_response_tolerates_unknown_fields() {
        let body = r#"{
            "MerchantOrderId": "ORD-0a1b2c3d",
            "SomethingNew": {"Nested": true},
            "Payment": {"PaymentId": "x", "Status": 1, "Links": []}
        }"#;
        let response: SaleResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.payment.status, Some(1));
    }
}
