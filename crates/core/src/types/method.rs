//! The payment-method sum type and card data.
//!
//! `PaymentMethod` is the compile-time decision point for checkout dispatch:
//! adding a payment method means adding a variant and the compiler walks you
//! through every match. The wire discriminant is the `tipo` tag the
//! storefront API has always exposed (`credito`, `debito`, `pix`, `boleto`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the customer wants to pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum PaymentMethod {
    /// Credit card, optionally with deferred capture.
    #[serde(rename = "credito")]
    CreditCard {
        #[serde(flatten)]
        card: CardData,
        /// Number of installments (1 = à vista).
        #[serde(default = "default_installments")]
        installments: u32,
        /// Capture immediately instead of authorize-only.
        #[serde(default = "default_capture")]
        capture: bool,
    },
    /// Debit card with redirect-based authentication.
    #[serde(rename = "debito")]
    DebitCard {
        #[serde(flatten)]
        card: CardData,
        /// Where the gateway sends the customer after authentication.
        #[serde(default)]
        return_url: Option<String>,
    },
    /// PIX instant payment via QR code.
    #[serde(rename = "pix")]
    Pix {
        /// QR code validity in minutes; the gateway default is one hour.
        #[serde(default)]
        expiration_minutes: Option<u32>,
    },
    /// Boleto bancário with a due date.
    #[serde(rename = "boleto")]
    Boleto {
        /// Due date; defaulted downstream when omitted.
        #[serde(default)]
        due_date: Option<NaiveDate>,
        /// Instructions printed on the slip.
        #[serde(default)]
        instructions: Option<String>,
        /// Bank-slip number; defaults to the order reference.
        #[serde(default)]
        boleto_number: Option<String>,
    },
}

const fn default_installments() -> u32 {
    1
}

const fn default_capture() -> bool {
    true
}

impl PaymentMethod {
    /// The wire discriminant (`tipo` value) for this method.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreditCard { .. } => "credito",
            Self::DebitCard { .. } => "debito",
            Self::Pix { .. } => "pix",
            Self::Boleto { .. } => "boleto",
        }
    }
}

/// Card fields as submitted at checkout.
///
/// Passed through verbatim to the gateway request. Everywhere else - logs,
/// `Debug` output, error payloads - only the last four digits survive.
#[derive(Clone, Serialize, Deserialize)]
pub struct CardData {
    /// Primary account number.
    pub number: String,
    /// Cardholder name as printed.
    pub holder: String,
    /// Expiration in `MM/YYYY` format.
    pub expiration: String,
    /// CVV; never logged at all.
    pub security_code: String,
    /// Card brand (`Visa`, `Master`, ...).
    pub brand: String,
}

impl CardData {
    /// The card number with all but the last four digits masked.
    #[must_use]
    pub fn masked_number(&self) -> String {
        let digits = self.number.chars().filter(char::is_ascii_digit).count();
        let last4: String = self
            .number
            .chars()
            .filter(char::is_ascii_digit)
            .skip(digits.saturating_sub(4))
            .collect();
        format!("{}{last4}", "*".repeat(digits.saturating_sub(4)))
    }
}

impl std::fmt::Debug for CardData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field("number", &self.masked_number())
            .field("holder", &self.holder)
            .field("expiration", &self.expiration)
            .field("security_code", &"[REDACTED]")
            .field("brand", &self.brand)
            .finish()
    }
}
