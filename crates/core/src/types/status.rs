//! Order and payment status vocabularies.
//!
//! [`PaymentStatus::from_vendor_code`] is the single source of truth for how
//! gateway status codes collapse into the application's payment lifecycle.
//! The persisted and wire-visible strings are the Portuguese vocabulary the
//! storefront has always used (`pendente`, `confirmado`, ...).

use serde::{Deserialize, Serialize};

/// Order fulfillment lifecycle.
///
/// Transitions into `Cancelled` and `Completed` stamp `cancelled_at` /
/// `completed_at` on the stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// The stored/wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment status as the application sees it.
///
/// Several gateway codes intentionally collapse to the same variant; see
/// [`PaymentStatus::from_vendor_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Awaiting authorization, confirmation, or customer action.
    #[default]
    #[serde(rename = "pendente")]
    Pending,
    /// Payment confirmed/captured.
    #[serde(rename = "confirmado")]
    Confirmed,
    /// Denied by the issuer or voided.
    #[serde(rename = "cancelado")]
    Cancelled,
    /// Refunded after capture.
    #[serde(rename = "reembolsado")]
    Refunded,
    /// Aborted by a processing failure.
    #[serde(rename = "falha")]
    Failed,
    /// Scheduled for later capture.
    #[serde(rename = "agendado")]
    Scheduled,
}

impl PaymentStatus {
    /// Map a gateway status code to the application vocabulary.
    ///
    /// | code | gateway meaning   | result        |
    /// |------|-------------------|---------------|
    /// | 0    | not finished      | `Pending`     |
    /// | 1    | authorized        | `Pending`     |
    /// | 2    | payment confirmed | `Confirmed`   |
    /// | 3    | denied            | `Cancelled`   |
    /// | 10   | voided            | `Cancelled`   |
    /// | 11   | refunded          | `Refunded`    |
    /// | 12   | pending           | `Pending`     |
    /// | 13   | aborted           | `Failed`      |
    /// | 20   | scheduled         | `Scheduled`   |
    ///
    /// Unknown codes default to `Pending`.
    #[must_use]
    pub const fn from_vendor_code(code: i64) -> Self {
        match code {
            2 => Self::Confirmed,
            3 | 10 => Self::Cancelled,
            11 => Self::Refunded,
            13 => Self::Failed,
            20 => Self::Scheduled,
            _ => Self::Pending,
        }
    }

    /// The stored/wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pendente",
            Self::Confirmed => "confirmado",
            Self::Cancelled => "cancelado",
            Self::Refunded => "reembolsado",
            Self::Failed => "falha",
            Self::Scheduled => "agendado",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendente" => Ok(Self::Pending),
            "confirmado" => Ok(Self::Confirmed),
            "cancelado" => Ok(Self::Cancelled),
            "reembolsado" => Ok(Self::Refunded),
            "falha" => Ok(Self::Failed),
            "agendado" => Ok(Self::Scheduled),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}
