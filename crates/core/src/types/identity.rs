//! Customer identity types: email address and CPF document.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not have a local part and a domain separated by `@`.
    #[error("email must have a local part and a domain separated by @")]
    Malformed,
}

/// An email address.
///
/// Basic structural validation only: non-empty local part and domain
/// separated by a single `@`, within the RFC 5321 length limit. Deliverable
/// addresses are the mail server's problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 254 characters,
    /// or lacks a non-empty local part or domain.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        match s.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(s.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing a [`Document`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum DocumentError {
    /// The input does not contain exactly 11 digits.
    #[error("CPF must contain exactly 11 digits")]
    WrongLength,
    /// All digits are identical (e.g. `111.111.111-11`), which the check
    /// digits would otherwise accept.
    #[error("CPF digits cannot all be identical")]
    RepeatedDigits,
    /// The verification digits do not match.
    #[error("CPF verification digits are invalid")]
    BadCheckDigits,
}

/// A Brazilian CPF document number, stored as 11 bare digits.
///
/// Accepts formatted (`123.456.789-09`) or unformatted input; punctuation is
/// stripped before validation against the official check-digit algorithm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    /// Parse a CPF from a string, stripping `.`, `-` and spaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not contain exactly 11 digits,
    /// is a repeated-digit sequence, or fails check-digit validation.
    pub fn parse(s: &str) -> Result<Self, DocumentError> {
        let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != 11 || s.chars().any(|c| !c.is_ascii_digit() && !".- ".contains(c)) {
            return Err(DocumentError::WrongLength);
        }

        if digits.windows(2).all(|w| w.first() == w.last()) {
            return Err(DocumentError::RepeatedDigits);
        }

        let check = |take: usize, start_weight: u32| -> u32 {
            let sum: u32 = digits
                .iter()
                .take(take)
                .zip((2..=start_weight).rev())
                .map(|(d, w)| d * w)
                .sum();
            (sum * 10) % 11 % 10
        };

        let d1 = check(9, 10);
        let d2 = check(10, 11);

        if digits.get(9) != Some(&d1) || digits.get(10) != Some(&d2) {
            return Err(DocumentError::BadCheckDigits);
        }

        Ok(Self(digits.iter().map(ToString::to_string).collect()))
    }

    /// Returns the bare 11-digit CPF.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Document {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// SQLx support (with postgres feature)
macro_rules! text_sqlx_impls {
    ($name:ident) => {
        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                // Database values are assumed valid
                Ok(Self(s))
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

text_sqlx_impls!(Email);
text_sqlx_impls!(Document);
