//! Monetary amounts in reais, with the single reais-to-cents conversion.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in reais (BRL), backed by decimal arithmetic.
///
/// The payment gateway deals in integer cents; [`Amount::as_cents`] is the
/// only place that conversion happens. Midpoints round away from zero, so
/// `19.995` becomes `2000` cents - decimal-exact, with none of the binary
/// floating point artifacts a naive `f64` conversion would introduce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero reais.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value in reais.
    #[must_use]
    pub const fn new(reais: Decimal) -> Self {
        Self(reais)
    }

    /// Create an amount from integer cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal value in reais.
    #[must_use]
    pub const fn reais(&self) -> Decimal {
        self.0
    }

    /// Convert to integer cents: `round(reais * 100)`, midpoint away from
    /// zero.
    ///
    /// Saturates at `i64::MAX` cents; order totals never get anywhere near
    /// that range.
    #[must_use]
    pub fn as_cents(&self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Multiply a unit price by a line-item quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Whether the amount is greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Amount {
    fn from(reais: Decimal) -> Self {
        Self(reais)
    }
}

// SQLx support (with postgres feature): stored as NUMERIC via Decimal.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Amount {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Amount {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let decimal = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(decimal))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Amount {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_as_cents_exact() {
        assert_eq!(amount("130.00").as_cents(), 13000);
        assert_eq!(amount("0.01").as_cents(), 1);
        assert_eq!(amount("1").as_cents(), 100);
    }

    #[test]
    fn test_as_cents_midpoint_rounds_away_from_zero() {
        // The boundary case: 19.995 reais is exactly 1999.5 cents.
        assert_eq!(amount("19.995").as_cents(), 2000);
        assert_eq!(amount("0.105").as_cents(), 11);
        assert_eq!(amount("-19.995").as_cents(), -2000);
    }

    #[test]
    fn test_as_cents_sub_cent_precision() {
        assert_eq!(amount("10.994").as_cents(), 1099);
        assert_eq!(amount("10.996").as_cents(), 1100);
    }

    #[test]
    fn test_from_cents_round_trip() {
        let a = Amount::from_cents(13000);
        assert_eq!(a, amount("130.00"));
        assert_eq!(a.as_cents(), 13000);
    }

    #[test]
    fn test_times_and_sum() {
        let total: Amount = [amount("50.00").times(2), amount("30.00").times(1)]
            .into_iter()
            .sum();
        assert_eq!(total, amount("130.00"));
        assert_eq!(total.as_cents(), 13000);
    }

    #[test]
    fn test_display_two_decimal_places() {
        assert_eq!(amount("5").to_string(), "5.00");
        assert_eq!(amount("19.9").to_string(), "19.90");
    }
}
