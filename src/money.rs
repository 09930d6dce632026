//! Fixed-point currency amounts.
//!
//! Amounts are held as a whole number of cents so that balances never pick
//! up floating point drift. They are stored in SQLite as `INTEGER` cents and
//! travel over the API as JSON numbers in major units, e.g. `432.5`.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// The relative error allowed when converting major units to whole cents.
const CENT_TOLERANCE: f64 = f64::EPSILON * 100.0;

/// An amount of money in the smallest currency unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// No money at all.
    pub const ZERO: Money = Money(0);

    /// Create an amount from a whole number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Create an amount from a whole number of major units (e.g. dollars).
    pub const fn from_major(units: i64) -> Self {
        Money(units * 100)
    }

    /// Create an amount from a decimal number of major units.
    ///
    /// Returns `None` if `units` is not finite, does not fit, or has a
    /// fraction of a cent (e.g. `12.349`). Floating point noise such as
    /// `0.1 + 0.2` is tolerated.
    pub fn from_major_units(units: f64) -> Option<Self> {
        if !units.is_finite() {
            return None;
        }

        let exact_cents = units * 100.0;
        let cents = exact_cents.round();

        if (exact_cents - cents).abs() > CENT_TOLERANCE * exact_cents.abs().max(1.0) {
            return None;
        }

        // `i64::MAX as f64` rounds up to 2^63, which does not fit.
        if cents < i64::MIN as f64 || cents >= i64::MAX as f64 {
            return None;
        }

        Some(Money(cents as i64))
    }

    /// The amount in cents.
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// The amount in major units, e.g. `12.5` for 1250 cents.
    pub fn as_major_units(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Whether the amount is strictly greater than zero.
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Add two amounts, returning `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtract `other` from this amount, returning `None` on overflow.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();

        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_units())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let units = f64::deserialize(deserializer)?;

        Money::from_major_units(units)
            .ok_or_else(|| de::Error::custom(format!("{units} is not a valid amount of money")))
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Money)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Money;

    #[test]
    fn displays_with_two_decimal_places() {
        assert_eq!(Money::from_cents(43200).to_string(), "432.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1850).to_string(), "-18.50");
    }

    #[test]
    fn converts_whole_cents_from_major_units() {
        assert_eq!(Money::from_major_units(0.1 + 0.2), Some(Money::from_cents(30)));
        assert_eq!(Money::from_major_units(18.0), Some(Money::from_major(18)));
        assert_eq!(Money::from_major_units(12.34), Some(Money::from_cents(1234)));
        assert_eq!(Money::from_major_units(-18.5), Some(Money::from_cents(-1850)));
    }

    #[test]
    fn rejects_fractions_of_a_cent() {
        assert_eq!(Money::from_major_units(12.349), None);
        assert_eq!(Money::from_major_units(10.005), None);
        assert_eq!(Money::from_major_units(0.001), None);
    }

    #[test]
    fn rejects_amounts_that_do_not_fit() {
        assert_eq!(Money::from_major_units(f64::NAN), None);
        assert_eq!(Money::from_major_units(f64::INFINITY), None);
        assert_eq!(Money::from_major_units(1e300), None);
        // Exactly 2^63 cents.
        assert_eq!(Money::from_major_units(9_223_372_036_854_775_808.0 / 100.0), None);
    }

    #[test]
    fn serializes_as_major_units() {
        let value = serde_json::to_value(Money::from_cents(43250)).unwrap();

        assert_eq!(value, json!(432.5));
    }

    #[test]
    fn deserializes_from_json_numbers() {
        let money: Money = serde_json::from_value(json!(50)).unwrap();
        assert_eq!(money, Money::from_major(50));

        let money: Money = serde_json::from_value(json!(12.34)).unwrap();
        assert_eq!(money, Money::from_cents(1234));

        assert!(serde_json::from_value::<Money>(json!("fifty")).is_err());
        assert!(serde_json::from_value::<Money>(json!(12.349)).is_err());
        assert!(serde_json::from_value::<Money>(json!(10.005)).is_err());
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_major(500).checked_sub(Money::from_major(68)),
            Some(Money::from_major(432))
        );
    }
}
