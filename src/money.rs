//! Exact decimal monetary amounts.
//!
//! Uses `rust_decimal` internally. Unlike a fixed-scale type, `Money` keeps the
//! full precision of every intermediate result: shares produced by dividing an
//! item across sharers are never rounded until they are displayed.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// A monetary amount with exact decimal arithmetic.
///
/// Display always renders two decimal places; arithmetic never rounds.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use bill_splitter::Money;
///
/// let amount = Money::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// assert_eq!(amount.split(3).to_string(), "3.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Decimal places used when displaying an amount.
    pub const DISPLAY_SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    /// Wraps a `Decimal` without changing its scale.
    pub const fn new(value: Decimal) -> Self {
        Money(value)
    }

    /// Converts a float, returning `None` for NaN or infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Decimal::from_f64(value).map(Money)
    }

    /// Parses a JSON number as it was written, accepting exponent notation.
    ///
    /// Magnitudes below one whose digits run past the representable scale are
    /// rounded towards zero. Returns `None` for magnitudes beyond `Decimal::MAX`.
    pub fn from_json_number(number: &serde_json::Number) -> Option<Self> {
        let text = number.to_string();
        if let Ok(value) = Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
            return Some(Money(value));
        }
        match number.as_f64() {
            Some(v) if v.is_finite() && v.abs() < 1.0 => {
                Some(Money(Decimal::from_f64(v).unwrap_or(Decimal::ZERO)))
            }
            _ => None,
        }
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Divides into `parts` equal shares. Splitting into zero parts yields zero.
    pub fn split(&self, parts: usize) -> Self {
        if parts == 0 {
            return Money::ZERO;
        }
        Money(self.0 / Decimal::from(parts))
    }

    /// Adds two amounts, returning `None` if the sum leaves the `Decimal` range.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Rounds to the display scale.
    pub fn rounded(&self) -> Self {
        let strategy = RoundingStrategy::MidpointAwayFromZero;
        Money(self.0.round_dp_with_strategy(Self::DISPLAY_SCALE, strategy))
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut shown = self.rounded().0;
        shown.rescale(Self::DISPLAY_SCALE);
        write!(f, "{}", shown)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_display_uses_two_places() {
        assert_eq!(money("1").to_string(), "1.00");
        assert_eq!(money("1.5").to_string(), "1.50");
        assert_eq!(money("  2.345  ").to_string(), "2.35");
        assert_eq!(money("0.004").to_string(), "0.00");
    }

    #[test]
    fn test_split_keeps_full_precision() {
        let share = money("10").split(3);
        assert_ne!(share, money("3.33"));
        assert!((share + share + share - money("10")).abs() < money("0.000000001"));
    }

    #[test]
    fn test_split_into_zero_parts_is_zero() {
        assert!(money("42").split(0).is_zero());
    }

    #[test]
    fn test_from_json_number() {
        let n: serde_json::Number = serde_json::from_str("12.5").unwrap();
        assert_eq!(Money::from_json_number(&n), Some(money("12.5")));

        let n: serde_json::Number = serde_json::from_str("7").unwrap();
        assert_eq!(Money::from_json_number(&n), Some(money("7")));

        let n: serde_json::Number = serde_json::from_str("1.5e2").unwrap();
        assert_eq!(Money::from_json_number(&n), Some(money("150")));
    }

    #[test]
    fn test_from_json_number_below_precision_rounds_to_zero() {
        let n: serde_json::Number = serde_json::from_str("1e-30").unwrap();
        let tiny = Money::from_json_number(&n).unwrap();
        assert!(!tiny.is_negative());
        assert!(tiny < money("0.000000001"));
        assert_eq!(tiny.to_string(), "0.00");
    }

    #[test]
    fn test_from_json_number_beyond_range_is_none() {
        let n: serde_json::Number = serde_json::from_str("1e30").unwrap();
        assert_eq!(Money::from_json_number(&n), None);
    }

    #[test]
    fn test_checked_add_detects_overflow() {
        let half = money("50000000000000000000000000000");
        assert_eq!(half.checked_add(money("1")), Some(money("50000000000000000000000000001")));
        assert_eq!(half.checked_add(half), None);
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        let tolerance = Money::from_f64(0.01).unwrap();
        assert!((tolerance - money("0.01")).abs() < money("0.0000001"));
        assert!(Money::from_f64(f64::NAN).is_none());
        assert!(Money::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_negative_detection() {
        assert!(money("-0.5").is_negative());
        assert!(!money("0").is_negative());
        assert!(!money("-0").is_negative());
    }
}
