use std::{
    fmt::Display,
    iter::Sum,
    ops::Mul,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "KES";

//--------------------------------------        Money         ---------------------------------------------------------
/// An amount of Kenyan shillings, stored as an integer number of cents.
///
/// Serialises as the raw number of cents.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0.saturating_mul(rhs))
    }
}

/// Sums saturate at the `i64` limits rather than overflow. Use [`Money::checked_add`] where the limit matters.
impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, m| Self(acc.0.saturating_add(m.0)))
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Saturates for amounts too large to hold in cents. See [`Money::try_from_shillings`].
    pub const fn from_shillings(shillings: i64) -> Self {
        Self(shillings.saturating_mul(100))
    }

    pub fn try_from_shillings(shillings: i64) -> Option<Self> {
        shillings.checked_mul(100).map(Self)
    }

    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Whole shillings, rounding any cents up. M-Pesa only deals in whole shillings, so this is the smallest amount a
    /// customer can send that covers this value.
    pub fn ceil_shillings(&self) -> i64 {
        self.0.saturating_add(99).div_euclid(100)
    }

    /// `pct` percent of this amount, rounded half-up to the nearest cent. Saturates at the `i64` limits.
    pub fn percent(&self, pct: f64) -> Self {
        Self((self.0 as f64 * pct / 100.0).round() as i64)
    }

    /// This amount multiplied by a fractional quantity (e.g. kilograms), rounded to the nearest cent. Saturates at the
    /// `i64` limits.
    pub fn times(&self, quantity: f64) -> Self {
        Self((self.0 as f64 * quantity).round() as i64)
    }

    /// Saturating difference, never less than zero.
    pub fn saturating_sub(&self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0).max(0))
    }

    pub fn to_shillings_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        let whole = (cents / 100).to_string();
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        write!(f, "{CURRENCY_CODE} {sign}{grouped}.{:02}", cents % 100)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a shilling amount: {0}")]
pub struct MoneyParseError(String);

/// Parses a shilling amount such as `1500`, `1,500.5`, `KES 20.00` or `-3.25`. At most two decimal places are accepted.
impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MoneyParseError(s.to_string());
        let cleaned = s.trim().trim_start_matches(CURRENCY_CODE).trim().replace(',', "");
        let (negative, cleaned) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest.to_string()),
            None => (false, cleaned),
        };
        let (whole, frac) = match cleaned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (cleaned.as_str(), ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if frac.len() > 2 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| err())? };
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse::<i64>().map_err(|_| err())?,
        };
        let cents = whole.checked_mul(100).and_then(|w| w.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -cents } else { cents }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Money::from(0).to_string(), "KES 0.00");
        assert_eq!(Money::from(5).to_string(), "KES 0.05");
        assert_eq!(Money::from_shillings(1250).to_string(), "KES 1,250.00");
        assert_eq!(Money::from(123_456_789).to_string(), "KES 1,234,567.89");
        assert_eq!(Money::from(-150).to_string(), "KES -1.50");
    }

    #[test]
    fn parse() {
        assert_eq!("1500".parse::<Money>().unwrap(), Money::from_shillings(1500));
        assert_eq!("1,500.5".parse::<Money>().unwrap(), Money::from(150_050));
        assert_eq!("KES 20.00".parse::<Money>().unwrap(), Money::from_shillings(20));
        assert_eq!("-3.25".parse::<Money>().unwrap(), Money::from(-325));
        assert_eq!(".5".parse::<Money>().unwrap(), Money::from(50));
        assert!("1.234".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn arithmetic() {
        let mut a = Money::from_shillings(100);
        a += Money::from(50);
        assert_eq!(a, Money::from(10_050));
        a -= Money::from_shillings(1);
        assert_eq!(a.value(), 9_950);
        assert_eq!(-a, Money::from(-9_950));
        assert_eq!(Money::from(10) * 3, Money::from(30));
        let total: Money = [Money::from(1), Money::from(2), Money::from(3)].iter().sum();
        assert_eq!(total, Money::from(6));
        assert_eq!(Money::from(100).saturating_sub(Money::from(300)), Money::from(0));
    }

    #[test]
    fn overflow() {
        let max = Money::from(i64::MAX);
        assert_eq!(max.checked_add(Money::from(1)), None);
        assert_eq!(Money::from(50).checked_add(Money::from(25)), Some(Money::from(75)));
        assert_eq!(Money::from(i64::MIN).checked_sub(Money::from(1)), None);
        assert_eq!(Money::try_from_shillings(i64::MAX / 10), None);
        assert_eq!(Money::try_from_shillings(1_500), Some(Money::from(150_000)));
        assert_eq!(Money::from_shillings(i64::MAX / 10), max);
        let total: Money = [max, Money::from(1), Money::from(1)].into_iter().sum();
        assert_eq!(total, max);
        assert_eq!(Money::from(15_000).times(1e18), max);
        assert_eq!(max.saturating_sub(Money::from(i64::MIN)), max);
    }

    #[test]
    fn rounding() {
        assert_eq!(Money::from(29_999).ceil_shillings(), 300);
        assert_eq!(Money::from(30_000).ceil_shillings(), 300);
        assert_eq!(Money::from(30_001).ceil_shillings(), 301);
        assert_eq!(Money::from(0).ceil_shillings(), 0);
        // 15% of 19.99 is 2.9985
        assert_eq!(Money::from(1999).percent(15.0), Money::from(300));
        assert_eq!(Money::from(5).percent(10.0), Money::from(1));
        assert_eq!(Money::from_shillings(150).times(2.5), Money::from_shillings(375));
        assert_eq!(Money::from(333).times(0.5), Money::from(167));
    }

    #[test]
    fn serializes_as_cents() {
        let json = serde_json::to_string(&Money::from(12_345)).unwrap();
        assert_eq!(json, "12345");
        let m: Money = serde_json::from_str("250").unwrap();
        assert_eq!(m, Money::from(250));
    }
}
