use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{Result, SuiteError};

/// number of decimal places carried by every currency amount
pub const CURRENCY_SCALE: u32 = 2;

/// currency amount held at a fixed scale of two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    /// smallest representable amount (0.01)
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, CURRENCY_SCALE));
    pub const MAX: Money = Money(Decimal::MAX);

    /// create from decimal, rounding half-up to the currency scale
    pub fn from_decimal(d: Decimal) -> Self {
        Money(round_currency(d))
    }

    /// create from decimal, refusing anything finer than the currency scale
    pub fn try_from_decimal(d: Decimal) -> Result<Self> {
        let normalized = d.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(SuiteError::TooPrecise {
                value: d,
                scale: CURRENCY_SCALE,
            });
        }
        Ok(Money(round_currency(d)))
    }

    /// parse a string amount without any silent rounding
    pub fn parse_exact(s: &str) -> Result<Self> {
        let d = Decimal::from_str(s.trim()).map_err(|_| SuiteError::InvalidAmount {
            field: "amount".to_string(),
            value: s.to_string(),
        })?;
        Self::try_from_decimal(d)
    }

    /// create from whole currency units
    pub fn from_major(amount: i64) -> Self {
        Money(round_currency(Decimal::from(amount)))
    }

    /// create from cents
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, CURRENCY_SCALE))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `None` when the sum leaves the decimal range
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// apply a percentage (e.g. 20% of 100.00 = 20.00), rounded once
    pub fn percentage(&self, pct: Percentage) -> Self {
        Money::from_decimal(self.0 * pct.as_fraction())
    }
}

/// round half-up (away from zero) to the currency scale
pub fn round_currency(d: Decimal) -> Decimal {
    let mut rounded = d.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// incoming amounts finer than a cent are refused rather than rounded
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let d = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::try_from_decimal(d).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Money {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self> {
        Money::parse_exact(s)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money::from_decimal(self.0 * other)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

/// percentage in the 0..=100 range, used for tax rates and discounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);
    pub const HUNDRED: Percentage = Percentage(Decimal::ONE_HUNDRED);

    /// create from a percent value, e.g. 20 for 20%
    pub fn new(percent: Decimal) -> Self {
        Percentage(percent)
    }

    pub fn from_whole(percent: u32) -> Self {
        Percentage(Decimal::from(percent))
    }

    /// the raw percent value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// e.g. 0.2 for 20%
    pub fn as_fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// 1 - p/100
    pub fn complement(&self) -> Decimal {
        Decimal::ONE - self.as_fraction()
    }

    pub fn is_within_bounds(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE_HUNDRED
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Decimal> for Percentage {
    fn from(d: Decimal) -> Self {
        Percentage::new(d)
    }
}
