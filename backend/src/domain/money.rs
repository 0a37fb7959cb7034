//! Monetary amounts held in integer minor currency units.
//!
//! Balances and prices never go through floating point. A `Money` value is
//! always non-negative; arithmetic that would cross zero returns `None` so
//! callers decide how to report it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minor units per major unit (two decimal places).
const MINOR_PER_MAJOR: i64 = 100;

/// Errors raised when constructing or parsing [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The amount was negative.
    #[error("amount must not be negative")]
    Negative,
    /// The text was not a decimal amount with at most two fraction digits.
    #[error("amount must look like 12 or 12.50: {input}")]
    Malformed {
        /// The rejected input.
        input: String,
    },
    /// The amount does not fit the supported range.
    #[error("amount is out of range")]
    Overflow,
}

/// A non-negative amount of money in minor units.
///
/// # Examples
/// ```
/// use academy::domain::Money;
///
/// let price: Money = "49.90".parse().expect("valid amount");
/// assert_eq!(price.minor_units(), 4990);
/// assert_eq!(price.to_string(), "49.90");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Construct from minor units, rejecting negative values.
    pub fn from_minor_units(minor_units: i64) -> Result<Self, MoneyError> {
        if minor_units < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self(minor_units))
    }

    /// Amount in minor units.
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Whether the amount is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtract, returning `None` when the result would be negative.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0
            .checked_sub(other.0)
            .filter(|remaining| *remaining >= 0)
            .map(Self)
    }

    /// Add, returning `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl TryFrom<i64> for Money {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_minor_units(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.0.div_euclid(MINOR_PER_MAJOR);
        let minor = self.0.rem_euclid(MINOR_PER_MAJOR);
        write!(f, "{major}.{minor:02}")
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MoneyError::Malformed {
            input: s.to_owned(),
        };
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(MoneyError::Negative);
        }
        let (major, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let digits_only = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if major.is_empty() || !digits_only(major) || !digits_only(fraction) || fraction.len() > 2
        {
            return Err(malformed());
        }

        let major: i64 = major.parse().map_err(|_| MoneyError::Overflow)?;
        let minor = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
            _ => fraction.parse::<i64>().map_err(|_| malformed())?,
        };

        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|value| value.checked_add(minor))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }
}
