//! The Numeric Kernel: a fixed-precision decimal type used for every price,
//! quantity, and fee in the core. Never backed by binary floating point.

use crate::error::InvalidOrderReason;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use std::sync::LazyLock;

/// Fractional digits every `Amount` is normalized to.
pub const PRECISION: u32 = 18;

static DECIMAL_SHAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());

/// A non-negative, exact, 18-fractional-digit decimal value.
///
/// `Amount` never holds a negative value: prices, quantities, and fees are
/// all non-negative by construction in this domain, and subtraction is only
/// ever performed where the invariant `remaining = amount - filled` holds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Parses a decimal string. Rejects negative numbers, exponents, `NaN`,
    /// and any other non-finite or non-decimal shape.
    pub fn parse(input: &str) -> Result<Self, InvalidOrderReason> {
        let trimmed = input.trim();
        if !DECIMAL_SHAPE.is_match(trimmed) {
            return Err(InvalidOrderReason::BadNumeric(input.to_string()));
        }
        let value = Decimal::from_str_exact(trimmed)
            .map_err(|_| InvalidOrderReason::BadNumeric(input.to_string()))?;
        Ok(Self::normalized(value))
    }

    fn normalized(value: Decimal) -> Self {
        Amount(value.round_dp_with_strategy(PRECISION, RoundingStrategy::ToZero))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Saturating subtraction: clamps to `ZERO` rather than going negative.
    /// Used when shrinking `remaining` by a traded amount that is guaranteed
    /// by the matching walk never to exceed it, but kept saturating as a
    /// last-line invariant guard rather than an assumption.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if rhs.0 >= self.0 {
            Amount::ZERO
        } else {
            Amount(self.0 - rhs.0)
        }
    }

    pub fn mul(self, rhs: Self) -> Self {
        Amount::normalized(self.0 * rhs.0)
    }

    /// Division with half-even (banker's) rounding at [`PRECISION`] digits,
    /// the one operation in the kernel that cannot in general produce an
    /// exact finite-digit result.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        let quotient = self.0.checked_div(rhs.0)?;
        Some(Amount(
            quotient.round_dp_with_strategy(PRECISION, RoundingStrategy::MidpointNearestEven),
        ))
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Self) -> Amount {
        Amount::normalized(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Self) -> Amount {
        debug_assert!(rhs.0 <= self.0, "Amount subtraction would go negative");
        Amount::normalized(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0.normalize())
    }
}

impl FromStr for Amount {
    type Err = InvalidOrderReason;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = InvalidOrderReason;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}
