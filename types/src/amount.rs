//! Token amount type.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 raw; one BAT is `10^18` raw.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use crate::TypesError;

/// Number of fractional decimal digits carried by an [`Amount`].
pub const DECIMALS: u32 = 18;

/// Raw units in one whole BAT.
pub const ONE_BAT: u128 = 10u128.pow(DECIMALS);

/// A BAT amount in raw units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole BAT.
    pub fn from_bat(whole: u64) -> Self {
        Self(u128::from(whole) * ONE_BAT)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Parse a decimal string such as `"30"`, `"0.05"` or `"1.5"`.
    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidAmount(s.to_string());

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.contains('.') && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > DECIMALS as usize {
            return Err(invalid());
        }

        let whole_raw = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| TypesError::AmountOverflow)?
        };
        let mut frac_raw: u128 = if frac.is_empty() {
            0
        } else {
            frac.parse::<u128>().map_err(|_| invalid())?
        };
        frac_raw *= 10u128.pow(DECIMALS - frac.len() as u32);

        whole_raw
            .checked_mul(ONE_BAT)
            .and_then(|w| w.checked_add(frac_raw))
            .map(Self)
            .ok_or(TypesError::AmountOverflow)
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
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ONE_BAT;
        let frac = self.0 % ONE_BAT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}
