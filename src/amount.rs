use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Width every wei amount is zero-padded to when stored, so that
/// lexicographic order in the backing store matches numeric order.
pub const PAD_WIDTH: usize = 32;

/// Number of wei in one ETH (10^18).
const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// An unsigned wei amount.
///
/// All marketplace money flows through this type: comparison, addition and
/// rate multiplication are exact 256-bit integer operations, and the store
/// representation is a fixed-width base-10 string (see [`Wei::padded`]).
/// Floating point is never involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Wei(U256);

impl Wei {
    pub const ZERO: Wei = Wei(U256::ZERO);

    pub fn new(value: U256) -> Self {
        Wei(value)
    }

    pub fn from_u64(value: u64) -> Self {
        Wei(U256::from(value))
    }

    /// Whole ETH expressed in wei.
    pub fn from_eth(eth: u64) -> Self {
        Wei(U256::from(eth) * U256::from(WEI_PER_ETH))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Store encoding: base-10, zero-padded to [`PAD_WIDTH`] characters.
    /// Amounts wider than the pad width are emitted unpadded.
    pub fn padded(&self) -> String {
        let digits = self.0.to_string();
        if digits.len() >= PAD_WIDTH {
            return digits;
        }
        let mut out = String::with_capacity(PAD_WIDTH);
        for _ in 0..(PAD_WIDTH - digits.len()) {
            out.push('0');
        }
        out.push_str(&digits);
        out
    }

    pub fn checked_add(&self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn saturating_add(&self, other: Wei) -> Wei {
        Wei(self.0.saturating_add(other.0))
    }

    /// Multiply by an integer rate (e.g. whole USD per ETH), saturating on
    /// the astronomically unlikely overflow.
    pub fn mul_rate(&self, rate: u64) -> Wei {
        Wei(self.0.saturating_mul(U256::from(rate)))
    }

    /// Format a USD-denominated wei value (rate * wei) as a dollar string
    /// with two decimals, using integer division only.
    pub fn format_usd(&self) -> String {
        let cents = self.0 / U256::from(WEI_PER_ETH / 100);
        let dollars = cents / U256::from(100u64);
        let rem = cents % U256::from(100u64);
        format!("${}.{:02}", dollars, rem.to::<u64>())
    }
}

impl fmt::Display for Wei {
    /// Human form: no padding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Wei {
    type Err = alloy::primitives::ruint::ParseError;

    /// Accepts both padded and unpadded decimal strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(Wei::ZERO);
        }
        U256::from_str_radix(trimmed, 10).map(Wei)
    }
}

impl From<U256> for Wei {
    fn from(value: U256) -> Self {
        Wei(value)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
