//! Native-currency amounts in wei.
//!
//! Amounts are fixed-point integers (u128) to avoid floating-point errors.
//! One ether is 10^18 wei.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// An amount of the chain's native currency, in wei.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a JSON-RPC hex quantity such as `"0x1bc16d674ec80000"`.
    pub fn from_hex_quantity(s: &str) -> Result<Self, TypesError> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| TypesError::InvalidQuantity(s.to_string()))?;
        if body.is_empty() {
            return Ok(Self::ZERO);
        }
        u128::from_str_radix(body, 16)
            .map(Self)
            .map_err(|_| TypesError::InvalidQuantity(s.to_string()))
    }

    /// Format as a decimal ether string, e.g. `1.5` or `0.0`.
    ///
    /// Trailing fractional zeros are trimmed but at least one fractional digit
    /// is always kept.
    pub fn to_ether_string(&self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        let mut frac_str = format!("{frac:018}");
        while frac_str.len() > 1 && frac_str.ends_with('0') {
            frac_str.pop();
        }
        format!("{whole}.{frac_str}")
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.to_ether_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ether_formatting() {
        assert_eq!(Wei::ZERO.to_ether_string(), "0.0");
        assert_eq!(Wei::new(WEI_PER_ETHER).to_ether_string(), "1.0");
        assert_eq!(Wei::new(WEI_PER_ETHER / 2).to_ether_string(), "0.5");
        assert_eq!(Wei::new(1).to_ether_string(), "0.000000000000000001");
        assert_eq!(
            Wei::new(3 * WEI_PER_ETHER + 250_000_000_000_000_000).to_ether_string(),
            "3.25"
        );
    }

    #[test]
    fn hex_quantity_parsing() {
        assert_eq!(
            Wei::from_hex_quantity("0xde0b6b3a7640000").unwrap(),
            Wei::new(WEI_PER_ETHER)
        );
        assert_eq!(Wei::from_hex_quantity("0x").unwrap(), Wei::ZERO);
        assert!(Wei::from_hex_quantity("123").is_err());
        assert!(Wei::from_hex_quantity("0xnope").is_err());
    }
}
