//! Chain identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// An EVM chain id (EIP-155).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    pub const MAINNET: Self = Self(1);
    pub const GOERLI: Self = Self(5);
    pub const POLYGON: Self = Self(137);
    pub const MUMBAI: Self = Self(80_001);
    /// The network the voting contract is deployed on.
    pub const SEPOLIA: Self = Self(11_155_111);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Hex form used by wallets and JSON-RPC, e.g. `0xaa36a7`.
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Parse a hex quantity as returned by `eth_chainId`.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| TypesError::InvalidQuantity(s.to_string()))?;
        u64::from_str_radix(body, 16)
            .map(Self)
            .map_err(|_| TypesError::InvalidQuantity(s.to_string()))
    }

    /// Human-readable network name.
    pub fn network_name(&self) -> String {
        match *self {
            Self::MAINNET => "Ethereum Mainnet".to_string(),
            Self::GOERLI => "Goerli Testnet".to_string(),
            Self::SEPOLIA => "Sepolia Testnet".to_string(),
            Self::POLYGON => "Polygon Mainnet".to_string(),
            Self::MUMBAI => "Mumbai Testnet".to_string(),
            other => format!("Unknown Network ({})", other.to_hex()),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sepolia_hex_and_name() {
        assert_eq!(ChainId::SEPOLIA.to_hex(), "0xaa36a7");
        assert_eq!(ChainId::from_hex("0xaa36a7").unwrap(), ChainId::SEPOLIA);
        assert_eq!(ChainId::SEPOLIA.network_name(), "Sepolia Testnet");
    }

    #[test]
    fn unknown_network_name_includes_hex() {
        assert_eq!(
            ChainId::new(31337).network_name(),
            "Unknown Network (0x7a69)"
        );
    }
}
