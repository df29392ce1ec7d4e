//! Core type definitions for the gateway engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// Source-chain transaction hash of a deposit (or burn)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain address in its native textual form.
///
/// No format validation happens here; that belongs to the per-chain SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RenVM network a session runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            other => Err(ParseError::UnknownVariant {
                kind: "network",
                value: other.to_string(),
            }),
        }
    }
}

/// Direction of a gateway transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    /// Lock on the source chain, mint the wrapped asset on the destination
    Mint,
    /// Burn the wrapped asset, release the original on its source chain
    Burn,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Burn => "burn",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mint" => Ok(Self::Mint),
            "burn" => Ok(Self::Burn),
            other => Err(ParseError::UnknownVariant {
                kind: "tx type",
                value: other.to_string(),
            }),
        }
    }
}

/// Milliseconds since the Unix epoch
pub type EpochMillis = i64;

/// Integer amount in an asset's smallest unit (satoshi, wei, ...)
pub type BaseUnits = u64;

/// Constants
pub mod constants {
    use super::EpochMillis;

    /// One hour in milliseconds
    pub const MS_PER_HOUR: EpochMillis = 60 * 60 * 1000;

    /// Gateway addresses stay valid for exactly 24h after creation
    pub const GATEWAY_EXPIRY_MS: EpochMillis = 24 * MS_PER_HOUR;

    /// Fee rates are expressed in basis points
    pub const BASIS_POINTS_DIVISOR: f64 = 10_000.0;

    /// Quiescence window before a settled fee key is fetched
    pub const FEE_DEBOUNCE_MS: u64 = 1_000;

    /// Default lifetime of a cached fee entry
    pub const FEE_CACHE_TTL_SECS: u64 = 300;

    /// Decimal places kept in `conversionTotal`
    pub const CONVERSION_DECIMALS: i32 = 6;
}
