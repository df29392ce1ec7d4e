//! Fee tables and fee math
//!
//! The external SDK reports fees per asset as
//!
//! - `mint` / `burn`: protocol fee in basis points (divisor = 10000)
//! - `lock` / `release`: flat network fee in the asset's base units, often as a
//!   big-integer-like value (JSON number, decimal string, or `0x` hex string)
//!
//! [`normalize_fee_table`] turns the raw table into a [`SimpleFee`], and
//! [`compute_fee`] combines it with an amount into a [`CalculatedFee`].

use std::collections::{BTreeMap, HashMap};

use bridge_core::constants::{BASIS_POINTS_DIVISOR, CONVERSION_DECIMALS};
use bridge_core::{BaseUnits, FeeError, TxType};
use serde::{Deserialize, Serialize};

use crate::registry::{Chain, Currency};

/// Normalized per-asset fee rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleFee {
    /// Mint fee in basis points
    pub mint: u32,
    /// Burn fee in basis points
    pub burn: u32,
    /// Flat network fee for locking, in base units
    pub lock: BaseUnits,
    /// Flat network fee for releasing, in base units
    pub release: BaseUnits,
}

/// Mint/burn rates for one destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFee {
    pub mint: u32,
    pub burn: u32,
}

/// Fee shape keyed by destination chain (`{ethereum: {mint, burn}, lock, release}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeFee {
    pub lock: RawAmount,
    pub release: RawAmount,
    #[serde(flatten)]
    pub chains: BTreeMap<String, ChainFee>,
}

impl BridgeFee {
    /// Adapt to the [`SimpleFee`] shape for one destination chain
    pub fn to_simple_fee(&self, chain: Chain) -> Result<SimpleFee, FeeError> {
        let name = chain.config().sdk_name;
        let rates = self
            .chains
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, rates)| rates)
            .ok_or_else(|| FeeError::MissingChain {
                chain: name.to_string(),
            })?;

        Ok(SimpleFee {
            mint: rates.mint,
            burn: rates.burn,
            lock: self.lock.to_u64("lock")?,
            release: self.release.to_u64("release")?,
        })
    }
}

/// Big-integer-like amount as the SDK serializes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl RawAmount {
    fn to_u64(&self, field: &'static str) -> Result<u64, FeeError> {
        let invalid = || FeeError::InvalidAmount {
            field,
            value: self.to_string(),
        };

        match self {
            Self::Integer(v) => Ok(*v),
            Self::Float(v) => {
                if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= u64::MAX as f64 {
                    Ok(*v as u64)
                } else {
                    Err(invalid())
                }
            }
            Self::Text(s) => {
                let s = s.trim();
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse::<u64>(),
                };
                parsed.map_err(|_| invalid())
            }
        }
    }
}

impl std::fmt::Display for RawAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One asset's entry in the raw SDK fee table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFeeEntry {
    pub mint: RawAmount,
    pub burn: RawAmount,
    pub lock: RawAmount,
    pub release: RawAmount,
}

/// Raw SDK fee table: asset symbol -> fee entry
pub type RawFeeTable = HashMap<String, RawFeeEntry>;

impl RawFeeEntry {
    pub fn to_simple_fee(&self) -> Result<SimpleFee, FeeError> {
        let rate = |raw: &RawAmount, field| {
            raw.to_u64(field).and_then(|v| {
                u32::try_from(v).map_err(|_| FeeError::InvalidAmount {
                    field,
                    value: v.to_string(),
                })
            })
        };

        Ok(SimpleFee {
            mint: rate(&self.mint, "mint")?,
            burn: rate(&self.burn, "burn")?,
            lock: self.lock.to_u64("lock")?,
            release: self.release.to_u64("release")?,
        })
    }
}

/// Pick a currency's entry out of a raw fee table and normalize it.
///
/// Table keys are matched case-insensitively against the SDK asset name and
/// the short symbol, so wrapped currencies resolve to their native entry.
pub fn normalize_fee_table(table: &RawFeeTable, currency: Currency) -> Result<SimpleFee, FeeError> {
    let config = currency.config();
    let entry = table
        .iter()
        .find(|(key, _)| {
            key.eq_ignore_ascii_case(config.sdk_name) || key.eq_ignore_ascii_case(config.short)
        })
        .map(|(_, entry)| entry)
        .ok_or_else(|| FeeError::MissingAsset {
            asset: config.short.to_string(),
        })?;

    entry.to_simple_fee()
}

/// Fee breakdown for a given amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculatedFee {
    /// Protocol fee rate (0..1)
    #[serde(rename = "renVMFee")]
    pub ren_vm_fee: f64,
    /// Protocol fee in decimal units of the asset
    #[serde(rename = "renVMFeeAmount")]
    pub ren_vm_fee_amount: f64,
    /// Flat network fee in decimal units of the asset
    #[serde(rename = "networkFee")]
    pub network_fee: f64,
    /// Amount received after fees, rounded to 6 places, never negative
    #[serde(rename = "conversionTotal")]
    pub conversion_total: f64,
    /// Fee data was not available yet; the zero fees are placeholders
    pub pending: bool,
}

impl CalculatedFee {
    fn pending(amount: f64) -> Self {
        Self {
            ren_vm_fee: 0.0,
            ren_vm_fee_amount: 0.0,
            network_fee: 0.0,
            conversion_total: amount,
            pending: true,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Round half away from zero to `places` decimals.
///
/// Values too large to carry any fraction at that precision come back as-is.
pub fn round_to(value: f64, places: i32) -> f64 {
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53

    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= EXACT_LIMIT {
        return value;
    }
    scaled.round() / factor
}

/// Convert base units to decimal units
pub fn from_base_units(units: BaseUnits, decimals: u32) -> f64 {
    units as f64 / 10f64.powi(decimals as i32)
}

/// Compute the fee breakdown for `amount` (decimal units).
///
/// `fees == None` means fee data has not loaded: the result has zero fees,
/// `conversion_total == amount`, and `pending == true`.
///
/// Negative or non-finite amounts are treated as 0.
pub fn compute_fee(
    amount: f64,
    tx_type: TxType,
    fees: Option<&SimpleFee>,
    decimals: u32,
) -> CalculatedFee {
    let amount = if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    };

    let Some(fees) = fees else {
        return CalculatedFee::pending(amount);
    };

    let (rate_bps, network_units) = match tx_type {
        TxType::Mint => (fees.mint, fees.lock),
        TxType::Burn => (fees.burn, fees.release),
    };

    let ren_vm_fee = rate_bps as f64 / BASIS_POINTS_DIVISOR;
    let ren_vm_fee_amount = amount * ren_vm_fee;
    let network_fee = from_base_units(network_units, decimals);

    let total = round_to(amount - ren_vm_fee_amount - network_fee, CONVERSION_DECIMALS);
    let conversion_total = if total > 0.0 { total } else { 0.0 };

    CalculatedFee {
        ren_vm_fee,
        ren_vm_fee_amount,
        network_fee,
        conversion_total,
        pending: false,
    }
}

/// Smallest amount whose conversion total is not eaten by fees.
///
/// Returns `None` when fees are unknown or the protocol rate takes everything.
pub fn minimum_amount(tx_type: TxType, fees: Option<&SimpleFee>, decimals: u32) -> Option<f64> {
    let fees = fees?;
    let (rate_bps, network_units) = match tx_type {
        TxType::Mint => (fees.mint, fees.lock),
        TxType::Burn => (fees.burn, fees.release),
    };

    let keep = 1.0 - rate_bps as f64 / BASIS_POINTS_DIVISOR;
    if keep <= 0.0 {
        return None;
    }

    Some(round_to(
        from_base_units(network_units, decimals) / keep,
        CONVERSION_DECIMALS,
    ))
}
