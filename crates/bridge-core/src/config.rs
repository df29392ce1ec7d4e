//! Configuration types for the gateway engine

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::constants::{FEE_CACHE_TTL_SECS, FEE_DEBOUNCE_MS};
use crate::{Error, Network, Result};

/// Fee cache tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCacheConfig {
    /// Quiescence window after the last input change before fetching
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long a fetched fee entry stays fresh
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_debounce_ms() -> u64 {
    FEE_DEBOUNCE_MS
}

fn default_ttl_secs() -> u64 {
    FEE_CACHE_TTL_SECS
}

impl FeeCacheConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for FeeCacheConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Network new sessions are created on
    pub network: Network,

    /// Fee cache settings
    #[serde(default)]
    pub fee_cache: FeeCacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            fee_cache: FeeCacheConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config document; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fee_cache.ttl_secs == 0 {
            return Err(Error::Config("feeCache.ttlSecs must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.fee_cache.debounce(), Duration::from_secs(1));
        assert_eq!(config.fee_cache.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let parsed: EngineConfig = serde_json::from_str(r#"{"network":"mainnet"}"#).unwrap();
        assert_eq!(parsed.network, Network::Mainnet);
        assert_eq!(parsed.fee_cache, FeeCacheConfig::default());

        let parsed: EngineConfig =
            serde_json::from_str(r#"{"network":"devnet","feeCache":{"ttlSecs":10}}"#).unwrap();
        assert_eq!(parsed.fee_cache.ttl_secs, 10);
        assert_eq!(parsed.fee_cache.debounce_ms, 1_000);
    }

    #[test]
    fn test_from_json_validates() {
        let config = EngineConfig::from_json(r#"{"network":"mainnet"}"#).unwrap();
        assert_eq!(config.network, Network::Mainnet);

        assert!(matches!(
            EngineConfig::from_json(r#"{"network":"mainnet","feeCache":{"ttlSecs":0}}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"network":"moonnet"}"#),
            Err(Error::Serialization(_))
        ));
    }
}
