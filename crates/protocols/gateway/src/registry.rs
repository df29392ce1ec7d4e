//! Static asset and chain registry
//!
//! Maps currency and chain symbols to display and SDK metadata. Lookups by
//! string never fail: anything unrecognized resolves to the `Unknown` variant
//! and its default config, since several callers render whatever a session
//! carries without validating it first.

use std::fmt;

use bridge_core::TxType;
use serde::{Deserialize, Serialize};

/// Bridgeable currencies, native and wrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Btc,
    Bch,
    Zec,
    Doge,
    Dgb,
    Dots,
    Eth,
    Bnb,
    RenBtc,
    RenBch,
    RenZec,
    RenDoge,
    RenDgb,
    RenDots,
    Unknown,
}

/// Chains a gateway transaction can start or end on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Chain {
    Bitcoin,
    BitcoinCash,
    Zcash,
    Dogecoin,
    DigiByte,
    Polkadot,
    Ethereum,
    BinanceSmartChain,
    Unknown,
}

/// Display and SDK metadata for a currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyConfig {
    pub symbol: Currency,
    pub short: &'static str,
    pub full_name: &'static str,
    /// Icon asset key used by the presentation layer
    pub icon: &'static str,
    pub decimals: u32,
    /// Chain the currency natively lives on
    pub source_chain: Chain,
    /// Asset name the external SDK expects
    pub sdk_name: &'static str,
}

/// Display and SDK metadata for a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub symbol: Chain,
    pub short: &'static str,
    pub full_name: &'static str,
    /// Chain name the external SDK expects (also the session's network field)
    pub sdk_name: &'static str,
    /// Confirmations the gateway waits for before a deposit is accepted
    pub target_confirmations: u32,
    /// Average block interval in seconds
    pub block_time_secs: u32,
}

const fn currency(
    symbol: Currency,
    short: &'static str,
    full_name: &'static str,
    icon: &'static str,
    decimals: u32,
    source_chain: Chain,
    sdk_name: &'static str,
) -> CurrencyConfig {
    CurrencyConfig {
        symbol,
        short,
        full_name,
        icon,
        decimals,
        source_chain,
        sdk_name,
    }
}

const fn chain(
    symbol: Chain,
    short: &'static str,
    full_name: &'static str,
    sdk_name: &'static str,
    target_confirmations: u32,
    block_time_secs: u32,
) -> ChainConfig {
    ChainConfig {
        symbol,
        short,
        full_name,
        sdk_name,
        target_confirmations,
        block_time_secs,
    }
}

static CURRENCIES: [CurrencyConfig; 15] = [
    currency(Currency::Btc, "BTC", "Bitcoin", "btc", 8, Chain::Bitcoin, "BTC"),
    currency(Currency::Bch, "BCH", "Bitcoin Cash", "bch", 8, Chain::BitcoinCash, "BCH"),
    currency(Currency::Zec, "ZEC", "Zcash", "zec", 8, Chain::Zcash, "ZEC"),
    currency(Currency::Doge, "DOGE", "Dogecoin", "doge", 8, Chain::Dogecoin, "DOGE"),
    currency(Currency::Dgb, "DGB", "DigiByte", "dgb", 8, Chain::DigiByte, "DGB"),
    currency(Currency::Dots, "DOTS", "Polkadot", "dots", 10, Chain::Polkadot, "DOT"),
    currency(Currency::Eth, "ETH", "Ether", "eth", 18, Chain::Ethereum, "ETH"),
    currency(Currency::Bnb, "BNB", "Binance Coin", "bnb", 18, Chain::BinanceSmartChain, "BNB"),
    currency(Currency::RenBtc, "renBTC", "Ren Bitcoin", "renbtc", 8, Chain::Ethereum, "BTC"),
    currency(Currency::RenBch, "renBCH", "Ren Bitcoin Cash", "renbch", 8, Chain::Ethereum, "BCH"),
    currency(Currency::RenZec, "renZEC", "Ren Zcash", "renzec", 8, Chain::Ethereum, "ZEC"),
    currency(Currency::RenDoge, "renDOGE", "Ren Dogecoin", "rendoge", 8, Chain::Ethereum, "DOGE"),
    currency(Currency::RenDgb, "renDGB", "Ren DigiByte", "rendgb", 8, Chain::Ethereum, "DGB"),
    currency(Currency::RenDots, "renDOTS", "Ren Polkadot", "rendots", 10, Chain::Ethereum, "DOT"),
    currency(Currency::Unknown, "UNKNOWN", "Unknown", "unknown", 0, Chain::Unknown, "UNKNOWN"),
];

static CHAINS: [ChainConfig; 9] = [
    chain(Chain::Bitcoin, "BTC", "Bitcoin", "bitcoin", 6, 600),
    chain(Chain::BitcoinCash, "BCH", "Bitcoin Cash", "bitcoinCash", 6, 600),
    chain(Chain::Zcash, "ZEC", "Zcash", "zcash", 24, 150),
    chain(Chain::Dogecoin, "DOGE", "Dogecoin", "dogecoin", 40, 60),
    chain(Chain::DigiByte, "DGB", "DigiByte", "digibyte", 40, 15),
    chain(Chain::Polkadot, "DOT", "Polkadot", "polkadot", 2, 6),
    chain(Chain::Ethereum, "ETH", "Ethereum", "ethereum", 30, 13),
    chain(Chain::BinanceSmartChain, "BSC", "Binance Smart Chain", "binanceSmartChain", 30, 3),
    chain(Chain::Unknown, "UNKNOWNC", "Unknown", "unknown", 0, 0),
];

/// Native currencies that can be minted from their source chain
pub const MINTABLE_CURRENCIES: &[Currency] = &[
    Currency::Btc,
    Currency::Bch,
    Currency::Zec,
    Currency::Doge,
    Currency::Dgb,
];

/// Wrapped currencies that can be burned back to their source chain
pub const RELEASABLE_CURRENCIES: &[Currency] = &[
    Currency::RenBtc,
    Currency::RenBch,
    Currency::RenZec,
    Currency::RenDoge,
    Currency::RenDgb,
];

/// Chains wrapped assets can be minted to or burned from
pub const DESTINATION_CHAINS: &[Chain] = &[Chain::Ethereum, Chain::BinanceSmartChain];

impl Currency {
    /// Resolve a symbol case-insensitively; unrecognized symbols give `Unknown`
    pub fn from_symbol(symbol: &str) -> Self {
        CURRENCIES
            .iter()
            .find(|c| c.short.eq_ignore_ascii_case(symbol))
            .map_or(Currency::Unknown, |c| c.symbol)
    }

    pub fn config(&self) -> &'static CurrencyConfig {
        currency_config(*self)
    }

    pub fn is_wrapped(&self) -> bool {
        RELEASABLE_CURRENCIES.contains(self) || *self == Currency::RenDots
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config().short)
    }
}

impl Chain {
    /// Resolve an SDK chain name or short symbol; unrecognized names give `Unknown`
    pub fn from_name(name: &str) -> Self {
        CHAINS
            .iter()
            .find(|c| c.sdk_name.eq_ignore_ascii_case(name) || c.short.eq_ignore_ascii_case(name))
            .map_or(Chain::Unknown, |c| c.symbol)
    }

    pub fn config(&self) -> &'static ChainConfig {
        chain_config(*self)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config().full_name)
    }
}

/// The default config returned for anything unrecognized
pub fn unknown_currency_config() -> &'static CurrencyConfig {
    &CURRENCIES[CURRENCIES.len() - 1]
}

pub fn unknown_chain_config() -> &'static ChainConfig {
    &CHAINS[CHAINS.len() - 1]
}

pub fn currency_config(symbol: Currency) -> &'static CurrencyConfig {
    CURRENCIES
        .iter()
        .find(|c| c.symbol == symbol)
        .unwrap_or_else(unknown_currency_config)
}

pub fn chain_config(symbol: Chain) -> &'static ChainConfig {
    CHAINS
        .iter()
        .find(|c| c.symbol == symbol)
        .unwrap_or_else(unknown_chain_config)
}

/// Look up a currency config by symbol, falling back to the default config
pub fn currency_config_by_symbol(symbol: &str) -> &'static CurrencyConfig {
    currency_config(Currency::from_symbol(symbol))
}

/// Look up a chain config by SDK name, falling back to the default config
pub fn chain_config_by_name(name: &str) -> &'static ChainConfig {
    chain_config(Chain::from_name(name))
}

/// Wrapped counterpart minted for a native currency (BTC -> renBTC)
pub fn to_minted_currency(native: Currency) -> Currency {
    match native {
        Currency::Btc => Currency::RenBtc,
        Currency::Bch => Currency::RenBch,
        Currency::Zec => Currency::RenZec,
        Currency::Doge => Currency::RenDoge,
        Currency::Dgb => Currency::RenDgb,
        Currency::Dots => Currency::RenDots,
        _ => Currency::Unknown,
    }
}

/// Native currency released for a wrapped one (renBTC -> BTC)
pub fn to_released_currency(wrapped: Currency) -> Currency {
    match wrapped {
        Currency::RenBtc => Currency::Btc,
        Currency::RenBch => Currency::Bch,
        Currency::RenZec => Currency::Zec,
        Currency::RenDoge => Currency::Doge,
        Currency::RenDgb => Currency::Dgb,
        Currency::RenDots => Currency::Dots,
        _ => Currency::Unknown,
    }
}

/// The native asset a session of the given type moves.
///
/// Sessions carry the native symbol for mints and either form for burns.
pub fn native_currency(tx_type: TxType, source_asset: &str) -> Currency {
    let currency = Currency::from_symbol(source_asset);
    match tx_type {
        TxType::Mint => currency,
        TxType::Burn if currency.is_wrapped() => to_released_currency(currency),
        TxType::Burn => currency,
    }
}

/// Currencies the user can pick for a transaction type
pub fn supported_currencies(tx_type: TxType) -> &'static [Currency] {
    match tx_type {
        TxType::Mint => MINTABLE_CURRENCIES,
        TxType::Burn => RELEASABLE_CURRENCIES,
    }
}
