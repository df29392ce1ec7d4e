//! Gateway session and deposit records
//!
//! Sessions are immutable values. Anything that "changes" a session
//! ([`GatewaySession::with_deposit`]) returns a new one.

use std::collections::BTreeMap;

use bridge_core::constants::GATEWAY_EXPIRY_MS;
use bridge_core::{Address, BaseUnits, EpochMillis, Network, TxHash, TxType};
use serde::{Deserialize, Serialize};

use crate::registry::{native_currency, to_released_currency, Chain, Currency};

/// One on-chain deposit (or burn) matched to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTransaction {
    pub source_tx_hash: TxHash,
    /// Deposited amount in base units
    pub source_tx_amount: BaseUnits,
    #[serde(default)]
    pub source_tx_confs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tx_conf_target: Option<u32>,
    /// Known once the destination-side transaction has been submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_tx_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<EpochMillis>,
}

impl GatewayTransaction {
    pub fn new(source_tx_hash: impl Into<String>, source_tx_amount: BaseUnits) -> Self {
        Self {
            source_tx_hash: TxHash::new(source_tx_hash),
            source_tx_amount,
            source_tx_confs: 0,
            source_tx_conf_target: None,
            dest_tx_hash: None,
            detected_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.dest_tx_hash.is_some()
    }
}

/// A single mint or burn request bound to one gateway address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySession {
    pub id: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub network: Network,
    pub source_asset: String,
    pub source_network: String,
    pub dest_network: String,
    #[serde(default)]
    pub dest_address: Address,
    #[serde(default)]
    pub user_address: Address,
    /// Requested amount in decimal units
    pub target_amount: f64,
    /// Base-unit amount hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_amount: Option<BaseUnits>,
    pub expiry_time: EpochMillis,
    #[serde(default)]
    pub transactions: BTreeMap<TxHash, GatewayTransaction>,
    #[serde(default)]
    pub custom_params: serde_json::Map<String, serde_json::Value>,
}

/// User input for a new session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub network: Network,
    /// Asset being moved; native and wrapped symbols are both accepted
    pub currency: Currency,
    /// Host chain of the wrapped asset (Ethereum, BSC)
    pub chain: Chain,
    pub dest_address: Address,
    pub user_address: Address,
    pub target_amount: f64,
    pub suggested_amount: Option<BaseUnits>,
}

fn new_session_id() -> String {
    format!("tx-{}", uuid::Uuid::new_v4().simple())
}

fn new_session(
    request: &SessionRequest,
    tx_type: TxType,
    now: EpochMillis,
) -> GatewaySession {
    let native = if request.currency.is_wrapped() {
        to_released_currency(request.currency)
    } else {
        request.currency
    };
    let native_chain = native.config().source_chain.config().sdk_name;
    let host_chain = request.chain.config().sdk_name;

    let (source_network, dest_network) = match tx_type {
        TxType::Mint => (native_chain, host_chain),
        TxType::Burn => (host_chain, native_chain),
    };

    let session = GatewaySession {
        id: new_session_id(),
        tx_type,
        network: request.network,
        source_asset: native.config().short.to_ascii_lowercase(),
        source_network: source_network.to_string(),
        dest_network: dest_network.to_string(),
        dest_address: request.dest_address.clone(),
        user_address: request.user_address.clone(),
        target_amount: request.target_amount,
        suggested_amount: request.suggested_amount,
        expiry_time: now.saturating_add(GATEWAY_EXPIRY_MS),
        transactions: BTreeMap::new(),
        custom_params: serde_json::Map::new(),
    };

    tracing::debug!(
        id = %session.id,
        tx_type = %tx_type,
        asset = %session.source_asset,
        "Created gateway session"
    );
    session
}

/// Start a lock-and-mint session at `now`
pub fn new_mint_session(request: &SessionRequest, now: EpochMillis) -> GatewaySession {
    new_session(request, TxType::Mint, now)
}

/// Start a burn-and-release session at `now`
pub fn new_burn_session(request: &SessionRequest, now: EpochMillis) -> GatewaySession {
    new_session(request, TxType::Burn, now)
}

impl GatewaySession {
    /// Creation time, derived from the fixed 24h gateway window
    pub fn created_timestamp(&self) -> EpochMillis {
        self.expiry_time.saturating_sub(GATEWAY_EXPIRY_MS)
    }

    /// Milliseconds until the gateway address expires (0 once expired)
    pub fn remaining_time_ms(&self, now: EpochMillis) -> EpochMillis {
        self.expiry_time.saturating_sub(now).max(0)
    }

    pub fn is_expired(&self, now: EpochMillis) -> bool {
        now >= self.expiry_time
    }

    pub fn deposit(&self, hash: &str) -> Option<&GatewayTransaction> {
        self.transactions.get(&TxHash::new(hash))
    }

    pub fn deposit_count(&self) -> usize {
        self.transactions.len()
    }

    /// Native currency this session moves
    pub fn currency(&self) -> Currency {
        native_currency(self.tx_type, &self.source_asset)
    }

    /// New session with `tx` inserted, replacing any deposit with the same hash
    pub fn with_deposit(&self, tx: GatewayTransaction) -> GatewaySession {
        let mut next = self.clone();
        next.transactions.insert(tx.source_tx_hash.clone(), tx);
        next
    }

    /// New session with `custom_params` replaced
    pub fn with_custom_params(
        &self,
        custom_params: serde_json::Map<String, serde_json::Value>,
    ) -> GatewaySession {
        GatewaySession {
            custom_params,
            ..self.clone()
        }
    }
}
