//! Serializable state types for the presentation layer
//!
//! Everything here is derived. [`GatewayView::from_snapshot`] is called again
//! on every state-machine snapshot instead of patching a previous view.

use bridge_core::{EpochMillis, TxType};
use serde::Serialize;

use crate::codec;
use crate::deposits::DepositSet;
use crate::fee::{compute_fee, from_base_units, minimum_amount, CalculatedFee, SimpleFee};
use crate::registry::{chain_config, supported_currencies, Chain, DESTINATION_CHAINS};
use crate::session::{GatewaySession, GatewayTransaction};
use crate::status::{classify, confirmation_progress, ConfirmationProgress, MachineSnapshot, TxMeta};

/// Asset choices for the initial form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub symbol: String,
    pub name: String,
    pub icon: String,
    pub decimals: u32,
    pub source_chain: String,
}

/// Chain choices for the initial form
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub symbol: String,
    pub name: String,
    pub sdk_name: String,
}

/// Overall bridge options sent to the presentation layer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeOptions {
    pub tx_type: TxType,
    pub assets: Vec<AssetInfo>,
    pub chains: Vec<ChainInfo>,
}

impl BridgeOptions {
    pub fn for_tx_type(tx_type: TxType) -> Self {
        let assets = supported_currencies(tx_type)
            .iter()
            .map(|currency| {
                let cfg = currency.config();
                AssetInfo {
                    symbol: cfg.short.to_string(),
                    name: cfg.full_name.to_string(),
                    icon: cfg.icon.to_string(),
                    decimals: cfg.decimals,
                    source_chain: chain_config(cfg.source_chain).sdk_name.to_string(),
                }
            })
            .collect();

        let chains = DESTINATION_CHAINS
            .iter()
            .copied()
            .map(chain_info)
            .collect();

        Self {
            tx_type,
            assets,
            chains,
        }
    }
}

fn chain_info(chain: Chain) -> ChainInfo {
    let cfg = chain_config(chain);
    ChainInfo {
        symbol: cfg.short.to_string(),
        name: cfg.full_name.to_string(),
        sdk_name: cfg.sdk_name.to_string(),
    }
}

/// Fee breakdown for a specific amount
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInfo {
    #[serde(flatten)]
    pub fee: CalculatedFee,
    /// Smallest sensible amount, when fees are known
    pub minimum_amount: Option<f64>,
}

impl FeeInfo {
    pub fn new(amount: f64, tx_type: TxType, fees: Option<&SimpleFee>, decimals: u32) -> Self {
        Self {
            fee: compute_fee(amount, tx_type, fees, decimals),
            minimum_amount: minimum_amount(tx_type, fees, decimals),
        }
    }
}

/// The deposit currently on screen
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    pub source_tx_hash: String,
    pub amount: f64,
    pub dest_tx_hash: Option<String>,
    pub confirmations: ConfirmationProgress,
}

/// Everything the transaction screen needs for one snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayView {
    pub meta: TxMeta,
    pub fees: FeeInfo,
    pub remaining_time_ms: EpochMillis,
    pub deposit_index: usize,
    pub deposit_total: usize,
    pub deposit: Option<DepositInfo>,
    /// Query string to re-open this session; `None` if it could not be encoded
    pub resume_query: Option<String>,
}

impl GatewayView {
    /// Derive the view for the deposit `deposits` currently points at.
    ///
    /// `deposits` should have been refreshed against this snapshot's session.
    pub fn from_snapshot(
        snapshot: &MachineSnapshot,
        deposits: &DepositSet,
        fees: Option<&SimpleFee>,
        now: EpochMillis,
    ) -> Self {
        let session = &snapshot.context.tx;
        let decimals = session.currency().config().decimals;
        let active = deposits.current_deposit(session);

        let state = snapshot.deposit_state(deposits.current_hash());
        let meta = classify(session, active, state.as_ref(), now);

        // Fees apply to what actually arrived once a deposit exists
        let amount = active.map_or(session.target_amount, |tx| {
            from_base_units(tx.source_tx_amount, decimals)
        });

        let resume_query = match codec::encode(session) {
            Ok(query) => Some(query),
            Err(e) => {
                tracing::warn!(id = %session.id, "Failed to encode session: {}", e);
                None
            }
        };

        Self {
            meta,
            fees: FeeInfo::new(amount, session.tx_type, fees, decimals),
            remaining_time_ms: session.remaining_time_ms(now),
            deposit_index: deposits.current_index(),
            deposit_total: deposits.total(),
            deposit: active.map(|tx| deposit_info(session, tx, decimals)),
            resume_query,
        }
    }
}

fn deposit_info(
    session: &GatewaySession,
    tx: &GatewayTransaction,
    decimals: u32,
) -> DepositInfo {
    DepositInfo {
        source_tx_hash: tx.source_tx_hash.to_string(),
        amount: from_base_units(tx.source_tx_amount, decimals),
        dest_tx_hash: tx.dest_tx_hash.as_ref().map(ToString::to_string),
        confirmations: confirmation_progress(session, tx),
    }
}
