//! Transaction status classification
//!
//! Derives a display `{status, phase}` from a session, the external state
//! machine's current state for the active deposit, and the clock. The state
//! machine is read-only here: snapshots come in, [`TxMeta`] goes out, and the
//! same snapshot always yields the same result.
//!
//! Rules, first match wins. "Active" is the deposit currently on screen.
//!
//! 1. the gateway window has passed and the active deposit is not complete
//!    -> `Expired`
//! 2. the active deposit has a destination hash -> `Completed`
//! 3. no deposit yet, or the active deposit ranks before the action states
//!    -> `Pending` in the source phase (`Lock` / `Burn`)
//! 4. the active deposit was accepted and awaits the user's wallet
//!    -> `ActionRequired` in the destination phase (`Mint` / `Release`)
//! 5. the destination transaction was initiated -> `Pending` in the
//!    destination phase
//! 6. a state this engine does not know -> `Processing`
//!
//! Other deposits of the session do not affect the active one's status.

use std::collections::BTreeMap;

use bridge_core::{EpochMillis, TxType};
use serde::{Deserialize, Serialize};

use crate::deposits::DepositSet;
use crate::registry::{chain_config_by_name, Chain};
use crate::session::{GatewaySession, GatewayTransaction};

/// Coarse status shown in transaction lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxEntryStatus {
    Pending,
    ActionRequired,
    Completed,
    Expired,
    /// Fallback for machine states this engine does not recognize
    Processing,
}

/// Which leg of the transaction is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxPhase {
    Lock,
    Mint,
    Burn,
    Release,
    None,
}

/// Derived display metadata, recomputed on every snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    pub status: TxEntryStatus,
    pub phase: TxPhase,
    pub created_timestamp: EpochMillis,
}

/// Deposit machine states of the mint flow, in lifecycle order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintState {
    RestoringDeposit,
    SrcSettling,
    SrcConfirmed,
    Claiming,
    Accepted,
    DestInitiated,
    Other(String),
}

/// Machine states of the burn flow, in lifecycle order, plus error states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurnState {
    Created,
    SubmittingBurn,
    SrcSettling,
    SrcConfirmed,
    Accepted,
    DestInitiated,
    ErrorBurning,
    ErrorReleasing,
    Other(String),
}

impl MintState {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "restoringDeposit" => Self::RestoringDeposit,
            "srcSettling" => Self::SrcSettling,
            "srcConfirmed" => Self::SrcConfirmed,
            "claiming" => Self::Claiming,
            "accepted" => Self::Accepted,
            "destInitiated" => Self::DestInitiated,
            other => Self::Other(other.to_string()),
        }
    }

    /// Position in the lifecycle; `None` for unrecognized states
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::RestoringDeposit => Some(0),
            Self::SrcSettling => Some(1),
            Self::SrcConfirmed => Some(2),
            Self::Claiming => Some(3),
            Self::Accepted => Some(4),
            Self::DestInitiated => Some(5),
            Self::Other(_) => None,
        }
    }
}

impl BurnState {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "created" => Self::Created,
            "submittingBurn" => Self::SubmittingBurn,
            "srcSettling" => Self::SrcSettling,
            "srcConfirmed" => Self::SrcConfirmed,
            "accepted" => Self::Accepted,
            "destInitiated" => Self::DestInitiated,
            "errorBurning" => Self::ErrorBurning,
            "errorReleasing" => Self::ErrorReleasing,
            other => Self::Other(other.to_string()),
        }
    }

    /// Position in the lifecycle; error and unrecognized states have none
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Created => Some(0),
            Self::SubmittingBurn => Some(1),
            Self::SrcSettling => Some(2),
            Self::SrcConfirmed => Some(3),
            Self::Accepted => Some(4),
            Self::DestInitiated => Some(5),
            Self::ErrorBurning | Self::ErrorReleasing | Self::Other(_) => None,
        }
    }
}

/// Active deposit's machine state, tagged by flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositState {
    Mint(MintState),
    Burn(BurnState),
}

/// Where a deposit stands, independent of flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Settling,
    AwaitingUser,
    DestInitiated,
    Failed(TxPhase),
    Unrecognized,
}

impl DepositState {
    pub fn from_tag(tx_type: TxType, tag: &str) -> Self {
        match tx_type {
            TxType::Mint => Self::Mint(MintState::from_tag(tag)),
            TxType::Burn => Self::Burn(BurnState::from_tag(tag)),
        }
    }

    /// Lifecycle rank of the state, and of the first state that needs the user
    fn ranks(&self) -> (Option<u8>, Option<u8>) {
        match self {
            Self::Mint(state) => (state.rank(), MintState::Claiming.rank()),
            Self::Burn(state) => (state.rank(), BurnState::Accepted.rank()),
        }
    }

    /// Still on the source chain, before anything is asked of the user
    pub fn is_before_action(&self) -> bool {
        match self.ranks() {
            (Some(rank), Some(action)) => rank < action,
            _ => false,
        }
    }

    fn stage(&self) -> Stage {
        match self {
            Self::Mint(MintState::Other(_)) | Self::Burn(BurnState::Other(_)) => {
                Stage::Unrecognized
            }
            Self::Burn(BurnState::ErrorBurning) => Stage::Failed(TxPhase::Burn),
            Self::Burn(BurnState::ErrorReleasing) => Stage::Failed(TxPhase::Release),
            Self::Mint(MintState::DestInitiated) | Self::Burn(BurnState::DestInitiated) => {
                Stage::DestInitiated
            }
            state if state.is_before_action() => Stage::Settling,
            _ => Stage::AwaitingUser,
        }
    }
}

/// `(source phase, destination phase)` for a flow
pub fn phases(tx_type: TxType) -> (TxPhase, TxPhase) {
    match tx_type {
        TxType::Mint => (TxPhase::Lock, TxPhase::Mint),
        TxType::Burn => (TxPhase::Burn, TxPhase::Release),
    }
}

/// A destination transaction is known for some deposit of the session.
///
/// Session-wide; [`classify`] judges completion per active deposit.
pub fn is_transaction_completed(session: &GatewaySession) -> bool {
    session.transactions.values().any(GatewayTransaction::is_completed)
}

pub fn is_tx_expired(session: &GatewaySession, now: EpochMillis) -> bool {
    session.is_expired(now)
}

/// Completed or expired: nothing more will happen without user input
pub fn is_tx_finished(session: &GatewaySession, now: EpochMillis) -> bool {
    is_transaction_completed(session) || is_tx_expired(session, now)
}

/// Classify a session given its active deposit and that deposit's machine state
pub fn classify(
    session: &GatewaySession,
    active: Option<&GatewayTransaction>,
    active_state: Option<&DepositState>,
    now: EpochMillis,
) -> TxMeta {
    let meta = |status, phase| TxMeta {
        status,
        phase,
        created_timestamp: session.created_timestamp(),
    };
    let (source_phase, dest_phase) = phases(session.tx_type);

    let completed = active.is_some_and(GatewayTransaction::is_completed);

    if is_tx_expired(session, now) && !completed {
        return meta(TxEntryStatus::Expired, TxPhase::None);
    }
    if completed {
        return meta(TxEntryStatus::Completed, TxPhase::None);
    }

    let state = match active_state {
        Some(state) if !session.transactions.is_empty() || session.tx_type == TxType::Burn => {
            state
        }
        _ => return meta(TxEntryStatus::Pending, source_phase),
    };

    match state.stage() {
        Stage::Settling => meta(TxEntryStatus::Pending, source_phase),
        Stage::AwaitingUser => meta(TxEntryStatus::ActionRequired, dest_phase),
        Stage::DestInitiated => meta(TxEntryStatus::Pending, dest_phase),
        Stage::Failed(phase) => meta(TxEntryStatus::ActionRequired, phase),
        Stage::Unrecognized => {
            tracing::debug!(id = %session.id, state = ?state, "Unrecognized machine state");
            meta(TxEntryStatus::Processing, TxPhase::None)
        }
    }
}

/// Child deposit machine snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSnapshot {
    /// State value: a tag, or a nested `{tag: substate}` object
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Context carried by the session machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotContext {
    pub tx: GatewaySession,
    #[serde(default)]
    pub deposit_machines: BTreeMap<String, ChildSnapshot>,
}

/// Snapshot of the external session state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    #[serde(default)]
    pub value: serde_json::Value,
    pub context: SnapshotContext,
}

/// Top-level tag of a (possibly nested) state value
pub fn state_tag(value: &serde_json::Value) -> Option<&str> {
    match value {
        serde_json::Value::String(tag) => Some(tag.as_str()),
        serde_json::Value::Object(map) if map.len() == 1 => map.keys().next().map(String::as_str),
        _ => None,
    }
}

impl MachineSnapshot {
    /// Machine state for the deposit `hash`.
    ///
    /// Burn flows drive a single machine, so its top-level value stands in when
    /// there is no child machine for the hash.
    pub fn deposit_state(&self, hash: &str) -> Option<DepositState> {
        let tx_type = self.context.tx.tx_type;
        let child = self
            .context
            .deposit_machines
            .get(hash)
            .and_then(|child| state_tag(&child.value));

        let tag = match (child, tx_type) {
            (Some(tag), _) => tag,
            (None, TxType::Burn) => state_tag(&self.value)?,
            (None, TxType::Mint) => return None,
        };
        Some(DepositState::from_tag(tx_type, tag))
    }
}

/// Classify a snapshot for the deposit `active_hash`, or the first deposit in
/// display order when none is selected.
pub fn classify_snapshot(
    snapshot: &MachineSnapshot,
    active_hash: Option<&str>,
    now: EpochMillis,
) -> TxMeta {
    let session = &snapshot.context.tx;
    let hash = match active_hash {
        Some(hash) => hash.to_string(),
        None => DepositSet::from_session(session).current_hash().to_string(),
    };
    let state = snapshot.deposit_state(&hash);
    classify(session, session.deposit(&hash), state.as_ref(), now)
}

/// Source-chain confirmation progress of a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationProgress {
    pub confirmations: u32,
    pub target: u32,
    /// Rough seconds until the target is reached
    pub remaining_secs: u64,
}

impl ConfirmationProgress {
    pub fn is_confirmed(&self) -> bool {
        self.confirmations >= self.target
    }
}

/// Confirmation progress, using the source chain's default target when the
/// deposit does not report one.
pub fn confirmation_progress(
    session: &GatewaySession,
    deposit: &GatewayTransaction,
) -> ConfirmationProgress {
    let chain = chain_config_by_name(&session.source_network);
    let target = deposit
        .source_tx_conf_target
        .unwrap_or(chain.target_confirmations);
    let missing = target.saturating_sub(deposit.source_tx_confs);

    ConfirmationProgress {
        confirmations: deposit.source_tx_confs,
        target,
        remaining_secs: u64::from(missing) * u64::from(chain.block_time_secs),
    }
}

/// Whether the session's source chain is one this registry knows
pub fn has_known_source_chain(session: &GatewaySession) -> bool {
    chain_config_by_name(&session.source_network).symbol != Chain::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::constants::GATEWAY_EXPIRY_MS;
    use bridge_core::{Address, Network, TxHash};

    const NOW: EpochMillis = 1_604_600_000_000;

    fn session(tx_type: TxType) -> GatewaySession {
        GatewaySession {
            id: "tx-1".into(),
            tx_type,
            network: Network::Testnet,
            source_asset: "btc".into(),
            source_network: "bitcoin".into(),
            dest_network: "ethereum".into(),
            dest_address: Address::default(),
            user_address: Address::default(),
            target_amount: 1.0,
            suggested_amount: None,
            expiry_time: NOW + GATEWAY_EXPIRY_MS / 2,
            transactions: BTreeMap::new(),
            custom_params: serde_json::Map::new(),
        }
    }

    fn deposit(hash: &str) -> GatewayTransaction {
        GatewayTransaction::new(hash, 100_000)
    }

    fn mint(tag: &str) -> DepositState {
        DepositState::from_tag(TxType::Mint, tag)
    }

    #[test]
    fn test_expired_without_deposits_is_expired() {
        let s = session(TxType::Mint);
        let meta = classify(&s, None, None, s.expiry_time + 1);
        assert_eq!(meta.status, TxEntryStatus::Expired);
        assert_eq!(meta.created_timestamp, s.expiry_time - GATEWAY_EXPIRY_MS);
    }

    #[test]
    fn test_no_deposit_is_pending_lock() {
        let meta = classify(&session(TxType::Mint), None, None, NOW);
        assert_eq!(meta.status, TxEntryStatus::Pending);
        assert_eq!(meta.phase, TxPhase::Lock);

        let meta = classify(&session(TxType::Burn), None, None, NOW);
        assert_eq!(meta.phase, TxPhase::Burn);
    }

    #[test]
    fn test_settling_deposit_is_pending() {
        let s = session(TxType::Mint).with_deposit(deposit("a"));
        for tag in ["restoringDeposit", "srcSettling", "srcConfirmed"] {
            let meta = classify(&s, s.deposit("a"), Some(&mint(tag)), NOW);
            assert_eq!(meta.status, TxEntryStatus::Pending, "{tag}");
            assert_eq!(meta.phase, TxPhase::Lock);
        }
    }

    #[test]
    fn test_accepted_requires_action() {
        let s = session(TxType::Mint).with_deposit(deposit("a"));
        for tag in ["accepted", "claiming"] {
            let meta = classify(&s, s.deposit("a"), Some(&mint(tag)), NOW);
            assert_eq!(meta.status, TxEntryStatus::ActionRequired);
            assert_eq!(meta.phase, TxPhase::Mint);
        }

        let burn = session(TxType::Burn).with_deposit(deposit("b"));
        let meta = classify(
            &burn,
            burn.deposit("b"),
            Some(&DepositState::from_tag(TxType::Burn, "accepted")),
            NOW,
        );
        assert_eq!(meta.status, TxEntryStatus::ActionRequired);
        assert_eq!(meta.phase, TxPhase::Release);
    }

    #[test]
    fn test_dest_hash_completes_regardless_of_state() {
        let mut tx = deposit("a");
        tx.dest_tx_hash = Some(TxHash::new("0xdead"));
        let s = session(TxType::Mint).with_deposit(tx);

        assert!(is_transaction_completed(&s));
        for tag in ["srcSettling", "accepted", "somethingNew"] {
            let meta = classify(&s, s.deposit("a"), Some(&mint(tag)), NOW);
            assert_eq!(meta.status, TxEntryStatus::Completed);
        }
        // A completed deposit does not expire
        let meta = classify(&s, s.deposit("a"), None, s.expiry_time + 1);
        assert_eq!(meta.status, TxEntryStatus::Completed);
        assert!(is_tx_finished(&s, NOW));
    }

    #[test]
    fn test_later_deposit_awaiting_claim_is_not_completed() {
        let mut first = deposit("d0");
        first.detected_at = Some(1);
        first.dest_tx_hash = Some(TxHash::new("0xdone"));
        let mut second = deposit("d1");
        second.detected_at = Some(2);
        let s = session(TxType::Mint).with_deposit(first).with_deposit(second);

        assert!(is_transaction_completed(&s));

        let meta = classify(&s, s.deposit("d1"), Some(&mint("accepted")), NOW);
        assert_eq!(meta.status, TxEntryStatus::ActionRequired);
        assert_eq!(meta.phase, TxPhase::Mint);

        let meta = classify(&s, s.deposit("d0"), Some(&mint("destInitiated")), NOW);
        assert_eq!(meta.status, TxEntryStatus::Completed);

        // Past expiry only the completed deposit stays completed
        let late = s.expiry_time + 1;
        let meta = classify(&s, s.deposit("d1"), Some(&mint("accepted")), late);
        assert_eq!(meta.status, TxEntryStatus::Expired);
        let meta = classify(&s, s.deposit("d0"), None, late);
        assert_eq!(meta.status, TxEntryStatus::Completed);
    }

    #[test]
    fn test_dest_initiated_is_pending_in_dest_phase() {
        let s = session(TxType::Mint).with_deposit(deposit("a"));
        let meta = classify(&s, s.deposit("a"), Some(&mint("destInitiated")), NOW);
        assert_eq!(meta.status, TxEntryStatus::Pending);
        assert_eq!(meta.phase, TxPhase::Mint);
    }

    #[test]
    fn test_unknown_state_is_processing() {
        let s = session(TxType::Mint).with_deposit(deposit("a"));
        let meta = classify(&s, s.deposit("a"), Some(&mint("quantumTunneling")), NOW);
        assert_eq!(meta.status, TxEntryStatus::Processing);
    }

    #[test]
    fn test_burn_error_states_require_action() {
        let s = session(TxType::Burn);
        let meta = classify(
            &s,
            None,
            Some(&DepositState::from_tag(TxType::Burn, "errorBurning")),
            NOW,
        );
        assert_eq!(meta.status, TxEntryStatus::ActionRequired);
        assert_eq!(meta.phase, TxPhase::Burn);

        let meta = classify(
            &s,
            None,
            Some(&DepositState::from_tag(TxType::Burn, "errorReleasing")),
            NOW,
        );
        assert_eq!(meta.phase, TxPhase::Release);
    }

    #[test]
    fn test_rank_ordering() {
        assert!(MintState::SrcConfirmed.rank() < MintState::Accepted.rank());
        assert!(BurnState::SubmittingBurn.rank() < BurnState::Accepted.rank());
        assert_eq!(BurnState::ErrorBurning.rank(), None);
        assert_eq!(MintState::from_tag("x"), MintState::Other("x".into()));

        assert!(mint("srcConfirmed").is_before_action());
        assert!(!mint("claiming").is_before_action());
        assert!(!mint("x").is_before_action());
        assert!(DepositState::from_tag(TxType::Burn, "srcConfirmed").is_before_action());
        assert!(!DepositState::from_tag(TxType::Burn, "accepted").is_before_action());
        assert!(!DepositState::from_tag(TxType::Burn, "errorBurning").is_before_action());
    }

    #[test]
    fn test_classify_snapshot() {
        let mut early = deposit("a");
        early.detected_at = Some(1);
        let mut late = deposit("b");
        late.detected_at = Some(2);
        let tx = session(TxType::Mint).with_deposit(early).with_deposit(late);

        let snapshot: MachineSnapshot = serde_json::from_value(serde_json::json!({
            "value": "listening",
            "context": {
                "tx": tx,
                "depositMachines": {
                    "a": {"value": {"srcSettling": "confirming"}},
                    "b": {"value": "accepted"}
                }
            }
        }))
        .unwrap();

        let first = classify_snapshot(&snapshot, None, NOW);
        assert_eq!(first.status, TxEntryStatus::Pending);

        let second = classify_snapshot(&snapshot, Some("b"), NOW);
        assert_eq!(second.status, TxEntryStatus::ActionRequired);

        // Same snapshot, same answer
        assert_eq!(classify_snapshot(&snapshot, Some("b"), NOW), second);
    }

    #[test]
    fn test_burn_snapshot_uses_top_level_value() {
        let snapshot = MachineSnapshot {
            value: serde_json::json!("submittingBurn"),
            context: SnapshotContext {
                tx: session(TxType::Burn),
                deposit_machines: BTreeMap::new(),
            },
        };
        assert_eq!(
            snapshot.deposit_state(""),
            Some(DepositState::Burn(BurnState::SubmittingBurn))
        );
        let meta = classify_snapshot(&snapshot, None, NOW);
        assert_eq!(meta.status, TxEntryStatus::Pending);
        assert_eq!(meta.phase, TxPhase::Burn);
    }

    #[test]
    fn test_confirmation_progress() {
        let s = session(TxType::Mint);
        let mut tx = deposit("a");
        tx.source_tx_confs = 2;

        let progress = confirmation_progress(&s, &tx);
        assert_eq!(progress.target, 6);
        assert_eq!(progress.remaining_secs, 4 * 600);
        assert!(!progress.is_confirmed());

        tx.source_tx_conf_target = Some(1);
        let progress = confirmation_progress(&s, &tx);
        assert!(progress.is_confirmed());
        assert_eq!(progress.remaining_secs, 0);
        assert!(has_known_source_chain(&s));
    }
}
