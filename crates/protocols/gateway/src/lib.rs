//! Gateway Transaction Lifecycle Engine
//!
//! Bookkeeping for cross-chain gateway transactions: a user locks a native
//! asset (BTC, ZEC, ...) and receives a wrapped representation on a host chain
//! (mint), or burns the wrapped asset to get the native one back (release).
//!
//! The engine itself is mostly pure. Sessions are built and resumed through the
//! query-string [`codec`], fees come from [`fee`], and each state-machine
//! snapshot is turned into display state by [`status`] and [`state`]. The only
//! async part is [`fee_cache`], which fronts the external fee lookup.

pub mod codec;
pub mod deposits;
pub mod fee;
pub mod fee_cache;
pub mod registry;
pub mod session;
pub mod state;
pub mod status;

pub use codec::{decode, encode, resume_session, PartialSession};
pub use deposits::{ordered_deposits, DepositSet};
pub use fee::{compute_fee, minimum_amount, normalize_fee_table, CalculatedFee, RawFeeTable, SimpleFee};
pub use fee_cache::{DebouncedFees, FeeCache, FeeKey, FeeLookup, FeeSource};
pub use registry::{Chain, ChainConfig, Currency, CurrencyConfig};
pub use session::{new_burn_session, new_mint_session, GatewaySession, GatewayTransaction, SessionRequest};
pub use state::{BridgeOptions, GatewayView};
pub use status::{classify, classify_snapshot, MachineSnapshot, TxEntryStatus, TxMeta, TxPhase};
