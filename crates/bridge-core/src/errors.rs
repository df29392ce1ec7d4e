//! Error types for the gateway engine

use thiserror::Error;

/// Top-level errors surfaced by the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),

    #[error("Fee fetch error: {0}")]
    FeeFetch(#[from] FeeFetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A closed-set value (network, tx type) that did not match any variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Session query-string decoding errors.
///
/// Callers treat any of these as "no resumable session".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Query string is not valid percent-encoded UTF-8: {reason}")]
    InvalidEncoding { reason: String },

    #[error("Field '{field}' holds malformed JSON: {reason}")]
    InvalidJson { field: &'static str, reason: String },

    #[error("Field '{field}' is not a number: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Field '{field}' is invalid: {source}")]
    InvalidValue {
        field: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("Required field '{field}' is missing")]
    MissingField { field: &'static str },
}

/// Raw fee-table normalization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("No fee entry for asset {asset}")]
    MissingAsset { asset: String },

    #[error("No fee entry for destination chain {chain}")]
    MissingChain { chain: String },

    #[error("Fee field '{field}' is not a non-negative integer: {value}")]
    InvalidAmount { field: &'static str, value: String },
}

/// Failure of the external fee source.
///
/// Cloneable so one in-flight result can be handed to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeFetchError {
    #[error("Fee source failed: {message}")]
    Source { message: String },

    #[error("Fee source returned unusable data: {0}")]
    Invalid(#[from] FeeError),

    #[error("Fee fetch task aborted: {reason}")]
    Aborted { reason: String },
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl CodecError {
    /// Get a stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEncoding { .. } => "invalid_encoding",
            Self::InvalidJson { .. } => "invalid_json",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidValue { .. } => "invalid_value",
            Self::MissingField { .. } => "missing_field",
        }
    }
}

impl FeeFetchError {
    /// Get a stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Source { .. } => "fee_source_failed",
            Self::Invalid(_) => "fee_data_invalid",
            Self::Aborted { .. } => "fee_fetch_aborted",
        }
    }
}
