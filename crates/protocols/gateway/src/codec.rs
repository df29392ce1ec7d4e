//! Session <-> query-string codec
//!
//! Lets a session survive page reloads and be shared as a link. Every field is
//! written as `key=value`, keys sorted, values percent-encoded with only the
//! RFC 3986 unreserved characters left verbatim. `transactions` and
//! `customParams` are JSON-encoded into a single value each and omitted when
//! empty.
//!
//! ```text
//! destAddress=&destNetwork=ethereum&expiryTime=1604670899484&id=tx-1234abc&network=testnet&sourceAsset=btc&sourceNetwork=bitcoin&targetAmount=1&type=mint&userAddress=
//! ```

use std::collections::BTreeMap;

use bridge_core::{Address, BaseUnits, CodecError, EpochMillis, Network, TxHash, TxType};

use crate::session::{GatewaySession, GatewayTransaction};

const ID: &str = "id";
const TYPE: &str = "type";
const NETWORK: &str = "network";
const SOURCE_ASSET: &str = "sourceAsset";
const SOURCE_NETWORK: &str = "sourceNetwork";
const DEST_NETWORK: &str = "destNetwork";
const DEST_ADDRESS: &str = "destAddress";
const USER_ADDRESS: &str = "userAddress";
const TARGET_AMOUNT: &str = "targetAmount";
const SUGGESTED_AMOUNT: &str = "suggestedAmount";
const EXPIRY_TIME: &str = "expiryTime";
const TRANSACTIONS: &str = "transactions";
const CUSTOM_PARAMS: &str = "customParams";

/// A session as recovered from a query string; any field may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSession {
    pub id: Option<String>,
    pub tx_type: Option<TxType>,
    pub network: Option<Network>,
    pub source_asset: Option<String>,
    pub source_network: Option<String>,
    pub dest_network: Option<String>,
    pub dest_address: Option<Address>,
    pub user_address: Option<Address>,
    pub target_amount: Option<f64>,
    pub suggested_amount: Option<BaseUnits>,
    pub expiry_time: Option<EpochMillis>,
    pub transactions: BTreeMap<TxHash, GatewayTransaction>,
    pub custom_params: serde_json::Map<String, serde_json::Value>,
}

impl PartialSession {
    /// Complete the session, requiring every field a session cannot do without.
    ///
    /// Missing addresses default to empty: they are filled in later in the flow.
    pub fn into_session(self) -> Result<GatewaySession, CodecError> {
        fn required<T>(value: Option<T>, field: &'static str) -> Result<T, CodecError> {
            value.ok_or(CodecError::MissingField { field })
        }

        Ok(GatewaySession {
            id: required(self.id, ID)?,
            tx_type: required(self.tx_type, TYPE)?,
            network: required(self.network, NETWORK)?,
            source_asset: required(self.source_asset, SOURCE_ASSET)?,
            source_network: required(self.source_network, SOURCE_NETWORK)?,
            dest_network: required(self.dest_network, DEST_NETWORK)?,
            dest_address: self.dest_address.unwrap_or_default(),
            user_address: self.user_address.unwrap_or_default(),
            target_amount: required(self.target_amount, TARGET_AMOUNT)?,
            suggested_amount: self.suggested_amount,
            expiry_time: required(self.expiry_time, EXPIRY_TIME)?,
            transactions: self.transactions,
            custom_params: self.custom_params,
        })
    }
}

/// Encode a session into a query string
pub fn encode(session: &GatewaySession) -> Result<String, CodecError> {
    let mut fields: BTreeMap<&'static str, String> = BTreeMap::new();

    fields.insert(ID, session.id.clone());
    fields.insert(TYPE, session.tx_type.as_str().to_string());
    fields.insert(NETWORK, session.network.as_str().to_string());
    fields.insert(SOURCE_ASSET, session.source_asset.clone());
    fields.insert(SOURCE_NETWORK, session.source_network.clone());
    fields.insert(DEST_NETWORK, session.dest_network.clone());
    fields.insert(DEST_ADDRESS, session.dest_address.to_string());
    fields.insert(USER_ADDRESS, session.user_address.to_string());
    fields.insert(TARGET_AMOUNT, session.target_amount.to_string());
    fields.insert(EXPIRY_TIME, session.expiry_time.to_string());

    if let Some(amount) = session.suggested_amount {
        fields.insert(SUGGESTED_AMOUNT, amount.to_string());
    }

    if !session.transactions.is_empty() {
        let json = serde_json::to_string(&session.transactions).map_err(|e| {
            CodecError::InvalidJson {
                field: TRANSACTIONS,
                reason: e.to_string(),
            }
        })?;
        fields.insert(TRANSACTIONS, json);
    }

    if !session.custom_params.is_empty() {
        let json = serde_json::Value::Object(session.custom_params.clone()).to_string();
        fields.insert(CUSTOM_PARAMS, json);
    }

    Ok(fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&"))
}

fn decode_component(raw: &str) -> Result<String, CodecError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| CodecError::InvalidEncoding {
            reason: e.to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    value: String,
) -> Result<Option<T>, CodecError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| CodecError::InvalidNumber { field, value })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    field: &'static str,
    value: &str,
) -> Result<T, CodecError> {
    serde_json::from_str(value).map_err(|e| CodecError::InvalidJson {
        field,
        reason: e.to_string(),
    })
}

/// Decode a query string (with or without a leading `?`) into a partial session.
///
/// Unknown keys are ignored; on duplicate keys the last one wins.
pub fn decode(query: &str) -> Result<PartialSession, CodecError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut partial = PartialSession::default();

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key)?;
        let value = decode_component(raw_value)?;

        match key.as_str() {
            ID => partial.id = Some(value),
            TYPE => {
                let tx_type = value
                    .parse()
                    .map_err(|source| CodecError::InvalidValue { field: TYPE, source })?;
                partial.tx_type = Some(tx_type);
            }
            NETWORK => {
                let network = value
                    .parse()
                    .map_err(|source| CodecError::InvalidValue {
                        field: NETWORK,
                        source,
                    })?;
                partial.network = Some(network);
            }
            SOURCE_ASSET => partial.source_asset = Some(value),
            SOURCE_NETWORK => partial.source_network = Some(value),
            DEST_NETWORK => partial.dest_network = Some(value),
            DEST_ADDRESS => partial.dest_address = Some(Address::new(value)),
            USER_ADDRESS => partial.user_address = Some(Address::new(value)),
            TARGET_AMOUNT => {
                let amount: Option<f64> = parse_number(TARGET_AMOUNT, value.clone())?;
                if amount.is_some_and(|a| !a.is_finite()) {
                    return Err(CodecError::InvalidNumber {
                        field: TARGET_AMOUNT,
                        value,
                    });
                }
                partial.target_amount = amount;
            }
            SUGGESTED_AMOUNT => partial.suggested_amount = parse_number(SUGGESTED_AMOUNT, value)?,
            EXPIRY_TIME => partial.expiry_time = parse_number(EXPIRY_TIME, value)?,
            TRANSACTIONS => partial.transactions = parse_json(TRANSACTIONS, &value)?,
            CUSTOM_PARAMS => partial.custom_params = parse_json(CUSTOM_PARAMS, &value)?,
            other => tracing::trace!(key = other, "Ignoring unknown session query key"),
        }
    }

    Ok(partial)
}

/// Recover a complete session from a link, or `None` if it cannot be resumed.
///
/// Decode failures are logged and swallowed: a broken link starts a new flow.
pub fn resume_session(query: &str) -> Option<GatewaySession> {
    match decode(query).and_then(PartialSession::into_session) {
        Ok(session) => {
            tracing::debug!(id = %session.id, "Resumed gateway session from query string");
            Some(session)
        }
        Err(e) => {
            tracing::warn!(code = e.error_code(), "No resumable session in query string: {}", e);
            None
        }
    }
}
