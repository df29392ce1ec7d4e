//! Ordering and paging over a session's deposits
//!
//! Users sometimes send more than one payment to the same gateway address.
//! Deposits are shown one at a time in a stable order (oldest first, ties by
//! hash) and the pager wraps around at both ends.

use bridge_core::TxHash;

use crate::session::{GatewaySession, GatewayTransaction};

/// Deterministically ordered deposit hashes plus a "current" pointer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositSet {
    ordered: Vec<TxHash>,
    current: usize,
}

/// Sort deposits by `detected_at` ascending, then by source hash.
///
/// Deposits without a detection time sort first.
pub fn ordered_deposits(session: &GatewaySession) -> Vec<&GatewayTransaction> {
    let mut deposits: Vec<&GatewayTransaction> = session.transactions.values().collect();
    deposits.sort_by(|a, b| {
        a.detected_at
            .cmp(&b.detected_at)
            .then_with(|| a.source_tx_hash.cmp(&b.source_tx_hash))
    });
    deposits
}

impl DepositSet {
    pub fn from_session(session: &GatewaySession) -> Self {
        Self {
            ordered: ordered_deposits(session)
                .into_iter()
                .map(|tx| tx.source_tx_hash.clone())
                .collect(),
            current: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Hash of the current deposit, or `""` when there are none
    pub fn current_hash(&self) -> &str {
        self.ordered
            .get(self.current)
            .map(TxHash::as_str)
            .unwrap_or("")
    }

    pub fn hashes(&self) -> &[TxHash] {
        &self.ordered
    }

    /// Point at `index`, clamped into range
    pub fn select(&mut self, index: usize) {
        self.current = index.min(self.total().saturating_sub(1));
    }

    /// Point at the deposit with `hash`; returns false if it is not in the set
    pub fn select_hash(&mut self, hash: &str) -> bool {
        match self.ordered.iter().position(|h| h.as_str() == hash) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    /// Advance, wrapping from the last deposit to the first
    pub fn next(&mut self) {
        if !self.is_empty() {
            self.current = (self.current + 1) % self.total();
        }
    }

    /// Step back, wrapping from the first deposit to the last
    pub fn prev(&mut self) {
        if !self.is_empty() {
            self.current = (self.current + self.total() - 1) % self.total();
        }
    }

    /// Re-derive the order from a newer snapshot of the session.
    ///
    /// The current deposit stays selected if it is still present; otherwise
    /// the index is clamped.
    pub fn refresh(&mut self, session: &GatewaySession) {
        let current = self.current_hash().to_string();
        let index = self.current;
        *self = Self::from_session(session);
        if !self.select_hash(&current) {
            self.select(index);
        }
    }

    pub fn current_deposit<'a>(&self, session: &'a GatewaySession) -> Option<&'a GatewayTransaction> {
        self.ordered
            .get(self.current)
            .and_then(|hash| session.transactions.get(hash))
    }
}
