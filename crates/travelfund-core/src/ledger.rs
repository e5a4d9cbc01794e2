//! Fund balance and history records.
//!
//! The ledger owns the running fund total and the immutable history list.
//! `fund` always equals the sum of every present record's `amount` plus the
//! pledge of a session that is still running (held with [`Ledger::hold_pledge`]
//! and later released by the session outcome). The held amount is remembered,
//! so the outcome settles exactly what was pledged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Success,
    Failure,
    Lottery,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Success => "success",
            RecordKind::Failure => "failure",
            RecordKind::Lottery => "lottery",
        }
    }
}

/// One entry in the visible history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub kind: RecordKind,
    /// Signed currency delta this record contributed to the fund.
    pub amount: i64,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    fund: i64,
    /// Newest first.
    records: Vec<HistoryRecord>,
    /// Pledge credited to `fund` with no record yet.
    held_pledge: Option<i64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted parts. The fund is taken as stored,
    /// not recomputed, since it may include `held_pledge`.
    pub fn from_parts(fund: i64, records: Vec<HistoryRecord>, held_pledge: Option<i64>) -> Self {
        Self {
            fund,
            records,
            held_pledge,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn fund(&self) -> i64 {
        self.fund
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn held_pledge(&self) -> Option<i64> {
        self.held_pledge
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of `amount` over all present records.
    pub fn recorded_total(&self) -> i64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    /// Fund contribution not backed by any record.
    pub fn outstanding(&self) -> i64 {
        self.fund - self.recorded_total()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a record stamped `now_ms`, prepend it, and add its amount to the fund.
    pub fn append(
        &mut self,
        kind: RecordKind,
        amount: i64,
        description: impl Into<String>,
        now_ms: i64,
    ) -> HistoryRecord {
        let record = HistoryRecord {
            id: Uuid::new_v4().to_string(),
            kind,
            amount,
            timestamp: now_ms,
            description: description.into(),
        };
        self.fund += amount;
        self.records.insert(0, record.clone());
        record
    }

    /// Remove a record and reverse its contribution. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> Option<HistoryRecord> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        let record = self.records.remove(pos);
        self.fund -= record.amount;
        Some(record)
    }

    /// Credit a pledge without a record.
    pub fn hold_pledge(&mut self, amount: i64) {
        self.fund += amount;
        self.held_pledge = Some(amount);
    }

    /// Take the held pledge back out of the fund and return it.
    pub fn release_pledge(&mut self) -> Option<i64> {
        let amount = self.held_pledge.take()?;
        self.fund -= amount;
        Some(amount)
    }

    /// Stop tracking the held pledge but leave it in the fund.
    pub fn forfeit_hold(&mut self) -> Option<i64> {
        self.held_pledge.take()
    }
}
