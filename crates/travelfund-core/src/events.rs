use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::HistoryRecord;
use crate::session::SessionState;

/// Every controller operation that changes something produces an Event.
/// Front ends render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        duration_secs: u64,
        pledge: i64,
        fund: i64,
        at: DateTime<Utc>,
    },
    /// One countdown second elapsed.
    SessionTicked {
        remaining_secs: u64,
    },
    SessionAbandoned {
        record: HistoryRecord,
        fund: i64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        record: HistoryRecord,
        fund: i64,
        success_count: u32,
        /// True when this completion earned a spin credit.
        spin_earned: bool,
        at: DateTime<Utc>,
    },
    /// A persisted session was still within its duration at load time.
    SessionResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A persisted session ran out while nothing was watching it.
    /// No record is written for it.
    SessionLapsed {
        started_at_ms: i64,
        at: DateTime<Utc>,
    },
    /// Another process changed the stored state; the session shown is
    /// whatever the store now says.
    StoreReloaded {
        state: SessionState,
        remaining_secs: u64,
        fund: i64,
        at: DateTime<Utc>,
    },
    RecordDeleted {
        record: HistoryRecord,
        fund: i64,
        at: DateTime<Utc>,
    },
    SpinDrawn {
        label: String,
        record: HistoryRecord,
        fund: i64,
        spins_available: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        remaining_secs: u64,
        fund: i64,
        target: i64,
        success_count: u32,
        spins_available: u32,
        record_count: usize,
        at: DateTime<Utc>,
    },
}
