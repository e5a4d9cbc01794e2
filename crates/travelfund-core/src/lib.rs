//! # Travelfund Core Library
//!
//! Business logic for a habit-gamification widget: commit a small pledge to
//! a five-minute focus session, keep it by finishing, lose it (and a penalty)
//! by giving up, and earn chance-based reward spins along the way. The CLI
//! is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Ledger**: fund balance and the history records that explain it
//! - **Session**: idle/running state machine with a cancellable countdown
//!   and reload-safe resumption
//! - **Rewards**: stateless weighted draw over a reward table
//! - **Spins**: credit accrual from completed sessions
//! - **Persistence**: the whole state as one JSON document in a key-value store
//! - **Controller**: orchestrates the above per user intent
//!
//! ## Key Components
//!
//! - [`Controller`]: entry point for every user intent
//! - [`SessionMachine`]: focus session state machine
//! - [`Ledger`]: fund and history bookkeeping
//! - [`SnapshotStore`]: save/load/export of [`AppSnapshot`]
//! - [`Config`]: game rules loaded from TOML

pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod ledger;
pub mod persistence;
pub mod rewards;
pub mod session;
pub mod spins;
pub mod storage;
pub mod summary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::Controller;
pub use error::{ConfigError, CoreError, StoreError};
pub use events::Event;
pub use ledger::{HistoryRecord, Ledger, RecordKind};
pub use persistence::{AppSnapshot, ExportFile, SnapshotStore, STORE_KEY};
pub use rewards::{RewardTable, RewardTier};
pub use session::{ManualScheduler, SessionMachine, SessionState, Tick, TickScheduler, TokioCountdown};
pub use spins::SpinCredits;
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use summary::{format_amount, Summary};
