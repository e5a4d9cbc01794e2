//! Application controller.
//!
//! Owns the ledger, spin credits and session machine, and turns user
//! intents into consistent changes across them. Every operation that
//! changes state ends with exactly one [`Controller::on_state_changed`],
//! which overwrites the persisted snapshot.
//!
//! ## Usage
//!
//! ```ignore
//! let (mut app, _) = Controller::open(store, ManualScheduler::new(), SystemClock, config)?;
//! app.start()?;
//! // feed ticks from the scheduler:
//! app.on_tick(tick)?;
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::ledger::{HistoryRecord, Ledger, RecordKind};
use crate::persistence::{AppSnapshot, ExportFile, SnapshotStore};
use crate::rewards::RewardTable;
use crate::session::{Resume, SessionMachine, Tick, TickOutcome, TickScheduler};
use crate::spins::SpinCredits;
use crate::storage::{Config, KvStore};
use crate::summary::Summary;

pub const SUCCESS_DESCRIPTION: &str = "Focus Success";
pub const FAILURE_DESCRIPTION: &str = "Given Up";

pub struct Controller<S, T, C> {
    snapshots: SnapshotStore<S>,
    scheduler: T,
    clock: C,
    config: Config,
    ledger: Ledger,
    credits: SpinCredits,
    machine: SessionMachine,
}

impl<S: KvStore, T: TickScheduler, C: Clock> Controller<S, T, C> {
    /// Load the persisted snapshot and reconcile any session it was running.
    ///
    /// Returns the controller and, when a stored session was found, the
    /// `SessionResumed` or `SessionLapsed` event describing what happened to it.
    pub fn open(store: S, scheduler: T, clock: C, config: Config) -> Result<(Self, Option<Event>)> {
        let snapshots = SnapshotStore::new(store);
        let snapshot = snapshots.load();
        let held = snapshot.held_pledge();

        let mut controller = Self {
            snapshots,
            scheduler,
            clock,
            ledger: Ledger::from_parts(snapshot.fund, snapshot.records, held),
            credits: SpinCredits::new(snapshot.success_count, snapshot.spins_available),
            machine: SessionMachine::new(config.session.duration_secs),
            config,
        };

        let event = match snapshot.session_start_time {
            Some(started_at_ms) => Some(controller.resume(started_at_ms)?),
            None => None,
        };
        Ok((controller, event))
    }

    fn resume(&mut self, started_at_ms: i64) -> Result<Event> {
        match self.machine.resume(started_at_ms, self.clock.now_ms()) {
            Resume::Running {
                remaining_secs,
                generation,
            } => {
                self.scheduler.schedule(generation);
                tracing::info!(remaining_secs, "resumed running session");
                Ok(Event::SessionResumed {
                    remaining_secs,
                    at: self.at(),
                })
            }
            Resume::Lapsed { started_at_ms } => {
                // The pledge stays in the fund and no record is written.
                let pledge = self.ledger.forfeit_hold();
                tracing::info!(started_at_ms, ?pledge, "stored session lapsed while closed");
                self.on_state_changed()?;
                Ok(Event::SessionLapsed {
                    started_at_ms,
                    at: self.at(),
                })
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn credits(&self) -> &SpinCredits {
        &self.credits
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn store(&self) -> &S {
        self.snapshots.store()
    }

    pub fn fund(&self) -> i64 {
        self.ledger.fund()
    }

    pub fn records(&self) -> &[HistoryRecord] {
        self.ledger.records()
    }

    pub fn reward_table(&self) -> &RewardTable {
        &self.config.rewards
    }

    pub fn can_spin(&self) -> bool {
        self.credits.can_spin()
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            fund: self.ledger.fund(),
            target: self.config.fund.target,
            success_count: self.credits.success_count(),
            spins_available: self.credits.spins_available(),
            records: self.ledger.records().to_vec(),
            session_start_time: self.machine.started_at_ms(),
            pledge_amount: self.ledger.held_pledge(),
        }
    }

    pub fn summary(&self) -> Summary {
        Summary::compute(
            self.ledger.fund(),
            self.config.fund.target,
            self.credits.success_count(),
            self.credits.spins_available(),
            self.ledger.records(),
        )
    }

    pub fn status(&self) -> Event {
        Event::StateSnapshot {
            state: self.machine.state(),
            remaining_secs: self.machine.remaining_secs(),
            fund: self.ledger.fund(),
            target: self.config.fund.target,
            success_count: self.credits.success_count(),
            spins_available: self.credits.spins_available(),
            record_count: self.ledger.len(),
            at: self.at(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session and hold the pledge. No-op while one is running.
    pub fn start(&mut self) -> Result<Option<Event>> {
        let Some(generation) = self.machine.start(self.clock.now_ms()) else {
            return Ok(None);
        };
        let pledge = self.config.session.pledge_amount;
        self.ledger.hold_pledge(pledge);
        self.scheduler.schedule(generation);
        self.on_state_changed()?;
        tracing::info!(pledge, fund = self.ledger.fund(), "session started");
        Ok(Some(Event::SessionStarted {
            duration_secs: self.machine.duration_secs(),
            pledge,
            fund: self.ledger.fund(),
            at: self.at(),
        }))
    }

    /// Give up the running session: the pledge is returned and the penalty
    /// recorded. No-op when idle.
    pub fn abandon(&mut self) -> Result<Option<Event>> {
        if !self.machine.abandon() {
            return Ok(None);
        }
        self.scheduler.cancel();
        self.ledger.release_pledge();
        let record = self.ledger.append(
            RecordKind::Failure,
            -self.config.session.penalty_amount,
            FAILURE_DESCRIPTION,
            self.clock.now_ms(),
        );
        self.on_state_changed()?;
        tracing::info!(fund = self.ledger.fund(), "session abandoned");
        Ok(Some(Event::SessionAbandoned {
            record,
            fund: self.ledger.fund(),
            at: self.at(),
        }))
    }

    /// Apply one countdown tick. Completes the session when time runs out.
    pub fn on_tick(&mut self, tick: Tick) -> Result<Option<Event>> {
        match self.machine.tick(tick) {
            TickOutcome::Ignored => Ok(None),
            TickOutcome::Counting { remaining_secs } => {
                Ok(Some(Event::SessionTicked { remaining_secs }))
            }
            TickOutcome::Expired => self.expire(),
        }
    }

    /// Complete the running session. The held pledge becomes a Success
    /// record, so the fund does not move. No-op when idle.
    pub fn expire(&mut self) -> Result<Option<Event>> {
        if !self.machine.finish() {
            return Ok(None);
        }
        self.scheduler.cancel();
        let pledge = self.ledger.release_pledge().unwrap_or(self.config.session.pledge_amount);
        let record = self.ledger.append(
            RecordKind::Success,
            pledge,
            SUCCESS_DESCRIPTION,
            self.clock.now_ms(),
        );
        let spin_earned = self.credits.record_success(self.config.spins.threshold);
        self.on_state_changed()?;
        tracing::info!(
            success_count = self.credits.success_count(),
            spin_earned,
            "session completed"
        );
        Ok(Some(Event::SessionCompleted {
            record,
            fund: self.ledger.fund(),
            success_count: self.credits.success_count(),
            spin_earned,
            at: self.at(),
        }))
    }

    /// Spend a spin credit on a reward draw. No-op without credits.
    pub fn spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<Event>> {
        if !self.credits.consume() {
            return Ok(None);
        }
        let tier = self.config.rewards.draw(rng).clone();
        let record = self.ledger.append(
            RecordKind::Lottery,
            tier.amount,
            format!("Lucky Draw: {}", tier.label),
            self.clock.now_ms(),
        );
        self.on_state_changed()?;
        tracing::info!(label = %tier.label, amount = tier.amount, "spin drawn");
        Ok(Some(Event::SpinDrawn {
            label: tier.label,
            record,
            fund: self.ledger.fund(),
            spins_available: self.credits.spins_available(),
            at: self.at(),
        }))
    }

    /// Delete a record and reverse its amount. Counters are left alone.
    pub fn delete(&mut self, id: &str) -> Result<Option<Event>> {
        let Some(record) = self.ledger.delete(id) else {
            return Ok(None);
        };
        self.on_state_changed()?;
        tracing::info!(id, amount = record.amount, "record deleted");
        Ok(Some(Event::RecordDeleted {
            record,
            fund: self.ledger.fund(),
            at: self.at(),
        }))
    }

    /// Adopt whatever another writer saved since this controller last did.
    ///
    /// A session abandoned, completed or started elsewhere replaces the
    /// local one and disarms its countdown. Returns `None` when the store
    /// holds nothing or exactly what this controller last wrote.
    pub fn reload(&mut self) -> Result<Option<Event>> {
        let Some(mut stored) = self.snapshots.fetch()? else {
            return Ok(None);
        };
        stored.target = self.config.fund.target;
        stored.pledge_amount = stored.held_pledge();
        if stored == self.snapshot() {
            return Ok(None);
        }

        let held = stored.held_pledge();
        self.ledger = Ledger::from_parts(stored.fund, stored.records, held);
        self.credits = SpinCredits::new(stored.success_count, stored.spins_available);
        if stored.session_start_time != self.machine.started_at_ms() {
            self.scheduler.cancel();
            self.machine.abandon();
            if let Some(started_at_ms) = stored.session_start_time {
                self.resume(started_at_ms)?;
            }
        }
        tracing::info!(
            state = ?self.machine.state(),
            fund = self.ledger.fund(),
            "reloaded snapshot written elsewhere"
        );
        Ok(Some(Event::StoreReloaded {
            state: self.machine.state(),
            remaining_secs: self.machine.remaining_secs(),
            fund: self.ledger.fund(),
            at: self.at(),
        }))
    }

    /// Backup of the stored bytes as they are right now.
    pub fn export(&self) -> Result<Option<ExportFile>> {
        self.snapshots.export_snapshot(self.at().date_naive())
    }

    /// Persist the full snapshot.
    pub fn on_state_changed(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        self.snapshots.save(&snapshot)
    }

    /// Stop the countdown and hand back the store.
    pub fn into_store(mut self) -> S {
        self.scheduler.cancel();
        self.snapshots.into_inner()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_default()
    }
}
