//! Focus session state machine.
//!
//! The machine only tracks timing. Money and history are settled by the
//! controller from the transitions it reports.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Idle      (abandon or countdown reaching zero)
//! ```
//!
//! Every transition bumps a generation counter. A countdown is armed with
//! the generation current at `start`/`resume`, and ticks carrying any other
//! generation are ignored, so a tick queued before an abandon can never
//! complete the session afterwards.

use serde::{Deserialize, Serialize};

use super::countdown::Tick;

pub const DEFAULT_SESSION_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
}

/// What a countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale generation, or no session running.
    Ignored,
    Counting { remaining_secs: u64 },
    /// Remaining time hit zero; the caller must settle the session.
    Expired,
}

/// Result of reconciling a persisted start time with the current clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Running { remaining_secs: u64, generation: u64 },
    Lapsed { started_at_ms: i64 },
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    duration_secs: u64,
    state: SessionState,
    /// Epoch milliseconds of the running session's start.
    started_at_ms: Option<i64>,
    remaining_secs: u64,
    generation: u64,
}

impl SessionMachine {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            state: SessionState::Idle,
            started_at_ms: None,
            remaining_secs: duration_secs,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session. Returns the generation to arm the countdown with,
    /// or `None` if a session is already running.
    pub fn start(&mut self, now_ms: i64) -> Option<u64> {
        if self.is_running() {
            return None;
        }
        self.state = SessionState::Running;
        self.started_at_ms = Some(now_ms);
        self.remaining_secs = self.duration_secs;
        self.generation += 1;
        Some(self.generation)
    }

    /// Leave `Running` early. Returns `false` when idle.
    pub fn abandon(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop();
        true
    }

    /// Leave `Running` because the countdown finished. Returns `false` when idle.
    pub fn finish(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.stop();
        true
    }

    pub fn tick(&mut self, tick: Tick) -> TickOutcome {
        if !self.is_running() || tick.generation != self.generation {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Counting {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    /// Re-enter `Running` for a persisted start time if the session has not
    /// yet run its full duration at `now_ms`; otherwise stay idle.
    pub fn resume(&mut self, stored_start_ms: i64, now_ms: i64) -> Resume {
        let elapsed_ms = now_ms.saturating_sub(stored_start_ms).max(0) as u64;
        let duration_ms = self.duration_secs.saturating_mul(1000);
        if elapsed_ms >= duration_ms {
            self.stop();
            return Resume::Lapsed {
                started_at_ms: stored_start_ms,
            };
        }
        self.state = SessionState::Running;
        self.started_at_ms = Some(stored_start_ms);
        self.remaining_secs = self.duration_secs - elapsed_ms / 1000;
        self.generation += 1;
        Resume::Running {
            remaining_secs: self.remaining_secs,
            generation: self.generation,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn stop(&mut self) {
        self.state = SessionState::Idle;
        self.started_at_ms = None;
        self.remaining_secs = self.duration_secs;
        self.generation += 1;
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn start_only_from_idle() {
        let mut machine = SessionMachine::default();
        assert_eq!(machine.state(), SessionState::Idle);

        let generation = machine.start(T0).unwrap();
        assert_eq!(machine.state(), SessionState::Running);
        assert_eq!(machine.remaining_secs(), 300);
        assert_eq!(machine.started_at_ms(), Some(T0));
        assert!(machine.start(T0 + 5).is_none());
        assert_eq!(machine.generation(), generation);
    }

    #[test]
    fn abandon_resets_to_idle() {
        let mut machine = SessionMachine::default();
        assert!(!machine.abandon());

        let generation = machine.start(T0).unwrap();
        machine.tick(Tick { generation });
        assert!(machine.abandon());
        assert_eq!(machine.state(), SessionState::Idle);
        assert_eq!(machine.started_at_ms(), None);
        assert_eq!(machine.remaining_secs(), 300);
    }

    #[test]
    fn ticks_count_down_to_expiry() {
        let mut machine = SessionMachine::new(3);
        let generation = machine.start(T0).unwrap();
        let tick = Tick { generation };

        assert_eq!(machine.tick(tick), TickOutcome::Counting { remaining_secs: 2 });
        assert_eq!(machine.tick(tick), TickOutcome::Counting { remaining_secs: 1 });
        assert_eq!(machine.tick(tick), TickOutcome::Expired);
        assert!(machine.finish());
        assert_eq!(machine.tick(tick), TickOutcome::Ignored);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut machine = SessionMachine::new(3);
        let first = machine.start(T0).unwrap();
        machine.abandon();
        let second = machine.start(T0 + 10).unwrap();

        assert_ne!(first, second);
        assert_eq!(machine.tick(Tick { generation: first }), TickOutcome::Ignored);
        assert_eq!(machine.remaining_secs(), 3);
    }

    #[test]
    fn resume_within_duration_keeps_running() {
        let mut machine = SessionMachine::default();
        let resume = machine.resume(T0, T0 + 200_000);
        assert!(matches!(resume, Resume::Running { remaining_secs: 100, .. }));
        assert!(machine.is_running());
        assert_eq!(machine.started_at_ms(), Some(T0));
    }

    #[test]
    fn resume_after_duration_lapses() {
        let mut machine = SessionMachine::default();
        let resume = machine.resume(T0, T0 + 400_000);
        assert_eq!(resume, Resume::Lapsed { started_at_ms: T0 });
        assert!(!machine.is_running());
        assert_eq!(machine.started_at_ms(), None);
    }

    #[test]
    fn resume_at_exact_duration_lapses() {
        let mut machine = SessionMachine::default();
        assert!(matches!(
            machine.resume(T0, T0 + 300_000),
            Resume::Lapsed { .. }
        ));
    }

    #[test]
    fn resume_with_partial_second_rounds_elapsed_down() {
        let mut machine = SessionMachine::default();
        let resume = machine.resume(T0, T0 + 299_500);
        assert!(matches!(resume, Resume::Running { remaining_secs: 1, .. }));
    }

    #[test]
    fn resume_with_huge_duration_does_not_overflow() {
        let mut machine = SessionMachine::new(u64::MAX);
        let resume = machine.resume(T0, T0 + 5_000);
        assert!(matches!(
            resume,
            Resume::Running { remaining_secs, .. } if remaining_secs == u64::MAX - 5
        ));

        let mut machine = SessionMachine::new(60);
        assert!(matches!(machine.resume(i64::MIN, i64::MAX), Resume::Lapsed { .. }));
    }
}
