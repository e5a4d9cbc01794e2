mod countdown;
mod engine;

pub use countdown::{ManualScheduler, Tick, TickScheduler, TokioCountdown};
pub use engine::{Resume, SessionMachine, SessionState, TickOutcome, DEFAULT_SESSION_SECS};
