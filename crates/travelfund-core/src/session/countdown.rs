//! Cancellable one-second countdown.
//!
//! A scheduler delivers [`Tick`]s tagged with the generation it was armed
//! for. Cancelling stops delivery; the generation check in the session
//! machine rejects anything that was already in flight.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Arms and disarms the countdown for a session generation.
pub trait TickScheduler {
    /// Start delivering ticks for `generation`, replacing any armed countdown.
    fn schedule(&mut self, generation: u64);
    fn cancel(&mut self);
}

/// Scheduler without a background task. The caller produces ticks itself,
/// which is what one-shot commands and tests want.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    armed: Option<u64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> Option<u64> {
        self.armed
    }

    /// The tick the armed countdown would deliver next.
    pub fn next_tick(&self) -> Option<Tick> {
        self.armed.map(|generation| Tick { generation })
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&mut self, generation: u64) {
        self.armed = Some(generation);
    }

    fn cancel(&mut self) {
        self.armed = None;
    }
}

/// Tokio interval task that sends a tick every `period`.
///
/// Must be armed from inside a tokio runtime.
pub struct TokioCountdown {
    period: Duration,
    tx: UnboundedSender<Tick>,
    handle: Option<JoinHandle<()>>,
}

impl TokioCountdown {
    pub fn new() -> (Self, UnboundedReceiver<Tick>) {
        Self::with_period(Duration::from_secs(1))
    }

    pub fn with_period(period: Duration) -> (Self, UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                period,
                tx,
                handle: None,
            },
            rx,
        )
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl TickScheduler for TokioCountdown {
    fn schedule(&mut self, generation: u64) {
        self.cancel();
        let tx = self.tx.clone();
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tx.send(Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TokioCountdown {
    fn drop(&mut self) {
        self.cancel();
    }
}
