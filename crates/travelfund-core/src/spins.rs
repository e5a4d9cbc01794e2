//! Spin credit accrual.
//!
//! One credit is earned each time the success count lands on a multiple of
//! the threshold. Deleting history never takes credits back.

pub const DEFAULT_SPIN_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpinCredits {
    success_count: u32,
    spins_available: u32,
}

impl SpinCredits {
    pub fn new(success_count: u32, spins_available: u32) -> Self {
        Self {
            success_count,
            spins_available,
        }
    }

    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    pub fn spins_available(&self) -> u32 {
        self.spins_available
    }

    pub fn can_spin(&self) -> bool {
        self.spins_available > 0
    }

    /// Count one completed session. Returns `true` if it earned a credit.
    pub fn record_success(&mut self, threshold: u32) -> bool {
        self.success_count += 1;
        if threshold > 0 && self.success_count % threshold == 0 {
            self.spins_available += 1;
            true
        } else {
            false
        }
    }

    /// Spend one credit. Returns `false` (and changes nothing) when none remain.
    pub fn consume(&mut self) -> bool {
        if !self.can_spin() {
            return false;
        }
        self.spins_available -= 1;
        true
    }
}
