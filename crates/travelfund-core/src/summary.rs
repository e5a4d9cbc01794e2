//! Read-only figures derived from the ledger for display.

use serde::{Deserialize, Serialize};

use crate::ledger::{HistoryRecord, RecordKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTotals {
    pub count: usize,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub fund: i64,
    pub target: i64,
    /// `target - fund`, never below zero.
    pub remaining_to_target: i64,
    /// 0.0 .. 100.0
    pub progress_pct: f64,
    /// Negative funds are shown with a warning, never blocked.
    pub is_negative: bool,
    pub success_count: u32,
    pub spins_available: u32,
    pub successes: KindTotals,
    pub failures: KindTotals,
    pub lottery: KindTotals,
}

impl Summary {
    pub fn compute(
        fund: i64,
        target: i64,
        success_count: u32,
        spins_available: u32,
        records: &[HistoryRecord],
    ) -> Self {
        let totals = |kind: RecordKind| {
            records
                .iter()
                .filter(|r| r.kind == kind)
                .fold(KindTotals::default(), |acc, r| KindTotals {
                    count: acc.count + 1,
                    amount: acc.amount + r.amount,
                })
        };
        let progress_pct = if target > 0 {
            (fund.max(0) as f64 / target as f64 * 100.0).min(100.0)
        } else {
            100.0
        };
        Self {
            fund,
            target,
            remaining_to_target: (target - fund).max(0),
            progress_pct,
            is_negative: fund < 0,
            success_count,
            spins_available,
            successes: totals(RecordKind::Success),
            failures: totals(RecordKind::Failure),
            lottery: totals(RecordKind::Lottery),
        }
    }
}

/// Render an integer amount with two decimals, e.g. `-1250` as `-1250.00`.
pub fn format_amount(amount: i64) -> String {
    format!("{amount}.00")
}
