//! Weighted reward draw.
//!
//! A [`RewardTable`] is an ordered, non-empty list of tiers whose
//! probabilities sum to 1.0. Drawing walks the tiers in declared order and
//! picks the first one whose cumulative probability reaches the roll; the
//! final tier absorbs any roll left over by floating-point rounding.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const PROBABILITY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTier {
    pub label: String,
    pub amount: i64,
    pub probability: f64,
}

impl RewardTier {
    pub fn new(label: impl Into<String>, amount: i64, probability: f64) -> Self {
        Self {
            label: label.into(),
            amount,
            probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RewardTier>", into = "Vec<RewardTier>")]
pub struct RewardTable {
    tiers: Vec<RewardTier>,
}

impl RewardTable {
    /// Build a table, rejecting empty lists, out-of-range probabilities and
    /// totals that do not sum to 1.0.
    pub fn new(tiers: Vec<RewardTier>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(invalid("reward table must contain at least one tier"));
        }
        for tier in &tiers {
            if !(0.0..=1.0).contains(&tier.probability) {
                return Err(invalid(format!(
                    "tier '{}' has probability {} outside [0, 1]",
                    tier.label, tier.probability
                )));
            }
        }
        let total: f64 = tiers.iter().map(|t| t.probability).sum();
        if (total - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(invalid(format!("probabilities sum to {total}, expected 1.0")));
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[RewardTier] {
        &self.tiers
    }

    /// Select the tier for a roll in `[0, 1)`.
    pub fn select(&self, roll: f64) -> &RewardTier {
        let mut cumulative = 0.0;
        for tier in &self.tiers {
            cumulative += tier.probability;
            if cumulative >= roll {
                return tier;
            }
        }
        // Non-empty by construction.
        &self.tiers[self.tiers.len() - 1]
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &RewardTier {
        let roll: f64 = rng.gen();
        self.select(roll)
    }
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                RewardTier::new("Small Treat", 10, 0.4),
                RewardTier::new("Nice Bonus", 20, 0.3),
                RewardTier::new("Big Win", 40, 0.2),
                RewardTier::new("Jackpot", 60, 0.1),
            ],
        }
    }
}

impl TryFrom<Vec<RewardTier>> for RewardTable {
    type Error = ConfigError;

    fn try_from(tiers: Vec<RewardTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<RewardTable> for Vec<RewardTier> {
    fn from(table: RewardTable) -> Self {
        table.tiers
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: "rewards".into(),
        message: message.into(),
    }
}
