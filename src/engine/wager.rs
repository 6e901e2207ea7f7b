//! Wager bounds for daily doubles and the finale.

use crate::engine::EngineError;

/// Limits used to compute wager bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WagerRules {
    /// Smallest daily double wager.
    pub daily_double_min: i64,
    /// Daily double ceiling per round number when the score is lower.
    pub daily_double_round_cap: i64,
    /// Finale ceiling when the score is lower.
    pub finale_min_cap: i64,
}

impl Default for WagerRules {
    fn default() -> Self {
        Self {
            daily_double_min: 100,
            daily_double_round_cap: 500,
            finale_min_cap: 1000,
        }
    }
}

/// Inclusive range of accepted wagers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WagerBounds {
    /// Smallest accepted wager.
    pub min: i64,
    /// Largest accepted wager.
    pub max: i64,
}

impl WagerBounds {
    /// Validate `amount`, returning it as a question value.
    pub fn check(&self, amount: i64) -> Result<u32, EngineError> {
        if amount < self.min || amount > self.max {
            return Err(EngineError::InvalidWager {
                min: self.min,
                max: self.max,
            });
        }
        u32::try_from(amount).map_err(|_| EngineError::InvalidWager {
            min: self.min,
            max: self.max,
        })
    }
}

/// Bounds for a daily double played in round `round_number`.
pub fn daily_double_bounds(score: i64, round_number: u32, rules: &WagerRules) -> WagerBounds {
    WagerBounds {
        min: rules.daily_double_min,
        max: score.max(rules.daily_double_round_cap * i64::from(round_number)),
    }
}

/// Bounds for the finale.
pub fn finale_bounds(score: i64, rules: &WagerRules) -> WagerBounds {
    WagerBounds {
        min: 0,
        max: score.max(rules.finale_min_cap),
    }
}
