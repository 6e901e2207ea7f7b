//! Partial-credit scoring and its exact inverse.

use crate::state::game::{Contestant, ContestantId};

/// Multiplier applied to a correct answer after a hijack taken before the reveal.
pub const HIJACK_BONUS_MULTIPLIER: f64 = 1.5;

/// Whether a delta adds to or removes from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Correct answer.
    Award,
    /// Wrong or timed-out answer.
    Deduct,
}

/// Statistic touched together with the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Correct answers.
    Hits,
    /// Wrong answers.
    Misses,
}

/// Record of a delta applied to a contestant, enough to reverse it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedDelta {
    /// Contestant whose score moved.
    pub contestant: ContestantId,
    /// Signed points added to the score.
    pub points: i64,
    /// Counter that was incremented.
    pub counter: Counter,
}

/// Points awarded for a correct answer, with the default hijack multiplier.
pub fn compute_correct_delta(
    base_value: u32,
    tips_revealed: u32,
    eliminated_wrong_choices: u32,
    total_choices: u32,
    hijack_bonus: bool,
) -> i64 {
    correct_delta_with_multiplier(
        base_value,
        tips_revealed,
        eliminated_wrong_choices,
        total_choices,
        hijack_bonus.then_some(HIJACK_BONUS_MULTIPLIER),
    )
}

/// Points awarded for a correct answer with an explicit hijack multiplier.
///
/// Every revealed tip halves the value, eliminated choices remove their share of it,
/// the hijack bonus multiplies what is left and the result is rounded up.
pub fn correct_delta_with_multiplier(
    base_value: u32,
    tips_revealed: u32,
    eliminated_wrong_choices: u32,
    total_choices: u32,
    hijack_multiplier: Option<f64>,
) -> i64 {
    let mut value = f64::from(base_value) / 2f64.powi(tips_revealed as i32);
    if total_choices > 0 && eliminated_wrong_choices > 0 {
        value -= value * (f64::from(eliminated_wrong_choices) / f64::from(total_choices));
    }
    if let Some(multiplier) = hijack_multiplier {
        value *= multiplier;
    }
    value.max(0.0).ceil() as i64
}

/// Points removed for a wrong answer.
pub fn compute_incorrect_delta(base_value: u32) -> i64 {
    i64::from(base_value)
}

/// Apply a non-negative `delta` to `contestant`, returning what was applied.
pub fn apply_delta(
    id: ContestantId,
    contestant: &mut Contestant,
    delta: i64,
    sign: Sign,
) -> AppliedDelta {
    let (points, counter) = match sign {
        Sign::Award => (delta, Counter::Hits),
        Sign::Deduct => (-delta, Counter::Misses),
    };

    contestant.score += points;
    match counter {
        Counter::Hits => contestant.hits += 1,
        Counter::Misses => contestant.misses += 1,
    }

    AppliedDelta {
        contestant: id,
        points,
        counter,
    }
}

/// Undo a previous [`apply_delta`].
pub fn reverse_delta(contestant: &mut Contestant, applied: &AppliedDelta) {
    contestant.score -= applied.points;
    match applied.counter {
        Counter::Hits => contestant.hits = contestant.hits.saturating_sub(1),
        Counter::Misses => contestant.misses = contestant.misses.saturating_sub(1),
    }
}
