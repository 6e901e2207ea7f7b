use thiserror::Error;

use crate::{
    engine::lifecycle::InvalidTransition,
    state::game::{ContestantId, PowerUpKind, QuestionId},
};

/// Errors raised by the round engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The action is not allowed in the current question phase.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// The power-up is not enabled for this contestant right now.
    #[error("power-up {power_up:?} is not available to contestant {contestant}")]
    PowerUpUnavailable {
        /// Contestant who tried to use it.
        contestant: ContestantId,
        /// Power-up requested.
        power_up: PowerUpKind,
    },
    /// The event refers to something that already happened.
    #[error("stale event: {0}")]
    StaleEvent(String),
    /// Arbitration produced a state the engine cannot reconcile.
    #[error("arbitration conflict: {0}")]
    ArbitrationConflict(String),
    /// Wager outside the allowed bounds.
    #[error("wager must be between {min} and {max}")]
    InvalidWager {
        /// Smallest accepted wager.
        min: i64,
        /// Largest accepted wager.
        max: i64,
    },
    /// The action is not permitted for this contestant or question.
    #[error("not permitted: {0}")]
    NotPermitted(String),
    /// Contestant not part of the game.
    #[error("unknown contestant `{0}`")]
    UnknownContestant(ContestantId),
    /// Question not part of the game.
    #[error("unknown question `{0}`")]
    UnknownQuestion(QuestionId),
}
