use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    engine::lifecycle::{AttemptOutcome, QuestionPhase},
    state::game::GameStage,
};

/// Publicly visible question phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum VisibleQuestionPhase {
    /// Picked, prompt not shown.
    Hidden,
    /// Prompt shown.
    Revealed,
    /// Contestants may buzz.
    BuzzOpen,
    /// A contestant is answering.
    Answering {
        /// Who answers.
        contestant: Uuid,
    },
    /// The latest attempt has an outcome.
    Resolved {
        /// Outcome.
        outcome: AttemptOutcome,
        /// Who answered.
        contestant: Option<Uuid>,
    },
    /// Question finished.
    Closed,
}

impl From<QuestionPhase> for VisibleQuestionPhase {
    fn from(value: QuestionPhase) -> Self {
        match value {
            QuestionPhase::Hidden => VisibleQuestionPhase::Hidden,
            QuestionPhase::Revealed => VisibleQuestionPhase::Revealed,
            QuestionPhase::BuzzOpen => VisibleQuestionPhase::BuzzOpen,
            QuestionPhase::Answering { contestant } => {
                VisibleQuestionPhase::Answering { contestant }
            }
            QuestionPhase::Resolved {
                outcome,
                contestant,
            } => VisibleQuestionPhase::Resolved {
                outcome,
                contestant,
            },
            QuestionPhase::Closed => VisibleQuestionPhase::Closed,
        }
    }
}

/// Coarse game progress exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleGameStage {
    /// Waiting for the presenter to pick a question.
    Selection,
    /// A question is in play.
    Question,
    /// Every question has been played.
    Ended,
}

impl From<GameStage> for VisibleGameStage {
    fn from(value: GameStage) -> Self {
        match value {
            GameStage::Selection => VisibleGameStage::Selection,
            GameStage::Question(_) => VisibleGameStage::Question,
            GameStage::Ended => VisibleGameStage::Ended,
        }
    }
}
