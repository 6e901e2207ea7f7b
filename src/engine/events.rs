//! Events emitted by the round engine for contestants and the display.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    engine::lifecycle::{AttemptOutcome, QuestionPhase},
    state::game::{ContestantId, PowerUpKind, QuestionId},
};

/// What a countdown measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPurpose {
    /// Time left to buzz.
    Buzz,
    /// Time left to answer.
    Answer,
    /// Time left to write finale answers.
    FinaleAnswers,
}

/// Why a score moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeltaReason {
    /// Judged correct.
    Correct,
    /// Judged wrong.
    Incorrect,
    /// The answer countdown ran out.
    AnswerTimedOut,
    /// The contestant rewound their wrong answer.
    Rewind,
    /// The presenter undid the judgment.
    Undo,
}

/// Score and counters of a contestant after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreTotals {
    /// Score.
    pub score: i64,
    /// Correct answers.
    pub hits: u32,
    /// Wrong answers.
    pub misses: u32,
}

/// Final score delta of a question, persisted when it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreDelta {
    /// Question the delta belongs to.
    pub question: QuestionId,
    /// Contestant whose score moved.
    pub contestant: ContestantId,
    /// Signed points.
    pub points: i64,
    /// Judgment behind the delta.
    pub outcome: AttemptOutcome,
}

/// Everything observable that happens during a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The question moved to another phase.
    PhaseChanged {
        /// Question id.
        question: QuestionId,
        /// New phase.
        phase: QuestionPhase,
    },
    /// Buzzing is open for these contestants.
    BuzzEnabled {
        /// Contestants allowed to buzz.
        eligible: Vec<ContestantId>,
    },
    /// Nobody may buzz.
    BuzzDisabled,
    /// A buzz reached arbitration.
    BuzzReceived {
        /// Who buzzed.
        contestant: ContestantId,
        /// Time since the window opened.
        after_ms: u64,
    },
    /// A contestant won the right to answer.
    BuzzWinner {
        /// Winner.
        contestant: ContestantId,
    },
    /// These contestants lost the window.
    BuzzLoser {
        /// Losers.
        contestants: Vec<ContestantId>,
    },
    /// A power-up became usable.
    PowerUpEnabled {
        /// Owner.
        contestant: ContestantId,
        /// Power-up.
        power_up: PowerUpKind,
    },
    /// Power-ups stopped being usable.
    PowerUpsDisabled {
        /// Owner.
        contestant: ContestantId,
        /// Power-ups switched off.
        power_ups: Vec<PowerUpKind>,
    },
    /// A power-up was consumed.
    PowerUpUsed {
        /// Owner.
        contestant: ContestantId,
        /// Power-up.
        power_up: PowerUpKind,
    },
    /// A freeze paused the answer countdown.
    FreezeStarted {
        /// Who froze.
        contestant: ContestantId,
        /// How long the freeze lasts.
        duration_ms: u64,
    },
    /// The freeze is over.
    FreezeEnded,
    /// A countdown started.
    CountdownStarted {
        /// What it measures.
        purpose: CountdownPurpose,
        /// Total duration.
        duration_ms: u64,
    },
    /// Countdown progress.
    CountdownTick {
        /// What it measures.
        purpose: CountdownPurpose,
        /// Elapsed time.
        elapsed_ms: u64,
        /// Total duration.
        duration_ms: u64,
    },
    /// A countdown was cancelled or expired.
    CountdownStopped {
        /// What it measured.
        purpose: CountdownPurpose,
    },
    /// A tip is shown.
    TipRevealed {
        /// Tip index.
        index: usize,
        /// Tip text.
        tip: String,
    },
    /// A wrong choice is crossed out.
    ChoiceEliminated {
        /// Choice index.
        index: usize,
    },
    /// A score moved.
    ScoreDelta {
        /// Contestant.
        contestant: ContestantId,
        /// Signed points.
        points: i64,
        /// Why.
        reason: DeltaReason,
    },
    /// New totals of a contestant.
    ScoreChanged {
        /// Contestant.
        contestant: ContestantId,
        /// Totals after the change.
        totals: ScoreTotals,
    },
    /// The answer is shown.
    AnswerRevealed {
        /// Canonical answer.
        answer: String,
    },
    /// A wager was accepted.
    WagerAccepted {
        /// Contestant.
        contestant: ContestantId,
        /// Amount.
        amount: u32,
    },
    /// A finale answer was submitted.
    FinaleAnswerReceived {
        /// Contestant.
        contestant: ContestantId,
    },
    /// A finalist's answer is up for judgment.
    FinaleAnswerShown {
        /// Contestant.
        contestant: ContestantId,
        /// What they wrote.
        answer: Option<String>,
        /// What they wagered.
        wager: u32,
    },
    /// The question is over; `deltas` are the score changes that stuck.
    QuestionClosed {
        /// Question id.
        question: QuestionId,
        /// Final deltas.
        deltas: Vec<ScoreDelta>,
    },
}
