use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{phase::VisibleQuestionPhase, presenter::GameSnapshot},
    engine::{
        QuestionVariant,
        events::{CountdownPurpose, DeltaReason, ScoreDelta},
        lifecycle::AttemptOutcome,
    },
    state::game::PowerUpKind,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `presenter`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Presenter token returned when the stream is privileged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a game is loaded.
#[serde(transparent)]
pub struct GameLoadedEvent(pub GameSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the turn moves to another contestant.
pub struct TurnChangedEvent {
    pub contestant: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the phase of the active question changes.
pub struct PhaseChangedEvent {
    pub question: Uuid,
    #[serde(flatten)]
    pub phase: VisibleQuestionPhase,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once the prompt is shown.
pub struct QuestionRevealedEvent {
    pub question: Uuid,
    pub prompt: String,
    pub value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Multiple-choice labels, empty for open answers.
    pub choices: Vec<String>,
    pub variant: QuestionVariant,
}

#[derive(Debug, Serialize, ToSchema)]
/// Contestants allowed to buzz on the window that just opened.
pub struct BuzzEnabledEvent {
    pub eligible: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Payload of events that carry nothing but their name.
pub struct EmptyEvent {}

#[derive(Debug, Serialize, ToSchema)]
/// A buzz reached arbitration.
pub struct BuzzReceivedEvent {
    pub contestant: Uuid,
    /// Time since the window opened.
    pub after_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// A contestant won the window.
pub struct BuzzWinnerEvent {
    pub contestant: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Contestants who lost the window.
pub struct BuzzLosersEvent {
    pub contestants: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
/// A power-up of a contestant became usable or was consumed.
pub struct PowerUpEvent {
    pub contestant: Uuid,
    pub power_up: PowerUpKind,
}

#[derive(Debug, Serialize, ToSchema)]
/// Power-ups of a contestant stopped being usable.
pub struct PowerUpsDisabledEvent {
    pub contestant: Uuid,
    pub power_ups: Vec<PowerUpKind>,
}

#[derive(Debug, Serialize, ToSchema)]
/// The answer countdown is paused by a freeze.
pub struct FreezeStartedEvent {
    pub contestant: Uuid,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Countdown start or progress.
pub struct CountdownEvent {
    pub purpose: CountdownPurpose,
    pub elapsed_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// A countdown expired or was cancelled.
pub struct CountdownStoppedEvent {
    pub purpose: CountdownPurpose,
}

#[derive(Debug, Serialize, ToSchema)]
/// A tip is shown.
pub struct TipRevealedEvent {
    pub index: usize,
    pub tip: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// A wrong choice is crossed out.
pub struct ChoiceEliminatedEvent {
    pub index: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// A score moved and why.
pub struct ScoreDeltaEvent {
    pub contestant: Uuid,
    pub points: i64,
    pub reason: DeltaReason,
}

#[derive(Debug, Serialize, ToSchema)]
/// New totals of a contestant.
pub struct ScoreChangedEvent {
    pub contestant: Uuid,
    pub score: i64,
    pub hits: u32,
    pub misses: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// The canonical answer is shown.
pub struct AnswerRevealedEvent {
    pub answer: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// A contestant locked in a wager; the amount stays on the presenter stream.
pub struct WagerPlacedEvent {
    pub contestant: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Accepted wager with its amount.
pub struct WagerAcceptedEvent {
    pub contestant: Uuid,
    pub amount: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// A finale answer was submitted.
pub struct FinaleAnswerReceivedEvent {
    pub contestant: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// A finalist's answer is up for judgment.
pub struct FinaleAnswerShownEvent {
    pub contestant: Uuid,
    pub answer: Option<String>,
    pub wager: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Score change that stuck once the question closed.
pub struct ScoreDeltaSummary {
    pub contestant: Uuid,
    pub points: i64,
    pub outcome: AttemptOutcome,
}

impl From<ScoreDelta> for ScoreDeltaSummary {
    fn from(delta: ScoreDelta) -> Self {
        Self {
            contestant: delta.contestant,
            points: delta.points,
            outcome: delta.outcome,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// The question is over.
pub struct QuestionClosedEvent {
    pub question: Uuid,
    pub deltas: Vec<ScoreDeltaSummary>,
    /// Contestant picking the next question.
    pub turn: Option<Uuid>,
}
