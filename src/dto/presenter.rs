//! DTO definitions used by the presenter REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        phase::{VisibleGameStage, VisibleQuestionPhase},
        validation::validate_hex_color,
    },
    engine::{
        Judgment, QuestionVariant, RoundEngine, events::CountdownPurpose,
        lifecycle::AttemptOutcome,
    },
    state::{
        game::{
            Contestant, ContestantId, DEFAULT_BUZZ_TIME_S, PowerUpKind, QuestionStatus, RoundKind,
        },
        session::GameSession,
    },
};

const MAX_NAME_CHARS: usize = 32;

/// Payload describing the game to play: board and contestants.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoadGameRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(nested)]
    pub rounds: Vec<RoundInput>,
    #[validate(nested)]
    pub contestants: Vec<ContestantInput>,
}

/// One round of the board.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RoundInput {
    pub name: String,
    #[serde(default = "default_round_kind")]
    pub kind: RoundKind,
    #[validate(nested)]
    pub categories: Vec<CategoryInput>,
}

/// Category with its questions.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CategoryInput {
    pub name: String,
    /// Buzz window in seconds, `0` lets the presenter close it.
    #[serde(default = "default_buzz_time_s")]
    pub buzz_time_s: u32,
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

/// Question as authored.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QuestionInput {
    /// Reuse an identifier; one is generated when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub prompt: String,
    pub answer: AnswerInput,
    pub value: u32,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub media: Option<String>,
    /// Overrides the category buzz window.
    #[serde(default)]
    pub buzz_time_s: Option<u32>,
    #[serde(default)]
    pub daily_double: bool,
}

/// Expected answer of a question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerInput {
    /// Judged by the presenter.
    Open { text: String },
    /// Multiple choice, `correct` indexes `choices`.
    Choices { choices: Vec<String>, correct: usize },
}

impl Validate for QuestionInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.prompt.trim().is_empty() {
            let mut err = ValidationError::new("prompt_empty");
            err.message = Some("Question prompt must not be blank".into());
            errors.add("prompt", err);
        }

        if let AnswerInput::Choices { choices, correct } = &self.answer {
            if choices.len() < 2 {
                let mut err = ValidationError::new("choices_count");
                err.message = Some("Multiple-choice questions need at least two choices".into());
                errors.add("answer", err);
            } else if *correct >= choices.len() {
                let mut err = ValidationError::new("choices_correct");
                err.message = Some(
                    format!("Correct index {correct} is out of {} choices", choices.len()).into(),
                );
                errors.add("answer", err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Incoming contestant definition.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContestantInput {
    /// Identifier the contestant device identifies with; generated when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    /// `#rrggbb`. If omitted, the backend chooses the first unused color from the
    /// configured palette.
    #[serde(default)]
    pub color: Option<String>,
    /// Whether the contestant gets the power-up set.
    #[serde(default = "default_power_ups")]
    pub power_ups: bool,
}

impl Validate for ContestantInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let length = self.name.trim().chars().count();
        if length == 0 || length > MAX_NAME_CHARS {
            let mut err = ValidationError::new("name_length");
            err.message =
                Some(format!("Name must be between 1 and {MAX_NAME_CHARS} characters").into());
            errors.add("name", err);
        }

        if let Some(color) = &self.color {
            if let Err(e) = validate_hex_color(color) {
                errors.add("color", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn default_round_kind() -> RoundKind {
    RoundKind::Regular
}

fn default_buzz_time_s() -> u32 {
    DEFAULT_BUZZ_TIME_S
}

fn default_power_ups() -> bool {
    true
}

/// Presenter verdict: `correct` for open answers, `choice` for multiple choice.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JudgeRequest {
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default)]
    pub choice: Option<usize>,
}

impl Validate for JudgeRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.correct.is_some() == self.choice.is_some() {
            let mut err = ValidationError::new("judgment");
            err.message = Some("Exactly one of `correct` or `choice` must be set".into());
            errors.add("correct", err);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl JudgeRequest {
    /// Engine judgment carried by the request, `None` when it is ambiguous.
    pub fn judgment(&self) -> Option<Judgment> {
        match (self.correct, self.choice) {
            (Some(true), None) => Some(Judgment::Correct),
            (Some(false), None) => Some(Judgment::Incorrect),
            (None, Some(index)) => Some(Judgment::Choice(index)),
            _ => None,
        }
    }
}

/// Generic action acknowledgement used by presenter endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

/// Contestant chosen to pick first.
#[derive(Debug, Serialize, ToSchema)]
pub struct FirstTurnResponse {
    pub contestant: Uuid,
}

/// Outcome of a judgment.
#[derive(Debug, Serialize, ToSchema)]
pub struct JudgeResponse {
    pub outcome: AttemptOutcome,
}

/// Power-up of a contestant.
#[derive(Debug, Serialize, ToSchema)]
pub struct PowerUpSummary {
    pub kind: PowerUpKind,
    pub used: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Public projection of a contestant.
pub struct ContestantSummary {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub score: i64,
    pub hits: u32,
    pub misses: u32,
    pub buzzes: u32,
    pub has_turn: bool,
    pub power_ups: Vec<PowerUpSummary>,
}

impl From<(&ContestantId, &Contestant)> for ContestantSummary {
    fn from((id, contestant): (&ContestantId, &Contestant)) -> Self {
        Self {
            id: *id,
            name: contestant.name.clone(),
            color: contestant.color.clone(),
            score: contestant.score,
            hits: contestant.hits,
            misses: contestant.misses,
            buzzes: contestant.buzzes,
            has_turn: contestant.has_turn,
            power_ups: contestant
                .power_ups
                .iter()
                .map(|(kind, slot)| PowerUpSummary {
                    kind: *kind,
                    used: slot.used,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionTile {
    pub id: Uuid,
    pub value: u32,
    pub status: QuestionStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySummary {
    pub name: String,
    pub questions: Vec<QuestionTile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundSummary {
    pub name: String,
    pub kind: RoundKind,
    pub categories: Vec<CategorySummary>,
}

/// Countdown currently running.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountdownSummary {
    pub purpose: CountdownPurpose,
    pub elapsed_ms: u64,
    pub duration_ms: u64,
    pub paused: bool,
}

/// State of the question being played.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveQuestionSummary {
    pub id: Uuid,
    pub prompt: String,
    pub value: u32,
    pub variant: QuestionVariant,
    pub phase: VisibleQuestionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<CountdownSummary>,
    pub tips_shown: usize,
    pub eliminated_choices: Vec<usize>,
    pub eligible: Vec<Uuid>,
    pub hijack_bonus: bool,
    pub can_undo: bool,
    pub answer_revealed: bool,
}

impl From<&RoundEngine> for ActiveQuestionSummary {
    fn from(engine: &RoundEngine) -> Self {
        let question = engine.question();
        Self {
            id: question.id,
            prompt: question.prompt.clone(),
            value: question.value,
            variant: engine.variant(),
            phase: engine.phase().into(),
            countdown: engine.countdown().map(|progress| CountdownSummary {
                purpose: progress.tag,
                elapsed_ms: progress.elapsed_ms,
                duration_ms: progress.duration_ms,
                paused: progress.paused,
            }),
            tips_shown: engine.tips_shown(),
            eliminated_choices: engine.eliminated_choices().to_vec(),
            eligible: engine.eligible(),
            hijack_bonus: engine.hijack_bonus(),
            can_undo: engine.can_undo(),
            answer_revealed: engine.answer_revealed(),
        }
    }
}

/// Full view of the loaded game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSnapshot {
    pub id: Uuid,
    pub title: String,
    pub loaded_at: String,
    pub stage: VisibleGameStage,
    pub round_number: u32,
    pub contestants: Vec<ContestantSummary>,
    pub rounds: Vec<RoundSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_question: Option<ActiveQuestionSummary>,
}

impl From<&GameSession> for GameSnapshot {
    fn from(session: &GameSession) -> Self {
        let game = session.game();
        Self {
            id: game.id,
            title: game.title.clone(),
            loaded_at: format_system_time(game.loaded_at),
            stage: game.stage.into(),
            round_number: game.round_number,
            contestants: session
                .contestants()
                .iter()
                .map(ContestantSummary::from)
                .collect(),
            rounds: game
                .rounds
                .iter()
                .map(|round| RoundSummary {
                    name: round.name.clone(),
                    kind: round.kind,
                    categories: round
                        .categories
                        .iter()
                        .map(|category| CategorySummary {
                            name: category.name.clone(),
                            questions: category
                                .questions
                                .iter()
                                .map(|question| QuestionTile {
                                    id: question.id,
                                    value: question.value,
                                    status: question.status,
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
            active_question: session.engine().map(ActiveQuestionSummary::from),
        }
    }
}
