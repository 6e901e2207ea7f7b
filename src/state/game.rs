use std::time::SystemTime;

use indexmap::IndexMap;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier of a contestant inside a loaded game.
pub type ContestantId = Uuid;
/// Identifier of a question inside a loaded game.
pub type QuestionId = Uuid;

/// Default buzz window (seconds) applied to categories that do not set one.
pub const DEFAULT_BUZZ_TIME_S: u32 = 10;

/// Closed set of one-shot power-ups a contestant may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    /// Pause the answer countdown for a while.
    Freeze,
    /// Undo one's own wrong answer and answer again.
    Rewind,
    /// Steal the right to answer.
    Hijack,
}

impl PowerUpKind {
    /// Every power-up kind, in display order.
    pub const ALL: [PowerUpKind; 3] = [PowerUpKind::Hijack, PowerUpKind::Freeze, PowerUpKind::Rewind];
}

/// Persistent per-game record of a contestant's power-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerUpSlot {
    /// Whether the contestant can use it right now.
    pub available: bool,
    /// Whether it has been consumed during this game.
    pub used: bool,
}

/// Contestant tracked during a game.
#[derive(Debug, Clone, PartialEq)]
pub struct Contestant {
    /// Display name chosen by the contestant.
    pub name: String,
    /// Hex color (`#rrggbb`) used on the display.
    pub color: String,
    /// Current score, may go negative.
    pub score: i64,
    /// Number of correct answers.
    pub hits: u32,
    /// Number of wrong or timed-out answers.
    pub misses: u32,
    /// Number of buzzes that reached arbitration.
    pub buzzes: u32,
    /// Whether this contestant picks the next question.
    pub has_turn: bool,
    /// Power-ups owned by this contestant.
    pub power_ups: IndexMap<PowerUpKind, PowerUpSlot>,
    /// Finale wager, once placed.
    pub finale_wager: Option<u32>,
    /// Finale answer, once submitted.
    pub finale_answer: Option<String>,
}

impl Contestant {
    /// Build a fresh contestant with a zero score.
    pub fn new(name: String, color: String, with_power_ups: bool) -> Self {
        let power_ups = if with_power_ups {
            PowerUpKind::ALL
                .into_iter()
                .map(|kind| (kind, PowerUpSlot::default()))
                .collect()
        } else {
            IndexMap::new()
        };

        Self {
            name,
            color,
            score: 0,
            hits: 0,
            misses: 0,
            buzzes: 0,
            has_turn: false,
            power_ups,
            finale_wager: None,
            finale_answer: None,
        }
    }

    /// Whether the contestant owns `kind` and has not consumed it yet.
    pub fn holds(&self, kind: PowerUpKind) -> bool {
        self.power_ups.get(&kind).is_some_and(|slot| !slot.used)
    }
}

/// Answer of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Free-form answer judged by the presenter.
    Open(String),
    /// Multiple-choice answer.
    Choices {
        /// Choice labels in display order.
        choices: Vec<String>,
        /// Index of the correct entry in `choices`.
        correct: usize,
    },
}

impl Answer {
    /// Number of choices, `0` for open answers.
    pub fn choice_count(&self) -> usize {
        match self {
            Answer::Open(_) => 0,
            Answer::Choices { choices, .. } => choices.len(),
        }
    }

    /// Canonical answer text shown on reveal.
    pub fn canonical(&self) -> &str {
        match self {
            Answer::Open(text) => text,
            Answer::Choices { choices, correct } => {
                choices.get(*correct).map(String::as_str).unwrap_or_default()
            }
        }
    }

    /// Shuffle multiple-choice entries while keeping `correct` pointing at the same label.
    pub fn shuffle_choices(&mut self) {
        let Answer::Choices { choices, correct } = self else {
            return;
        };
        let Some(label) = choices.get(*correct).cloned() else {
            return;
        };
        choices.shuffle(&mut rand::rng());
        if let Some(index) = choices.iter().position(|choice| *choice == label) {
            *correct = index;
        }
    }
}

/// Status of a question within the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    /// Not played yet.
    Pending,
    /// Currently on the board.
    Active,
    /// Played.
    Resolved,
}

/// A single question of a category.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Stable identifier.
    pub id: QuestionId,
    /// Prompt read out to contestants.
    pub prompt: String,
    /// Expected answer.
    pub answer: Answer,
    /// Base value in points.
    pub value: u32,
    /// Hints revealed progressively while nobody answers.
    pub tips: Vec<String>,
    /// Optional media reference shown with the prompt.
    pub media: Option<String>,
    /// Per-question buzz time override, in seconds.
    pub buzz_time_s: Option<u32>,
    /// Played as a daily double by the turn-holder.
    pub is_daily_double: bool,
    /// Played as the finale.
    pub is_finale: bool,
    /// Lifecycle status.
    pub status: QuestionStatus,
}

/// Category grouping questions.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Display name.
    pub name: String,
    /// Buzz window length in seconds, `0` lets the presenter end it manually.
    pub buzz_time_s: u32,
    /// Questions in board order.
    pub questions: Vec<Question>,
}

/// Kind of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// Standard board round.
    Regular,
    /// Round played as a daily double.
    DailyDouble,
    /// Final wager round.
    Finale,
}

/// One round of the game.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Display name.
    pub name: String,
    /// Round kind.
    pub kind: RoundKind,
    /// Categories in board order.
    pub categories: Vec<Category>,
}

/// Coarse progress of the game between questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStage {
    /// The presenter is picking the next question.
    Selection,
    /// A question is being played.
    Question(QuestionId),
    /// Every question has been played.
    Ended,
}

/// Location of a question inside the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionLocation {
    /// Index of the round.
    pub round: usize,
    /// Index of the category inside the round.
    pub category: usize,
    /// Index of the question inside the category.
    pub question: usize,
}

/// Aggregated state for a loaded game.
#[derive(Debug, Clone)]
pub struct Game {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Rounds in play order.
    pub rounds: Vec<Round>,
    /// Contestants in join order.
    pub contestants: IndexMap<ContestantId, Contestant>,
    /// Currently active question.
    pub active_question: Option<QuestionId>,
    /// One-based number of the round being played.
    pub round_number: u32,
    /// Coarse progress.
    pub stage: GameStage,
    /// When the game was loaded.
    pub loaded_at: SystemTime,
}

impl Game {
    /// Build a new game, shuffling multiple-choice answers once.
    pub fn new(
        title: String,
        mut rounds: Vec<Round>,
        contestants: IndexMap<ContestantId, Contestant>,
    ) -> Self {
        for question in rounds
            .iter_mut()
            .flat_map(|round| round.categories.iter_mut())
            .flat_map(|category| category.questions.iter_mut())
        {
            question.answer.shuffle_choices();
        }

        Self {
            id: Uuid::new_v4(),
            title,
            rounds,
            contestants,
            active_question: None,
            round_number: 1,
            stage: GameStage::Selection,
            loaded_at: SystemTime::now(),
        }
    }

    /// Find where a question lives.
    pub fn locate(&self, id: QuestionId) -> Option<QuestionLocation> {
        self.rounds.iter().enumerate().find_map(|(round_idx, round)| {
            round
                .categories
                .iter()
                .enumerate()
                .find_map(|(category_idx, category)| {
                    category
                        .questions
                        .iter()
                        .position(|question| question.id == id)
                        .map(|question_idx| QuestionLocation {
                            round: round_idx,
                            category: category_idx,
                            question: question_idx,
                        })
                })
        })
    }

    /// Borrow a question by location.
    pub fn question(&self, at: QuestionLocation) -> Option<&Question> {
        self.rounds
            .get(at.round)?
            .categories
            .get(at.category)?
            .questions
            .get(at.question)
    }

    /// Mutably borrow a question by location.
    pub fn question_mut(&mut self, at: QuestionLocation) -> Option<&mut Question> {
        self.rounds
            .get_mut(at.round)?
            .categories
            .get_mut(at.category)?
            .questions
            .get_mut(at.question)
    }

    /// Buzz time in milliseconds applying the question override over the category default.
    pub fn buzz_time_ms(&self, at: QuestionLocation) -> Option<u64> {
        let category = self.rounds.get(at.round)?.categories.get(at.category)?;
        let question = category.questions.get(at.question)?;
        let seconds = question.buzz_time_s.unwrap_or(category.buzz_time_s);
        Some(u64::from(seconds) * 1000)
    }

    /// Contestant currently holding the turn.
    pub fn turn_holder(&self) -> Option<ContestantId> {
        self.contestants
            .iter()
            .find_map(|(id, contestant)| contestant.has_turn.then_some(*id))
    }

    /// Give the turn to a random contestant, returning who got it.
    pub fn pick_first_turn(&mut self) -> Option<ContestantId> {
        let ids: Vec<ContestantId> = self.contestants.keys().copied().collect();
        let chosen = *ids.choose(&mut rand::rng())?;
        for (id, contestant) in self.contestants.iter_mut() {
            contestant.has_turn = *id == chosen;
        }
        Some(chosen)
    }

    /// Whether every question of every round has been played.
    pub fn all_resolved(&self) -> bool {
        self.rounds
            .iter()
            .flat_map(|round| round.categories.iter())
            .flat_map(|category| category.questions.iter())
            .all(|question| question.status == QuestionStatus::Resolved)
    }
}
