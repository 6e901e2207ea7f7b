use indexmap::IndexMap;
use tracing::info;

use crate::{
    engine::{EngineError, EngineSettings, QuestionSetup, RoundEngine, events::EngineEvent},
    state::game::{Contestant, ContestantId, Game, GameStage, QuestionId, QuestionStatus},
};

/// A loaded game together with the engine of the question being played.
///
/// While a question is open the engine owns the contestants; they go back to the
/// [`Game`] once the question closes.
#[derive(Debug)]
pub struct GameSession {
    game: Game,
    engine: Option<RoundEngine>,
    settings: EngineSettings,
    pending: Vec<EngineEvent>,
}

impl GameSession {
    /// Wrap a freshly loaded game.
    pub fn new(game: Game, settings: EngineSettings) -> Self {
        Self {
            game,
            engine: None,
            settings,
            pending: Vec::new(),
        }
    }

    /// The game record. Contestants are empty while a question is open.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Engine of the question in play.
    pub fn engine(&self) -> Option<&RoundEngine> {
        self.engine.as_ref()
    }

    /// Contestants, wherever they currently live.
    pub fn contestants(&self) -> &IndexMap<ContestantId, Contestant> {
        match &self.engine {
            Some(engine) => engine.contestants(),
            None => &self.game.contestants,
        }
    }

    /// Hand the turn to a random contestant.
    pub fn choose_first_turn(&mut self) -> Result<ContestantId, EngineError> {
        if self.engine.is_some() {
            return Err(EngineError::NotPermitted(
                "the turn cannot change while a question is in play".into(),
            ));
        }
        let chosen = self
            .game
            .pick_first_turn()
            .ok_or_else(|| EngineError::NotPermitted("the game has no contestants".into()))?;
        info!(game = %self.game.id, contestant = %chosen, "first turn chosen");
        Ok(chosen)
    }

    /// Open question `id` and hand the contestants to a new engine.
    pub fn open_question(&mut self, id: QuestionId) -> Result<(), EngineError> {
        if self.engine.is_some() {
            return Err(EngineError::NotPermitted(
                "another question is already in play".into(),
            ));
        }
        if self.game.stage == GameStage::Ended {
            return Err(EngineError::NotPermitted("the game has ended".into()));
        }

        let at = self
            .game
            .locate(id)
            .ok_or(EngineError::UnknownQuestion(id))?;
        let question = self
            .game
            .question(at)
            .cloned()
            .ok_or(EngineError::UnknownQuestion(id))?;
        if question.status == QuestionStatus::Resolved {
            return Err(EngineError::StaleEvent(format!(
                "question {id} was already played"
            )));
        }
        if question.is_daily_double && self.game.turn_holder().is_none() {
            return Err(EngineError::NotPermitted(
                "a daily double needs a turn-holder".into(),
            ));
        }

        let buzz_time_ms = self.game.buzz_time_ms(at).unwrap_or_default();
        let round_number = u32::try_from(at.round + 1).unwrap_or(u32::MAX);
        if let Some(stored) = self.game.question_mut(at) {
            stored.status = QuestionStatus::Active;
        }
        self.game.active_question = Some(id);
        self.game.round_number = round_number;
        self.game.stage = GameStage::Question(id);

        let contestants = std::mem::take(&mut self.game.contestants);
        let setup = QuestionSetup {
            question,
            buzz_time_ms,
            round_number,
        };
        self.engine = Some(RoundEngine::new(setup, contestants, self.settings));
        Ok(())
    }

    /// Run `action` against the engine, then settle the question if it closed.
    pub fn with_engine<T>(
        &mut self,
        action: impl FnOnce(&mut RoundEngine) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| EngineError::NotPermitted("no question is in play".into()))?;
        let result = action(engine);
        self.settle();
        result
    }

    /// Advance the engine clock.
    pub fn tick(&mut self, delta_ms: u64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.tick(delta_ms);
            self.settle();
        }
    }

    /// Take every event produced since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if let Some(engine) = self.engine.as_mut() {
            events.extend(engine.drain_events());
        }
        events
    }

    fn settle(&mut self) {
        if !self.engine.as_ref().is_some_and(RoundEngine::is_closed) {
            return;
        }
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        self.pending.extend(engine.drain_events());

        let (question, contestants) = engine.into_parts();
        self.game.contestants = contestants;
        if let Some(at) = self.game.locate(question.id) {
            if let Some(stored) = self.game.question_mut(at) {
                *stored = question;
                stored.status = QuestionStatus::Resolved;
            }
        }
        self.game.active_question = None;
        self.game.stage = if self.game.all_resolved() {
            GameStage::Ended
        } else {
            GameStage::Selection
        };
        info!(game = %self.game.id, stage = ?self.game.stage, "question settled");
    }
}
