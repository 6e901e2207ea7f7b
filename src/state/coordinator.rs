//! The task that owns the loaded game.
//!
//! Contestant sockets and presenter requests never touch the game directly: they queue
//! [`Command`]s, and this task applies them one at a time in arrival order, ticks the
//! engine clock and fans the resulting events out to SSE subscribers and sockets.

use std::sync::{Arc, Weak};

use tokio::{
    sync::{mpsc, oneshot},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dto::{presenter::GameSnapshot, ws::ContestantOutboundMessage},
    engine::{
        EngineError, Judgment, arbiter::BuzzOutcome, events::EngineEvent,
        lifecycle::{AttemptOutcome, QuestionPhase},
        power_ups::PowerUpState,
    },
    services::sse_events,
    state::{
        AppState,
        game::{ContestantId, Game, PowerUpKind, QuestionId},
        session::GameSession,
    },
};

/// Something a contestant device asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContestantAction {
    /// Press the buzzer.
    Buzz,
    /// Use a power-up.
    UsePowerUp(PowerUpKind),
    /// Place a daily double or finale wager.
    Wager(i64),
    /// Submit the finale answer.
    FinaleAnswer(String),
}

/// Something the presenter asked for.
#[derive(Debug)]
pub enum PresenterAction {
    /// Replace the loaded game.
    LoadGame(Box<Game>),
    /// Hand the turn to a random contestant.
    ChooseFirstTurn,
    /// Put a question in play.
    OpenQuestion(QuestionId),
    /// Show the prompt.
    Reveal,
    /// Judge the current answer.
    Judge(Judgment),
    /// Close the question without scoring.
    Abort,
    /// Put the latest judgment back.
    Undo,
    /// Move on from a resolved attempt.
    Advance,
    /// Describe the game.
    Snapshot,
}

impl PresenterAction {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadGame(_) => "load_game",
            Self::ChooseFirstTurn => "choose_first_turn",
            Self::OpenQuestion(_) => "open_question",
            Self::Reveal => "reveal",
            Self::Judge(_) => "judge",
            Self::Abort => "abort",
            Self::Undo => "undo",
            Self::Advance => "advance",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Successful result of a [`PresenterAction`].
#[derive(Debug)]
pub enum PresenterOutcome {
    /// Done, nothing to report.
    Ack,
    /// Who got the first turn.
    FirstTurn(ContestantId),
    /// Outcome of a judgment.
    Judged(AttemptOutcome),
    /// Current state of the game.
    Snapshot(Box<GameSnapshot>),
}

/// Messages a freshly identified contestant device should receive to catch up.
pub type Greeting = Vec<ContestantOutboundMessage>;

/// Work queued for the coordinator.
#[derive(Debug)]
pub enum Command {
    /// Contestant action; the outcome is reported over the contestant socket.
    Contestant {
        /// Who acts.
        id: ContestantId,
        /// What they do.
        action: ContestantAction,
    },
    /// A contestant device identified itself.
    Identify {
        /// Claimed contestant id.
        id: ContestantId,
        /// Catch-up messages, `None` when the id is not part of the game.
        reply: oneshot::Sender<Option<Greeting>>,
    },
    /// Presenter action with its reply slot.
    Presenter {
        /// What to do.
        action: PresenterAction,
        /// Where to report.
        reply: oneshot::Sender<Result<PresenterOutcome, EngineError>>,
    },
}

/// Owner of the game session.
pub struct Coordinator {
    state: Weak<AppState>,
    config: Arc<AppConfig>,
    session: Option<GameSession>,
    last_tick: Instant,
}

impl Coordinator {
    /// Build a coordinator publishing through `state`.
    pub fn new(state: Weak<AppState>, config: Arc<AppConfig>) -> Self {
        Self {
            state,
            config,
            session: None,
            last_tick: Instant::now(),
        }
    }

    /// Process commands and clock ticks until every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut ticker = time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.last_tick = Instant::now();
        info!(tick_ms = self.config.tick.as_millis() as u64, "game coordinator started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    // Commands see an up-to-date engine clock so buzz timestamps are exact.
                    self.advance_clock();
                    self.handle(command);
                }
                _ = ticker.tick() => self.advance_clock(),
            }
            self.flush();
        }

        info!("game coordinator stopped");
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        let delta_ms = u64::try_from(now.duration_since(self.last_tick).as_millis())
            .unwrap_or(u64::MAX);
        if delta_ms == 0 {
            return;
        }
        // Only whole milliseconds are consumed; the remainder carries to the next tick.
        self.last_tick += time::Duration::from_millis(delta_ms);
        if let Some(session) = self.session.as_mut() {
            session.tick(delta_ms);
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Contestant { id, action } => self.handle_contestant(id, action),
            Command::Identify { id, reply } => {
                let _ = reply.send(self.greeting(id));
            }
            Command::Presenter { action, reply } => {
                let name = action.name();
                let result = self.handle_presenter(action);
                if let Err(err) = &result {
                    warn!(action = name, error = %err, "presenter action rejected");
                }
                let _ = reply.send(result);
            }
        }
    }

    fn handle_contestant(&mut self, id: ContestantId, action: ContestantAction) {
        let Some(session) = self.session.as_mut() else {
            debug!(contestant = %id, ?action, "no game loaded; ignoring contestant action");
            return;
        };

        let result = match action {
            ContestantAction::Buzz => session.with_engine(|engine| engine.buzz(id)).map(
                |outcome| {
                    if let BuzzOutcome::Rejected(reason) = outcome {
                        debug!(contestant = %id, ?reason, "buzz did not win");
                    }
                },
            ),
            ContestantAction::UsePowerUp(kind) => {
                session.with_engine(|engine| engine.use_power_up(id, kind))
            }
            ContestantAction::Wager(amount) => session
                .with_engine(|engine| engine.wager(id, amount))
                .map(|_| ()),
            ContestantAction::FinaleAnswer(answer) => {
                session.with_engine(|engine| engine.finale_answer(id, answer))
            }
        };

        if let Err(err) = result {
            self.reject_contestant(id, err);
        }
    }

    fn reject_contestant(&self, id: ContestantId, err: EngineError) {
        match &err {
            EngineError::StaleEvent(_) | EngineError::NotPermitted(_) => {
                debug!(contestant = %id, error = %err, "contestant action dropped");
            }
            _ => warn!(contestant = %id, error = %err, "contestant action rejected"),
        }

        let Some(state) = self.state.upgrade() else {
            return;
        };
        let message = match err {
            EngineError::InvalidWager { min, max } => {
                ContestantOutboundMessage::InvalidWager { min, max }
            }
            other => ContestantOutboundMessage::Rejected {
                message: other.to_string(),
            },
        };
        state.notify_contestant(id, &message);
    }

    fn handle_presenter(&mut self, action: PresenterAction) -> Result<PresenterOutcome, EngineError> {
        let action = match action {
            PresenterAction::LoadGame(game) => return self.load_game(*game),
            other => other,
        };
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| EngineError::NotPermitted("no game is loaded".into()))?;

        match action {
            PresenterAction::LoadGame(_) => Err(EngineError::NotPermitted(
                "a game load cannot run against a session".into(),
            )),
            PresenterAction::ChooseFirstTurn => {
                let chosen = session.choose_first_turn()?;
                if let Some(state) = self.state.upgrade() {
                    sse_events::broadcast_turn_changed(&state, chosen);
                }
                Ok(PresenterOutcome::FirstTurn(chosen))
            }
            PresenterAction::OpenQuestion(id) => {
                session.open_question(id)?;
                Ok(PresenterOutcome::Ack)
            }
            PresenterAction::Reveal => {
                session.with_engine(|engine| engine.reveal())?;
                Ok(PresenterOutcome::Ack)
            }
            PresenterAction::Judge(judgment) => {
                let outcome = session.with_engine(|engine| engine.judge(judgment))?;
                Ok(PresenterOutcome::Judged(outcome))
            }
            PresenterAction::Abort => {
                session.with_engine(|engine| engine.abort())?;
                Ok(PresenterOutcome::Ack)
            }
            PresenterAction::Undo => {
                session.with_engine(|engine| engine.undo())?;
                Ok(PresenterOutcome::Ack)
            }
            PresenterAction::Advance => {
                session.with_engine(|engine| engine.advance())?;
                Ok(PresenterOutcome::Ack)
            }
            PresenterAction::Snapshot => Ok(PresenterOutcome::Snapshot(Box::new(
                GameSnapshot::from(&*session),
            ))),
        }
    }

    fn load_game(&mut self, game: Game) -> Result<PresenterOutcome, EngineError> {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.engine().is_some())
        {
            return Err(EngineError::NotPermitted(
                "a question is in play; close it before loading another game".into(),
            ));
        }

        info!(game = %game.id, title = %game.title, contestants = game.contestants.len(), "game loaded");
        let session = GameSession::new(game, self.config.engine_settings());
        let snapshot = GameSnapshot::from(&session);
        self.session = Some(session);

        if let Some(state) = self.state.upgrade() {
            sse_events::broadcast_game_loaded(&state, &snapshot);
            state.notify_all_contestants(&ContestantOutboundMessage::BuzzDisabled);
        }
        Ok(PresenterOutcome::Snapshot(Box::new(snapshot)))
    }

    fn greeting(&self, id: ContestantId) -> Option<Greeting> {
        let session = self.session.as_ref()?;
        let contestant = session.contestants().get(&id)?;

        let mut messages = vec![
            ContestantOutboundMessage::Identified {
                id,
                name: contestant.name.clone(),
                color: contestant.color.clone(),
            },
            ContestantOutboundMessage::ScoreChanged {
                score: contestant.score,
                hits: contestant.hits,
                misses: contestant.misses,
            },
        ];

        match session.engine() {
            Some(engine)
                if engine.phase() == QuestionPhase::BuzzOpen && engine.eligible().contains(&id) =>
            {
                messages.push(ContestantOutboundMessage::BuzzEnabled);
            }
            _ => messages.push(ContestantOutboundMessage::BuzzDisabled),
        }
        if let Some(engine) = session.engine() {
            messages.extend(
                PowerUpKind::ALL
                    .into_iter()
                    .filter(|kind| engine.power_up_state(id, *kind) == PowerUpState::Enabled)
                    .map(|power_up| ContestantOutboundMessage::PowerUpEnabled { power_up }),
            );
        }
        Some(messages)
    }

    fn flush(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let events = session.drain_events();
        if events.is_empty() {
            return;
        }
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let session = &*session;
        for event in events {
            publish(&state, session, event);
        }
    }
}

/// Route one engine event to the SSE streams and the contestant sockets it concerns.
fn publish(state: &Arc<AppState>, session: &GameSession, event: EngineEvent) {
    match event {
        EngineEvent::PhaseChanged { question, phase } => {
            sse_events::broadcast_phase_changed(state, question, phase);
            if phase == QuestionPhase::Revealed {
                let revealed = session
                    .engine()
                    .filter(|engine| engine.question().id == question);
                if let Some(engine) = revealed {
                    sse_events::broadcast_question_revealed(
                        state,
                        engine.question(),
                        engine.variant(),
                    );
                }
            }
        }
        EngineEvent::BuzzEnabled { eligible } => {
            for id in &eligible {
                state.notify_contestant(*id, &ContestantOutboundMessage::BuzzEnabled);
            }
            sse_events::broadcast_buzz_enabled(state, eligible);
        }
        EngineEvent::BuzzDisabled => {
            state.notify_all_contestants(&ContestantOutboundMessage::BuzzDisabled);
            sse_events::broadcast_buzz_disabled(state);
        }
        EngineEvent::BuzzReceived {
            contestant,
            after_ms,
        } => sse_events::broadcast_buzz_received(state, contestant, after_ms),
        EngineEvent::BuzzWinner { contestant } => {
            state.notify_contestant(contestant, &ContestantOutboundMessage::BuzzWinner);
            sse_events::broadcast_buzz_winner(state, contestant);
        }
        EngineEvent::BuzzLoser { contestants } => {
            for id in &contestants {
                state.notify_contestant(*id, &ContestantOutboundMessage::BuzzLoser);
            }
            sse_events::broadcast_buzz_losers(state, contestants);
        }
        EngineEvent::PowerUpEnabled {
            contestant,
            power_up,
        } => {
            state.notify_contestant(
                contestant,
                &ContestantOutboundMessage::PowerUpEnabled { power_up },
            );
            sse_events::broadcast_power_up_enabled(state, contestant, power_up);
        }
        EngineEvent::PowerUpsDisabled {
            contestant,
            power_ups,
        } => {
            state.notify_contestant(
                contestant,
                &ContestantOutboundMessage::PowerUpsDisabled {
                    power_ups: power_ups.clone(),
                },
            );
            sse_events::broadcast_power_ups_disabled(state, contestant, power_ups);
        }
        EngineEvent::PowerUpUsed {
            contestant,
            power_up,
        } => sse_events::broadcast_power_up_used(state, contestant, power_up),
        EngineEvent::FreezeStarted {
            contestant,
            duration_ms,
        } => sse_events::broadcast_freeze_started(state, contestant, duration_ms),
        EngineEvent::FreezeEnded => sse_events::broadcast_freeze_ended(state),
        EngineEvent::CountdownStarted {
            purpose,
            duration_ms,
        } => sse_events::broadcast_countdown_started(state, purpose, duration_ms),
        EngineEvent::CountdownTick {
            purpose,
            elapsed_ms,
            duration_ms,
        } => sse_events::broadcast_countdown_tick(state, purpose, elapsed_ms, duration_ms),
        EngineEvent::CountdownStopped { purpose } => {
            sse_events::broadcast_countdown_stopped(state, purpose)
        }
        EngineEvent::TipRevealed { index, tip } => {
            sse_events::broadcast_tip_revealed(state, index, tip)
        }
        EngineEvent::ChoiceEliminated { index } => {
            sse_events::broadcast_choice_eliminated(state, index)
        }
        EngineEvent::ScoreDelta {
            contestant,
            points,
            reason,
        } => sse_events::broadcast_score_delta(state, contestant, points, reason),
        EngineEvent::ScoreChanged { contestant, totals } => {
            state.notify_contestant(contestant, &ContestantOutboundMessage::from(totals));
            sse_events::broadcast_score_changed(state, contestant, totals);
        }
        EngineEvent::AnswerRevealed { answer } => {
            sse_events::broadcast_answer_revealed(state, answer)
        }
        EngineEvent::WagerAccepted { contestant, amount } => {
            state.notify_contestant(
                contestant,
                &ContestantOutboundMessage::WagerAccepted { amount },
            );
            sse_events::broadcast_wager_accepted(state, contestant, amount);
        }
        EngineEvent::FinaleAnswerReceived { contestant } => {
            sse_events::broadcast_finale_answer_received(state, contestant)
        }
        EngineEvent::FinaleAnswerShown {
            contestant,
            answer,
            wager,
        } => sse_events::broadcast_finale_answer_shown(state, contestant, answer, wager),
        EngineEvent::QuestionClosed { question, deltas } => {
            let turn = session.game().turn_holder();
            sse_events::broadcast_question_closed(state, question, &deltas, turn);

            let store = state.score_store();
            let game_id = session.game().id;
            tokio::spawn(async move {
                if let Err(err) = store.record_deltas(game_id, deltas).await {
                    warn!(game = %game_id, question = %question, error = %err, "failed to record score deltas");
                }
            });
        }
    }
}
