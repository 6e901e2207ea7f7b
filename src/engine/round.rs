//! The round engine drives one question from the moment it is picked until it closes.

use std::collections::{HashMap, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::{
    engine::{
        EngineError,
        alarms::{Alarm, AlarmSchedule},
        arbiter::{BuzzArbiter, BuzzEvent, BuzzOutcome, BuzzRejection},
        countdown::{Countdown, CountdownProgress},
        events::{CountdownPurpose, DeltaReason, EngineEvent, ScoreDelta, ScoreTotals},
        lifecycle::{
            AttemptOutcome, EntryPath, InvalidTransition, QuestionEvent, QuestionPhase,
            QuestionStateMachine, Snapshot,
        },
        power_ups::{PowerUpController, PowerUpState},
        scoring::{self, AppliedDelta, Sign},
        wager::{self, WagerRules},
    },
    state::game::{
        Answer, Contestant, ContestantId, PowerUpKind, Question, QuestionId, QuestionStatus,
    },
};

/// Timings and limits applied by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Answer countdown after a won buzz.
    pub answer_time_ms: u64,
    /// Time contestants get to write their finale answer.
    pub finale_answer_ms: u64,
    /// How long a freeze pauses the answer countdown.
    pub freeze_ms: u64,
    /// Freeze is switched off when less than this is left on the answer countdown.
    pub freeze_lockout_ms: u64,
    /// Delay between the reveal and the first tip.
    pub first_tip_delay_ms: u64,
    /// Delay between two tips.
    pub extra_tip_delay_ms: u64,
    /// Delay before buzzing reopens after a wrong answer.
    pub reopen_delay_ms: u64,
    /// How long the last wrong answerer may rewind before the answer is shown.
    pub rewind_grace_ms: u64,
    /// Delay between the reveal and the first buzz window.
    pub buzz_open_delay_ms: u64,
    /// Multiplier for a correct answer after a hijack taken before the reveal.
    pub hijack_bonus: f64,
    /// Wager limits.
    pub wagers: WagerRules,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            answer_time_ms: 6_000,
            finale_answer_ms: 40_000,
            freeze_ms: 40_000,
            freeze_lockout_ms: 1_000,
            first_tip_delay_ms: 4_000,
            extra_tip_delay_ms: 4_000,
            reopen_delay_ms: 4_000,
            rewind_grace_ms: 4_000,
            buzz_open_delay_ms: 500,
            hijack_bonus: scoring::HIJACK_BONUS_MULTIPLIER,
            wagers: WagerRules::default(),
        }
    }
}

/// How a question is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionVariant {
    /// Buzz-in question.
    Standard,
    /// Answered by the turn-holder for a wager.
    DailyDouble,
    /// Every contestant wagers and writes an answer.
    Finale,
}

/// Presenter verdict on the current answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    /// Open answer accepted.
    Correct,
    /// Open answer rejected.
    Incorrect,
    /// Multiple-choice pick by index.
    Choice(usize),
}

/// Everything the engine needs to know about the question being played.
#[derive(Debug, Clone)]
pub struct QuestionSetup {
    /// The question.
    pub question: Question,
    /// Buzz window length, `0` when the presenter closes it.
    pub buzz_time_ms: u64,
    /// One-based round number, used for daily double bounds.
    pub round_number: u32,
}

/// One attempt at answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerAttempt {
    /// Who answers.
    pub contestant: ContestantId,
    /// Question being answered.
    pub question: QuestionId,
    /// Outcome so far.
    pub outcome: AttemptOutcome,
    /// Signed points applied once finalized.
    pub value_applied: i64,
    /// Length of the answer countdown, `0` when there is none.
    pub duration_ms: u64,
    /// Whether the answerer froze the countdown during this attempt.
    pub froze: bool,
}

#[derive(Debug, Clone, Copy)]
struct Hijack {
    contestant: ContestantId,
    bonus: bool,
}

/// Everything needed to put the latest judgment back.
#[derive(Debug, Clone, Copy)]
struct Compensation {
    applied: AppliedDelta,
    attempt: AnswerAttempt,
    eliminated_choice: Option<usize>,
    turn_before: Option<ContestantId>,
    previous_incorrect: Option<AppliedDelta>,
}

/// Live engine for a single question.
///
/// The engine is synchronous and never reads a clock: the coordinator feeds it inputs and
/// calls [`RoundEngine::tick`] at a fixed rate, then drains the resulting events.
#[derive(Debug)]
pub struct RoundEngine {
    question: Question,
    variant: QuestionVariant,
    buzz_time_ms: u64,
    round_number: u32,
    settings: EngineSettings,
    contestants: IndexMap<ContestantId, Contestant>,
    machine: QuestionStateMachine,
    countdown: Countdown<CountdownPurpose>,
    alarms: AlarmSchedule,
    arbiter: BuzzArbiter,
    power_ups: PowerUpController,
    eligible: IndexSet<ContestantId>,
    tips_shown: usize,
    eliminated: Vec<usize>,
    hijack: Option<Hijack>,
    daily_double_wager: Option<(ContestantId, u32)>,
    attempt: Option<AnswerAttempt>,
    last_incorrect: HashMap<ContestantId, AppliedDelta>,
    compensation: Option<Compensation>,
    ledger: Vec<ScoreDelta>,
    finale_queue: VecDeque<ContestantId>,
    answer_revealed: bool,
    window_opened_at_ms: u64,
    conflicted: bool,
    events: Vec<EngineEvent>,
}

impl RoundEngine {
    /// Open `setup.question` for `contestants`. The question starts hidden.
    pub fn new(
        setup: QuestionSetup,
        contestants: IndexMap<ContestantId, Contestant>,
        settings: EngineSettings,
    ) -> Self {
        let QuestionSetup {
            mut question,
            buzz_time_ms,
            round_number,
        } = setup;

        let variant = if question.is_finale {
            QuestionVariant::Finale
        } else if question.is_daily_double {
            QuestionVariant::DailyDouble
        } else {
            QuestionVariant::Standard
        };
        let entry = match variant {
            QuestionVariant::Standard => EntryPath::Standard,
            _ => EntryPath::Forced,
        };
        question.status = QuestionStatus::Active;

        let power_ups = PowerUpController::new(variant == QuestionVariant::Standard, &contestants);
        let eligible: IndexSet<ContestantId> = match variant {
            QuestionVariant::Standard => contestants.keys().copied().collect(),
            _ => IndexSet::new(),
        };

        let mut engine = Self {
            question,
            variant,
            buzz_time_ms,
            round_number,
            settings,
            contestants,
            machine: QuestionStateMachine::new(entry),
            countdown: Countdown::new(),
            alarms: AlarmSchedule::new(),
            arbiter: BuzzArbiter::new(),
            power_ups,
            eligible,
            tips_shown: 0,
            eliminated: Vec::new(),
            hijack: None,
            daily_double_wager: None,
            attempt: None,
            last_incorrect: HashMap::new(),
            compensation: None,
            ledger: Vec::new(),
            finale_queue: VecDeque::new(),
            answer_revealed: false,
            window_opened_at_ms: 0,
            conflicted: false,
            events: Vec::new(),
        };

        engine.events.push(EngineEvent::PhaseChanged {
            question: engine.question.id,
            phase: engine.machine.phase(),
        });
        let candidates: Vec<ContestantId> = engine.eligible.iter().copied().collect();
        for id in candidates {
            engine.enable_power_up(id, PowerUpKind::Hijack);
        }
        info!(question = %engine.question.id, variant = ?variant, "question opened");
        engine
    }

    // ---- queries -------------------------------------------------------------------

    /// The question being played.
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// How the question is played.
    pub fn variant(&self) -> QuestionVariant {
        self.variant
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> QuestionPhase {
        self.machine.phase()
    }

    /// Lifecycle snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    /// Whether the question has closed.
    pub fn is_closed(&self) -> bool {
        self.machine.phase() == QuestionPhase::Closed
    }

    /// Contestants of the game, as this question sees them.
    pub fn contestants(&self) -> &IndexMap<ContestantId, Contestant> {
        &self.contestants
    }

    /// A single contestant.
    pub fn contestant(&self, id: ContestantId) -> Option<&Contestant> {
        self.contestants.get(&id)
    }

    /// Contestants who may still buzz on this question, in order.
    pub fn eligible(&self) -> Vec<ContestantId> {
        self.eligible.iter().copied().collect()
    }

    /// Number of tips shown so far.
    pub fn tips_shown(&self) -> usize {
        self.tips_shown
    }

    /// Choices eliminated by wrong picks.
    pub fn eliminated_choices(&self) -> &[usize] {
        &self.eliminated
    }

    /// Progress of the running countdown.
    pub fn countdown(&self) -> Option<CountdownProgress<CountdownPurpose>> {
        self.countdown.progress()
    }

    /// Power-up state for a contestant.
    pub fn power_up_state(&self, contestant: ContestantId, kind: PowerUpKind) -> PowerUpState {
        self.power_ups.state(contestant, kind)
    }

    /// Whether a pre-reveal hijack bonus is pending.
    pub fn hijack_bonus(&self) -> bool {
        self.hijack.is_some_and(|hijack| hijack.bonus)
    }

    /// The current or latest answer attempt.
    pub fn current_attempt(&self) -> Option<&AnswerAttempt> {
        self.attempt.as_ref()
    }

    /// Buzzes logged on this question.
    pub fn buzz_log(&self) -> &[BuzzEvent] {
        self.arbiter.log()
    }

    /// Whether the presenter can undo the latest judgment.
    pub fn can_undo(&self) -> bool {
        self.compensation.is_some() && self.machine.check(QuestionEvent::Undo).is_ok()
    }

    /// Whether the answer has been shown.
    pub fn answer_revealed(&self) -> bool {
        self.answer_revealed
    }

    /// Daily double wager, once placed.
    pub fn daily_double_wager(&self) -> Option<u32> {
        self.daily_double_wager.map(|(_, amount)| amount)
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Give the question and the contestants back.
    pub fn into_parts(self) -> (Question, IndexMap<ContestantId, Contestant>) {
        (self.question, self.contestants)
    }

    // ---- presenter inputs ----------------------------------------------------------

    /// Show the question.
    pub fn reveal(&mut self) -> Result<(), EngineError> {
        self.guard()?;
        self.machine.check(QuestionEvent::Reveal)?;
        match self.variant {
            QuestionVariant::DailyDouble if self.daily_double_wager.is_none() => {
                return Err(EngineError::NotPermitted(
                    "the daily double wager must be placed before the reveal".into(),
                ));
            }
            QuestionVariant::Finale
                if !self
                    .contestants
                    .values()
                    .any(|contestant| contestant.finale_wager.is_some()) =>
            {
                return Err(EngineError::NotPermitted(
                    "no finale wager has been placed".into(),
                ));
            }
            _ => {}
        }

        self.transition(QuestionEvent::Reveal)?;
        if self.variant == QuestionVariant::Standard && !self.question.tips.is_empty() {
            self.alarms
                .schedule(self.settings.first_tip_delay_ms, Alarm::ShowTip(0));
        }

        match (self.variant, self.hijack, self.daily_double_wager) {
            (QuestionVariant::Standard, Some(Hijack { contestant, .. }), _) => {
                self.arbiter.force_winner(contestant);
                self.transition(QuestionEvent::Assign(contestant))?;
                self.emit_buzz_result(contestant);
                self.open_answer_window(contestant, self.forced_answer_ms());
            }
            (QuestionVariant::Standard, None, _) => {
                self.alarms
                    .schedule(self.settings.buzz_open_delay_ms, Alarm::OpenBuzzWindow);
            }
            (QuestionVariant::DailyDouble, _, Some((contestant, _))) => {
                self.transition(QuestionEvent::Assign(contestant))?;
                self.open_answer_window(contestant, self.forced_answer_ms());
            }
            (QuestionVariant::DailyDouble, _, None) => {}
            (QuestionVariant::Finale, _, _) => {
                self.start_countdown(self.settings.finale_answer_ms, CountdownPurpose::FinaleAnswers);
            }
        }
        Ok(())
    }

    /// Judge the current answer.
    pub fn judge(&mut self, judgment: Judgment) -> Result<AttemptOutcome, EngineError> {
        self.guard()?;
        let QuestionPhase::Answering { contestant } = self.machine.phase() else {
            let outcome = match judgment {
                Judgment::Correct => AttemptOutcome::Correct,
                _ => AttemptOutcome::Incorrect,
            };
            return Err(self.invalid(QuestionEvent::Judge(outcome)));
        };

        let (outcome, eliminated) = match judgment {
            Judgment::Correct => (AttemptOutcome::Correct, None),
            Judgment::Incorrect => (AttemptOutcome::Incorrect, None),
            Judgment::Choice(index) => {
                let Answer::Choices { choices, correct } = &self.question.answer else {
                    return Err(EngineError::NotPermitted(
                        "question is not multiple choice".into(),
                    ));
                };
                if index >= choices.len() {
                    return Err(EngineError::NotPermitted(format!(
                        "choice {index} does not exist"
                    )));
                }
                if self.eliminated.contains(&index) {
                    return Err(EngineError::StaleEvent(format!(
                        "choice {index} was already eliminated"
                    )));
                }
                if index == *correct {
                    (AttemptOutcome::Correct, None)
                } else {
                    (AttemptOutcome::Incorrect, Some(index))
                }
            }
        };

        if let Some(index) = eliminated {
            self.eliminated.push(index);
            self.events.push(EngineEvent::ChoiceEliminated { index });
        }
        let reason = match outcome {
            AttemptOutcome::Correct => DeltaReason::Correct,
            _ => DeltaReason::Incorrect,
        };
        self.resolve(
            contestant,
            outcome,
            QuestionEvent::Judge(outcome),
            reason,
            eliminated,
        )?;
        Ok(outcome)
    }

    /// End a buzz window nobody took.
    pub fn abort(&mut self) -> Result<(), EngineError> {
        self.guard()?;
        if self.variant == QuestionVariant::Finale {
            return Err(self.invalid(QuestionEvent::Abort));
        }
        self.machine.check(QuestionEvent::Abort)?;
        self.close_unanswered(QuestionEvent::Abort)
    }

    /// Put the latest judgment back and reopen the attempt.
    pub fn undo(&mut self) -> Result<(), EngineError> {
        self.guard()?;
        let Some(compensation) = self.compensation else {
            return Err(self.invalid(QuestionEvent::Undo));
        };
        self.machine.check(QuestionEvent::Undo)?;
        self.compensation = None;

        let id = compensation.applied.contestant;
        self.alarms.cancel(Alarm::ReopenBuzzWindow);
        self.alarms.cancel(Alarm::RewindGraceEnds);

        let contestant = self
            .contestants
            .get_mut(&id)
            .ok_or(EngineError::UnknownContestant(id))?;
        scoring::reverse_delta(contestant, &compensation.applied);
        if compensation.attempt.froze {
            self.power_ups.revert(id, contestant, PowerUpKind::Freeze);
        }
        self.emit_score(id, -compensation.applied.points, DeltaReason::Undo);
        self.forget_ledger_entry(id, compensation.attempt.outcome);

        if compensation.attempt.outcome == AttemptOutcome::Correct {
            self.restore_turn(compensation.turn_before);
        }
        self.last_incorrect.remove(&id);
        if let Some(previous) = compensation.previous_incorrect {
            self.last_incorrect.insert(id, previous);
        }
        if let Some(index) = compensation.eliminated_choice {
            self.eliminated.retain(|eliminated| *eliminated != index);
        }
        self.disable_power_ups_where(|owner, kind| owner == id && kind == PowerUpKind::Rewind);

        if self.answer_revealed {
            self.answer_revealed = false;
            if self.variant == QuestionVariant::Standard && self.tips_shown < self.question.tips.len()
            {
                self.alarms
                    .schedule(self.settings.extra_tip_delay_ms, Alarm::ShowTip(self.tips_shown));
            }
        }

        self.transition(QuestionEvent::Undo)?;
        info!(question = %self.question.id, contestant = %id, "judgment undone");
        self.open_answer_window(id, compensation.attempt.duration_ms);
        Ok(())
    }

    /// Close the question, or start judging when finale answers are still being collected.
    pub fn advance(&mut self) -> Result<(), EngineError> {
        self.guard()?;
        if self.variant == QuestionVariant::Finale && self.machine.phase() == QuestionPhase::Revealed
        {
            return self.start_finale_judging();
        }
        self.machine.check(QuestionEvent::Advance)?;
        self.close()
    }

    // ---- contestant inputs ---------------------------------------------------------

    /// Submit a buzz. Buzzes outside an open window are rejected, not errors.
    pub fn buzz(&mut self, contestant: ContestantId) -> Result<BuzzOutcome, EngineError> {
        self.guard()?;
        self.require_contestant(contestant)?;
        // Late buzzes on a decided window are still logged for rewinds.
        let window_live = match self.machine.phase() {
            QuestionPhase::BuzzOpen => true,
            QuestionPhase::Answering { .. } => self.arbiter.winner().is_some(),
            _ => false,
        };
        if !window_live {
            debug!(%contestant, phase = ?self.machine.phase(), "buzz outside an open window");
            return Ok(BuzzOutcome::Rejected(BuzzRejection::WindowClosed));
        }

        let now = self.alarms.now_ms();
        let outcome = self.arbiter.submit_buzz(contestant, now);
        match outcome {
            BuzzOutcome::Rejected(
                rejection @ (BuzzRejection::WindowClosed
                | BuzzRejection::NotEligible
                | BuzzRejection::Duplicate),
            ) => {
                debug!(%contestant, ?rejection, "buzz rejected");
                return Ok(outcome);
            }
            BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided) | BuzzOutcome::Winner => {}
        }

        if let Some(entry) = self.contestants.get_mut(&contestant) {
            entry.buzzes += 1;
        }
        self.events.push(EngineEvent::BuzzReceived {
            contestant,
            after_ms: now.saturating_sub(self.window_opened_at_ms),
        });

        if outcome == BuzzOutcome::Winner {
            self.award_buzz(contestant)?;
        }
        Ok(outcome)
    }

    /// Use a power-up.
    pub fn use_power_up(
        &mut self,
        contestant: ContestantId,
        kind: PowerUpKind,
    ) -> Result<(), EngineError> {
        self.guard()?;
        self.require_contestant(contestant)?;
        if self.power_ups.state(contestant, kind) == PowerUpState::Used {
            return Err(EngineError::StaleEvent(format!(
                "power-up {kind:?} already used by {contestant}"
            )));
        }
        if !self.power_up_applicable(contestant, kind) {
            return Err(EngineError::PowerUpUnavailable {
                contestant,
                power_up: kind,
            });
        }

        let owner = self
            .contestants
            .get_mut(&contestant)
            .ok_or(EngineError::UnknownContestant(contestant))?;
        self.power_ups.use_power_up(contestant, owner, kind)?;
        info!(question = %self.question.id, %contestant, power_up = ?kind, "power-up used");
        self.events.push(EngineEvent::PowerUpUsed {
            contestant,
            power_up: kind,
        });
        self.disable_all_power_ups();

        match kind {
            PowerUpKind::Freeze => {
                self.apply_freeze(contestant);
                Ok(())
            }
            PowerUpKind::Rewind => self.apply_rewind(contestant),
            PowerUpKind::Hijack => self.apply_hijack(contestant),
        }
    }

    /// Place a daily double or finale wager.
    pub fn wager(&mut self, contestant: ContestantId, amount: i64) -> Result<u32, EngineError> {
        self.guard()?;
        let entry = self
            .contestants
            .get(&contestant)
            .ok_or(EngineError::UnknownContestant(contestant))?;
        if self.variant == QuestionVariant::Standard {
            return Err(EngineError::NotPermitted(
                "this question takes no wager".into(),
            ));
        }
        if self.machine.phase() != QuestionPhase::Hidden {
            return Err(EngineError::StaleEvent("wagers are closed".into()));
        }

        let accepted = match self.variant {
            QuestionVariant::DailyDouble => {
                if !entry.has_turn {
                    return Err(EngineError::NotPermitted(format!(
                        "contestant {contestant} does not hold the turn"
                    )));
                }
                if self.daily_double_wager.is_some() {
                    return Err(EngineError::StaleEvent(
                        "daily double wager already placed".into(),
                    ));
                }
                let bounds = wager::daily_double_bounds(
                    entry.score,
                    self.round_number,
                    &self.settings.wagers,
                );
                let accepted = bounds.check(amount)?;
                self.daily_double_wager = Some((contestant, accepted));
                accepted
            }
            _ => {
                let bounds = wager::finale_bounds(entry.score, &self.settings.wagers);
                let accepted = bounds.check(amount)?;
                if let Some(entry) = self.contestants.get_mut(&contestant) {
                    entry.finale_wager = Some(accepted);
                }
                accepted
            }
        };

        info!(question = %self.question.id, %contestant, amount = accepted, "wager accepted");
        self.events.push(EngineEvent::WagerAccepted {
            contestant,
            amount: accepted,
        });
        Ok(accepted)
    }

    /// Record a finale answer while the finale countdown runs.
    pub fn finale_answer(
        &mut self,
        contestant: ContestantId,
        answer: String,
    ) -> Result<(), EngineError> {
        self.guard()?;
        let entry = self
            .contestants
            .get_mut(&contestant)
            .ok_or(EngineError::UnknownContestant(contestant))?;
        if self.variant != QuestionVariant::Finale {
            return Err(EngineError::NotPermitted("this is not the finale".into()));
        }
        if self.machine.phase() != QuestionPhase::Revealed
            || self.countdown.tag() != Some(CountdownPurpose::FinaleAnswers)
        {
            return Err(EngineError::StaleEvent("finale answers are closed".into()));
        }
        if entry.finale_wager.is_none() {
            return Err(EngineError::NotPermitted(format!(
                "contestant {contestant} placed no finale wager"
            )));
        }

        entry.finale_answer = Some(answer.trim().to_owned());
        self.events
            .push(EngineEvent::FinaleAnswerReceived { contestant });
        Ok(())
    }

    // ---- clock ---------------------------------------------------------------------

    /// Advance the engine clock by `delta_ms`.
    pub fn tick(&mut self, delta_ms: u64) {
        if self.conflicted || self.is_closed() {
            return;
        }

        let due = self.alarms.advance(delta_ms);

        match self.countdown.tick(delta_ms) {
            Some(purpose) => {
                self.events.push(EngineEvent::CountdownStopped { purpose });
                if let Err(err) = self.on_countdown_expired(purpose) {
                    warn!(error = %err, ?purpose, "countdown expiry could not be applied");
                }
            }
            None => {
                if let Some(progress) = self.countdown.progress().filter(|p| !p.paused) {
                    self.events.push(EngineEvent::CountdownTick {
                        purpose: progress.tag,
                        elapsed_ms: progress.elapsed_ms,
                        duration_ms: progress.duration_ms,
                    });
                }
            }
        }
        self.enforce_freeze_lockout();

        for alarm in due {
            if let Err(err) = self.on_alarm(alarm) {
                warn!(error = %err, ?alarm, "alarm could not be applied");
            }
        }
    }

    // ---- internals -----------------------------------------------------------------

    fn guard(&self) -> Result<(), EngineError> {
        if self.conflicted {
            return Err(EngineError::ArbitrationConflict(format!(
                "question {} halted after an arbitration conflict",
                self.question.id
            )));
        }
        Ok(())
    }

    fn require_contestant(&self, id: ContestantId) -> Result<(), EngineError> {
        if self.contestants.contains_key(&id) {
            Ok(())
        } else {
            Err(EngineError::UnknownContestant(id))
        }
    }

    fn invalid(&self, event: QuestionEvent) -> EngineError {
        match self.machine.check(event) {
            Err(invalid) => invalid.into(),
            Ok(_) => EngineError::InvalidTransition(InvalidTransition {
                from: self.machine.phase(),
                event,
            }),
        }
    }

    fn transition(&mut self, event: QuestionEvent) -> Result<QuestionPhase, EngineError> {
        let phase = self.machine.apply(event)?;
        debug!(question = %self.question.id, ?event, ?phase, "question transition");
        self.events.push(EngineEvent::PhaseChanged {
            question: self.question.id,
            phase,
        });
        Ok(phase)
    }

    fn forced_answer_ms(&self) -> u64 {
        if self.buzz_time_ms > 0 {
            self.buzz_time_ms
        } else {
            self.settings.answer_time_ms
        }
    }

    fn start_countdown(&mut self, duration_ms: u64, purpose: CountdownPurpose) {
        if let Some(previous) = self.countdown.start(duration_ms, purpose) {
            self.events
                .push(EngineEvent::CountdownStopped { purpose: previous });
        }
        self.events.push(EngineEvent::CountdownStarted {
            purpose,
            duration_ms,
        });
    }

    fn stop_countdown(&mut self) {
        if let Some(purpose) = self.countdown.stop() {
            self.events.push(EngineEvent::CountdownStopped { purpose });
        }
        if self.alarms.cancel(Alarm::FreezeEnds) > 0 {
            self.events.push(EngineEvent::FreezeEnded);
        }
    }

    fn enable_power_up(&mut self, id: ContestantId, kind: PowerUpKind) -> bool {
        let Some(contestant) = self.contestants.get_mut(&id) else {
            return false;
        };
        match self.power_ups.enable(id, contestant, kind) {
            Ok(true) => {
                self.events.push(EngineEvent::PowerUpEnabled {
                    contestant: id,
                    power_up: kind,
                });
                true
            }
            Ok(false) => true,
            Err(_) => false,
        }
    }

    fn disable_power_ups_where(&mut self, predicate: impl Fn(ContestantId, PowerUpKind) -> bool) {
        let mut disabled: IndexMap<ContestantId, Vec<PowerUpKind>> = IndexMap::new();
        for (id, kind) in self.power_ups.enabled() {
            if !predicate(id, kind) {
                continue;
            }
            if let Some(contestant) = self.contestants.get_mut(&id) {
                if self.power_ups.disable(id, contestant, kind) {
                    disabled.entry(id).or_default().push(kind);
                }
            }
        }
        for (contestant, power_ups) in disabled {
            self.events.push(EngineEvent::PowerUpsDisabled {
                contestant,
                power_ups,
            });
        }
    }

    fn disable_all_power_ups(&mut self) {
        self.disable_power_ups_where(|_, _| true);
    }

    fn power_up_applicable(&self, contestant: ContestantId, kind: PowerUpKind) -> bool {
        let phase = self.machine.phase();
        match kind {
            PowerUpKind::Freeze => {
                matches!(phase, QuestionPhase::Answering { contestant: answering } if answering == contestant)
                    && self.countdown.tag() == Some(CountdownPurpose::Answer)
                    && !self.countdown.is_paused()
            }
            PowerUpKind::Rewind => {
                self.last_incorrect.contains_key(&contestant)
                    && !self.answer_revealed
                    && !matches!(phase, QuestionPhase::Closed)
                    && !matches!(phase, QuestionPhase::Answering { contestant: answering } if answering == contestant)
            }
            PowerUpKind::Hijack => {
                self.eligible.contains(&contestant)
                    && match phase {
                        QuestionPhase::Hidden | QuestionPhase::Revealed | QuestionPhase::BuzzOpen => {
                            true
                        }
                        QuestionPhase::Answering { contestant: answering } => {
                            answering != contestant
                        }
                        _ => false,
                    }
            }
        }
    }

    fn emit_score(&mut self, id: ContestantId, points: i64, reason: DeltaReason) {
        let Some(contestant) = self.contestants.get(&id) else {
            return;
        };
        let totals = ScoreTotals {
            score: contestant.score,
            hits: contestant.hits,
            misses: contestant.misses,
        };
        self.events.push(EngineEvent::ScoreDelta {
            contestant: id,
            points,
            reason,
        });
        self.events.push(EngineEvent::ScoreChanged {
            contestant: id,
            totals,
        });
    }

    fn emit_buzz_result(&mut self, winner: ContestantId) {
        let losers = self
            .contestants
            .keys()
            .filter(|id| **id != winner)
            .copied()
            .collect();
        self.events
            .push(EngineEvent::BuzzWinner { contestant: winner });
        self.events
            .push(EngineEvent::BuzzLoser { contestants: losers });
    }

    fn forget_ledger_entry(&mut self, contestant: ContestantId, outcome: AttemptOutcome) {
        if let Some(position) = self
            .ledger
            .iter()
            .rposition(|delta| delta.contestant == contestant && delta.outcome == outcome)
        {
            self.ledger.remove(position);
        }
    }

    fn give_turn(&mut self, holder: ContestantId) -> Option<ContestantId> {
        let previous = self
            .contestants
            .iter()
            .find_map(|(id, contestant)| contestant.has_turn.then_some(*id));
        for (id, contestant) in self.contestants.iter_mut() {
            contestant.has_turn = *id == holder;
        }
        previous
    }

    fn restore_turn(&mut self, holder: Option<ContestantId>) {
        for (id, contestant) in self.contestants.iter_mut() {
            contestant.has_turn = Some(*id) == holder;
        }
    }

    fn open_answer_window(&mut self, contestant: ContestantId, duration_ms: u64) {
        self.eligible.shift_remove(&contestant);
        self.attempt = Some(AnswerAttempt {
            contestant,
            question: self.question.id,
            outcome: AttemptOutcome::Pending,
            value_applied: 0,
            duration_ms,
            froze: false,
        });
        self.disable_power_ups_where(|id, kind| id == contestant && kind == PowerUpKind::Hijack);
        if duration_ms > 0 {
            self.start_countdown(duration_ms, CountdownPurpose::Answer);
            if duration_ms > self.settings.freeze_lockout_ms {
                self.enable_power_up(contestant, PowerUpKind::Freeze);
            }
        }
    }

    fn open_buzz_window(&mut self, event: QuestionEvent) -> Result<(), EngineError> {
        self.transition(event)?;
        self.compensation = None;
        self.attempt = None;
        self.arbiter.open_window(self.eligible.clone());
        self.window_opened_at_ms = self.alarms.now_ms();
        self.events.push(EngineEvent::BuzzEnabled {
            eligible: self.eligible(),
        });
        if self.buzz_time_ms > 0 {
            self.start_countdown(self.buzz_time_ms, CountdownPurpose::Buzz);
        }
        Ok(())
    }

    fn award_buzz(&mut self, contestant: ContestantId) -> Result<(), EngineError> {
        if self.arbiter.winner() != Some(contestant)
            || self.machine.check(QuestionEvent::BuzzWon(contestant)).is_err()
        {
            self.conflicted = true;
            error!(
                question = %self.question.id,
                %contestant,
                phase = ?self.machine.phase(),
                "buzz winner cannot be reconciled with the question state"
            );
            return Err(EngineError::ArbitrationConflict(format!(
                "winning buzz from {contestant} arrived in phase {:?}",
                self.machine.phase()
            )));
        }

        self.transition(QuestionEvent::BuzzWon(contestant))?;
        self.stop_countdown();
        self.emit_buzz_result(contestant);
        self.open_answer_window(contestant, self.settings.answer_time_ms);
        Ok(())
    }

    fn delta_for(&self, contestant: ContestantId, outcome: AttemptOutcome) -> (i64, Sign) {
        let sign = match outcome {
            AttemptOutcome::Correct => Sign::Award,
            _ => Sign::Deduct,
        };
        let base = match self.variant {
            QuestionVariant::Finale => {
                let wager = self
                    .contestants
                    .get(&contestant)
                    .and_then(|entry| entry.finale_wager)
                    .unwrap_or(0);
                return (i64::from(wager), sign);
            }
            QuestionVariant::DailyDouble => self.daily_double_wager().unwrap_or(self.question.value),
            QuestionVariant::Standard => self.question.value,
        };

        match sign {
            Sign::Award => {
                let multiplier = self
                    .hijack
                    .filter(|hijack| hijack.bonus && hijack.contestant == contestant)
                    .map(|_| self.settings.hijack_bonus);
                let delta = scoring::correct_delta_with_multiplier(
                    base,
                    self.tips_shown as u32,
                    self.eliminated.len() as u32,
                    self.question.answer.choice_count() as u32,
                    multiplier,
                );
                (delta, sign)
            }
            Sign::Deduct => (scoring::compute_incorrect_delta(base), sign),
        }
    }

    fn resolve(
        &mut self,
        contestant: ContestantId,
        outcome: AttemptOutcome,
        event: QuestionEvent,
        reason: DeltaReason,
        eliminated_choice: Option<usize>,
    ) -> Result<(), EngineError> {
        self.transition(event)?;
        self.stop_countdown();

        let (delta, sign) = self.delta_for(contestant, outcome);
        let entry = self
            .contestants
            .get_mut(&contestant)
            .ok_or(EngineError::UnknownContestant(contestant))?;
        let applied = scoring::apply_delta(contestant, entry, delta, sign);
        self.emit_score(contestant, applied.points, reason);
        self.ledger.push(ScoreDelta {
            question: self.question.id,
            contestant,
            points: applied.points,
            outcome,
        });

        let attempt = AnswerAttempt {
            outcome,
            value_applied: applied.points,
            ..self.attempt.unwrap_or(AnswerAttempt {
                contestant,
                question: self.question.id,
                outcome: AttemptOutcome::Pending,
                value_applied: 0,
                duration_ms: self.settings.answer_time_ms,
                froze: false,
            })
        };
        self.attempt = Some(attempt);
        info!(
            question = %self.question.id,
            %contestant,
            ?outcome,
            points = applied.points,
            "answer resolved"
        );

        let turn_before = match outcome {
            AttemptOutcome::Correct => self.give_turn(contestant),
            _ => None,
        };
        let previous_incorrect = self.last_incorrect.remove(&contestant);
        if outcome == AttemptOutcome::Incorrect {
            self.last_incorrect.insert(contestant, applied);
        }

        if self.variant == QuestionVariant::Finale {
            self.compensation = None;
            return self.next_finalist();
        }

        self.compensation = Some(Compensation {
            applied,
            attempt,
            eliminated_choice,
            turn_before,
            previous_incorrect,
        });

        match outcome {
            AttemptOutcome::Correct => {
                self.events.push(EngineEvent::BuzzDisabled);
                self.reveal_answer();
            }
            _ => {
                self.disable_power_ups_where(|id, kind| {
                    id == contestant && kind == PowerUpKind::Freeze
                });
                self.after_incorrect(contestant);
            }
        }
        Ok(())
    }

    fn after_incorrect(&mut self, contestant: ContestantId) {
        let holds_rewind = self.enable_power_up(contestant, PowerUpKind::Rewind);
        if self.variant == QuestionVariant::Standard && !self.eligible.is_empty() {
            self.alarms
                .schedule(self.settings.reopen_delay_ms, Alarm::ReopenBuzzWindow);
        } else if holds_rewind {
            self.alarms
                .schedule(self.settings.rewind_grace_ms, Alarm::RewindGraceEnds);
        } else {
            self.events.push(EngineEvent::BuzzDisabled);
            self.reveal_answer();
        }
    }

    fn reveal_answer(&mut self) {
        if self.answer_revealed {
            return;
        }
        self.answer_revealed = true;
        self.alarms.cancel_where(|alarm| {
            matches!(
                alarm,
                Alarm::ShowTip(_) | Alarm::ReopenBuzzWindow | Alarm::RewindGraceEnds
            )
        });
        self.disable_all_power_ups();
        self.events.push(EngineEvent::AnswerRevealed {
            answer: self.question.answer.canonical().to_owned(),
        });
    }

    fn close_unanswered(&mut self, event: QuestionEvent) -> Result<(), EngineError> {
        self.transition(event)?;
        self.alarms.cancel(Alarm::OpenBuzzWindow);
        self.stop_countdown();
        self.arbiter.close_window();
        self.attempt = None;
        self.compensation = None;
        info!(question = %self.question.id, ?event, "nobody answered");
        self.events.push(EngineEvent::BuzzDisabled);
        self.reveal_answer();
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.transition(QuestionEvent::Advance)?;
        self.alarms.clear();
        self.stop_countdown();
        self.arbiter.close_window();
        self.compensation = None;
        self.disable_all_power_ups();
        self.question.status = QuestionStatus::Resolved;
        self.events.push(EngineEvent::BuzzDisabled);
        info!(question = %self.question.id, deltas = self.ledger.len(), "question closed");
        self.events.push(EngineEvent::QuestionClosed {
            question: self.question.id,
            deltas: self.ledger.clone(),
        });
        Ok(())
    }

    fn apply_freeze(&mut self, contestant: ContestantId) {
        if !self.countdown.pause() {
            return;
        }
        self.alarms
            .schedule(self.settings.freeze_ms, Alarm::FreezeEnds);
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.froze = true;
        }
        self.events.push(EngineEvent::FreezeStarted {
            contestant,
            duration_ms: self.settings.freeze_ms,
        });
    }

    fn apply_rewind(&mut self, contestant: ContestantId) -> Result<(), EngineError> {
        let applied = self
            .last_incorrect
            .remove(&contestant)
            .ok_or(EngineError::PowerUpUnavailable {
                contestant,
                power_up: PowerUpKind::Rewind,
            })?;

        self.alarms.cancel(Alarm::ReopenBuzzWindow);
        self.alarms.cancel(Alarm::RewindGraceEnds);
        self.stop_countdown();
        self.arbiter.close_window();
        self.attempt = None;
        self.compensation = None;

        let entry = self
            .contestants
            .get_mut(&contestant)
            .ok_or(EngineError::UnknownContestant(contestant))?;
        scoring::reverse_delta(entry, &applied);
        self.emit_score(contestant, -applied.points, DeltaReason::Rewind);
        self.forget_ledger_entry(contestant, AttemptOutcome::Incorrect);

        let replayed = self.arbiter.replay_after(contestant);
        for id in &replayed {
            self.eligible.shift_remove(id);
        }
        self.eligible.extend(replayed);
        self.events.push(EngineEvent::BuzzDisabled);
        self.transition(QuestionEvent::Assign(contestant))?;
        self.open_answer_window(contestant, self.settings.answer_time_ms);
        Ok(())
    }

    fn apply_hijack(&mut self, contestant: ContestantId) -> Result<(), EngineError> {
        let phase = self.machine.phase();
        self.eligible.clear();
        self.eligible.insert(contestant);

        if phase == QuestionPhase::Hidden {
            self.hijack = Some(Hijack {
                contestant,
                bonus: true,
            });
            self.machine.force_entry();
            return Ok(());
        }

        self.hijack = Some(Hijack {
            contestant,
            bonus: false,
        });
        self.alarms.cancel(Alarm::OpenBuzzWindow);
        self.stop_countdown();
        self.attempt = None;
        self.arbiter.force_winner(contestant);
        self.transition(QuestionEvent::Assign(contestant))?;
        self.emit_buzz_result(contestant);
        let duration = match phase {
            QuestionPhase::Revealed => self.forced_answer_ms(),
            _ => self.settings.answer_time_ms,
        };
        self.open_answer_window(contestant, duration);
        Ok(())
    }

    fn start_finale_judging(&mut self) -> Result<(), EngineError> {
        self.stop_countdown();
        self.finale_queue = self
            .contestants
            .iter()
            .filter(|(_, contestant)| contestant.finale_wager.is_some_and(|wager| wager > 0))
            .map(|(id, _)| *id)
            .collect();
        info!(question = %self.question.id, finalists = self.finale_queue.len(), "finale judging started");
        self.next_finalist()
    }

    fn next_finalist(&mut self) -> Result<(), EngineError> {
        let Some(contestant) = self.finale_queue.pop_front() else {
            self.reveal_answer();
            return self.close();
        };

        self.transition(QuestionEvent::Assign(contestant))?;
        let (answer, wager) = self
            .contestants
            .get(&contestant)
            .map(|entry| (entry.finale_answer.clone(), entry.finale_wager.unwrap_or(0)))
            .unwrap_or((None, 0));
        self.events.push(EngineEvent::FinaleAnswerShown {
            contestant,
            answer,
            wager,
        });
        self.open_answer_window(contestant, 0);
        Ok(())
    }

    fn enforce_freeze_lockout(&mut self) {
        let QuestionPhase::Answering { contestant } = self.machine.phase() else {
            return;
        };
        if self.countdown.tag() != Some(CountdownPurpose::Answer) || self.countdown.is_paused() {
            return;
        }
        let Some(remaining) = self.countdown.remaining_ms() else {
            return;
        };
        if remaining <= self.settings.freeze_lockout_ms
            && self.power_ups.is_enabled(contestant, PowerUpKind::Freeze)
        {
            self.disable_power_ups_where(|id, kind| id == contestant && kind == PowerUpKind::Freeze);
        }
    }

    fn on_countdown_expired(&mut self, purpose: CountdownPurpose) -> Result<(), EngineError> {
        match (purpose, self.machine.phase()) {
            (CountdownPurpose::Buzz, QuestionPhase::BuzzOpen) => {
                self.close_unanswered(QuestionEvent::BuzzTimedOut)
            }
            (CountdownPurpose::Answer, QuestionPhase::Answering { contestant }) => self.resolve(
                contestant,
                AttemptOutcome::Incorrect,
                QuestionEvent::AnswerTimedOut,
                DeltaReason::AnswerTimedOut,
                None,
            ),
            (CountdownPurpose::FinaleAnswers, QuestionPhase::Revealed) => {
                self.start_finale_judging()
            }
            (purpose, phase) => {
                debug!(?purpose, ?phase, "ignoring stale countdown expiry");
                Ok(())
            }
        }
    }

    fn on_alarm(&mut self, alarm: Alarm) -> Result<(), EngineError> {
        let phase = self.machine.phase();
        match alarm {
            Alarm::OpenBuzzWindow if phase == QuestionPhase::Revealed => {
                self.open_buzz_window(QuestionEvent::OpenBuzzWindow)
            }
            Alarm::ReopenBuzzWindow
                if matches!(
                    phase,
                    QuestionPhase::Resolved {
                        outcome: AttemptOutcome::Incorrect,
                        ..
                    }
                ) =>
            {
                self.open_buzz_window(QuestionEvent::ReopenBuzzWindow)
            }
            Alarm::ShowTip(index) => {
                self.show_tip(index);
                Ok(())
            }
            Alarm::FreezeEnds if matches!(phase, QuestionPhase::Answering { .. }) => {
                if self.countdown.resume() {
                    self.events.push(EngineEvent::FreezeEnded);
                }
                Ok(())
            }
            Alarm::RewindGraceEnds
                if matches!(
                    phase,
                    QuestionPhase::Resolved {
                        outcome: AttemptOutcome::Incorrect,
                        ..
                    }
                ) =>
            {
                self.events.push(EngineEvent::BuzzDisabled);
                self.reveal_answer();
                Ok(())
            }
            alarm => {
                debug!(?alarm, ?phase, "ignoring stale alarm");
                Ok(())
            }
        }
    }

    fn show_tip(&mut self, index: usize) {
        let phase = self.machine.phase();
        let stale = self.answer_revealed
            || index < self.tips_shown
            || index >= self.question.tips.len()
            || matches!(
                phase,
                QuestionPhase::Hidden
                    | QuestionPhase::Closed
                    | QuestionPhase::Resolved {
                        outcome: AttemptOutcome::Correct | AttemptOutcome::TimedOut,
                        ..
                    }
            );
        if stale {
            debug!(index, ?phase, "ignoring stale tip");
            return;
        }

        if matches!(phase, QuestionPhase::Answering { .. }) {
            self.alarms
                .schedule(self.settings.extra_tip_delay_ms, Alarm::ShowTip(index));
            return;
        }

        self.tips_shown = index + 1;
        self.events.push(EngineEvent::TipRevealed {
            index,
            tip: self.question.tips[index].clone(),
        });
        if index + 1 < self.question.tips.len() {
            self.alarms
                .schedule(self.settings.extra_tip_delay_ms, Alarm::ShowTip(index + 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn question(value: u32, tips: &[&str]) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: "Capital of France?".into(),
            answer: Answer::Open("Paris".into()),
            value,
            tips: tips.iter().map(|tip| tip.to_string()).collect(),
            media: None,
            buzz_time_s: None,
            is_daily_double: false,
            is_finale: false,
            status: QuestionStatus::Pending,
        }
    }

    fn engine_for(question: Question, count: usize) -> (RoundEngine, Vec<ContestantId>) {
        let ids: Vec<ContestantId> = (0..count).map(|_| Uuid::new_v4()).collect();
        let contestants = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, Contestant::new(format!("c{i}"), "#00ff00".into(), true)))
            .collect();
        let setup = QuestionSetup {
            question,
            buzz_time_ms: 10_000,
            round_number: 1,
        };
        (
            RoundEngine::new(setup, contestants, EngineSettings::default()),
            ids,
        )
    }

    fn open_buzzing(engine: &mut RoundEngine) {
        engine.reveal().unwrap();
        engine.tick(500);
        assert_eq!(engine.phase(), QuestionPhase::BuzzOpen);
    }

    #[test]
    fn first_buzz_wins_and_late_buzzes_are_logged() {
        let (mut engine, c) = engine_for(question(200, &[]), 3);
        open_buzzing(&mut engine);

        assert_eq!(engine.buzz(c[1]), Ok(BuzzOutcome::Winner));
        assert_eq!(
            engine.buzz(c[0]),
            Ok(BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided))
        );
        assert_eq!(engine.phase(), QuestionPhase::Answering { contestant: c[1] });
        assert_eq!(engine.buzz_log().len(), 2);
        assert_eq!(engine.contestant(c[0]).unwrap().buzzes, 1);
    }

    #[test]
    fn buzz_before_the_window_is_rejected() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        engine.reveal().unwrap();
        assert_eq!(
            engine.buzz(c[0]),
            Ok(BuzzOutcome::Rejected(BuzzRejection::WindowClosed))
        );
        assert!(engine.buzz_log().is_empty());
    }

    #[test]
    fn tip_halves_the_award() {
        let (mut engine, c) = engine_for(question(200, &["European capital"]), 2);
        engine.reveal().unwrap();
        engine.tick(4_000);
        assert_eq!(engine.tips_shown(), 1);

        engine.buzz(c[0]).unwrap();
        assert_eq!(engine.judge(Judgment::Correct), Ok(AttemptOutcome::Correct));
        let winner = engine.contestant(c[0]).unwrap();
        assert_eq!(winner.score, 100);
        assert!(winner.has_turn);
        assert!(engine.answer_revealed());
    }

    #[test]
    fn wrong_answer_reopens_for_the_others() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        open_buzzing(&mut engine);
        engine.buzz(c[0]).unwrap();
        engine.judge(Judgment::Incorrect).unwrap();
        assert_eq!(engine.contestant(c[0]).unwrap().score, -200);

        engine.tick(4_000);
        assert_eq!(engine.phase(), QuestionPhase::BuzzOpen);
        assert_eq!(engine.eligible(), vec![c[1]]);
        assert_eq!(
            engine.buzz(c[0]),
            Ok(BuzzOutcome::Rejected(BuzzRejection::NotEligible))
        );
    }

    #[test]
    fn answer_countdown_expiry_counts_as_wrong() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        open_buzzing(&mut engine);
        engine.buzz(c[0]).unwrap();
        engine.tick(6_000);

        assert_eq!(
            engine.phase(),
            QuestionPhase::Resolved {
                outcome: AttemptOutcome::Incorrect,
                contestant: Some(c[0])
            }
        );
        let late = engine.contestant(c[0]).unwrap();
        assert_eq!((late.score, late.misses), (-200, 1));
    }

    #[test]
    fn undo_puts_a_correct_judgment_back() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        open_buzzing(&mut engine);
        engine.buzz(c[0]).unwrap();
        engine.judge(Judgment::Correct).unwrap();
        assert!(engine.can_undo());

        engine.undo().unwrap();
        let restored = engine.contestant(c[0]).unwrap();
        assert_eq!((restored.score, restored.hits, restored.has_turn), (0, 0, false));
        assert_eq!(engine.phase(), QuestionPhase::Answering { contestant: c[0] });
        assert_eq!(
            engine.countdown().map(|progress| progress.tag),
            Some(CountdownPurpose::Answer)
        );
        assert!(!engine.can_undo());
        assert!(!engine.answer_revealed());
    }

    #[test]
    fn freeze_pauses_the_answer_countdown() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        open_buzzing(&mut engine);
        engine.buzz(c[0]).unwrap();
        assert_eq!(
            engine.power_up_state(c[0], PowerUpKind::Freeze),
            PowerUpState::Enabled
        );

        engine.use_power_up(c[0], PowerUpKind::Freeze).unwrap();
        engine.tick(10_000);
        assert_eq!(engine.phase(), QuestionPhase::Answering { contestant: c[0] });
        assert!(engine.countdown().is_some_and(|progress| progress.paused));
        assert!(matches!(
            engine.use_power_up(c[0], PowerUpKind::Freeze),
            Err(EngineError::StaleEvent(_))
        ));
    }

    #[test]
    fn hijack_before_reveal_earns_the_bonus() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        engine.use_power_up(c[1], PowerUpKind::Hijack).unwrap();
        assert!(engine.hijack_bonus());
        assert_eq!(
            engine.use_power_up(c[0], PowerUpKind::Hijack),
            Err(EngineError::PowerUpUnavailable {
                contestant: c[0],
                power_up: PowerUpKind::Hijack
            })
        );

        engine.reveal().unwrap();
        assert_eq!(engine.phase(), QuestionPhase::Answering { contestant: c[1] });
        engine.judge(Judgment::Correct).unwrap();
        assert_eq!(engine.contestant(c[1]).unwrap().score, 300);
    }

    #[test]
    fn rewind_refunds_and_replays_later_buzzers() {
        let (mut engine, c) = engine_for(question(200, &[]), 3);
        open_buzzing(&mut engine);
        engine.buzz(c[0]).unwrap();
        engine.buzz(c[1]).unwrap();
        engine.buzz(c[2]).unwrap();
        engine.judge(Judgment::Incorrect).unwrap();

        engine.use_power_up(c[0], PowerUpKind::Rewind).unwrap();
        let rewound = engine.contestant(c[0]).unwrap();
        assert_eq!((rewound.score, rewound.misses), (0, 0));
        assert_eq!(engine.phase(), QuestionPhase::Answering { contestant: c[0] });
        assert_eq!(engine.eligible(), vec![c[1], c[2]]);
    }

    #[test]
    fn eliminated_choice_reduces_the_award() {
        let mut q = question(200, &[]);
        q.answer = Answer::Choices {
            choices: vec!["Lyon".into(), "Paris".into(), "Nice".into(), "Lille".into()],
            correct: 1,
        };
        let (mut engine, c) = engine_for(q, 2);
        open_buzzing(&mut engine);
        engine.buzz(c[0]).unwrap();
        assert_eq!(engine.judge(Judgment::Choice(0)), Ok(AttemptOutcome::Incorrect));
        assert_eq!(engine.eliminated_choices(), &[0]);

        engine.tick(4_000);
        engine.buzz(c[1]).unwrap();
        assert!(matches!(
            engine.judge(Judgment::Choice(0)),
            Err(EngineError::StaleEvent(_))
        ));
        assert_eq!(engine.judge(Judgment::Choice(1)), Ok(AttemptOutcome::Correct));
        assert_eq!(engine.contestant(c[1]).unwrap().score, 150);
    }

    #[test]
    fn abort_closes_without_scoring() {
        let (mut engine, c) = engine_for(question(200, &[]), 2);
        open_buzzing(&mut engine);
        engine.abort().unwrap();
        assert_eq!(
            engine.phase(),
            QuestionPhase::Resolved {
                outcome: AttemptOutcome::TimedOut,
                contestant: None
            }
        );
        assert!(engine.undo().is_err());

        engine.advance().unwrap();
        assert!(engine.is_closed());
        assert!(c.iter().all(|id| engine.contestant(*id).unwrap().score == 0));
        let closed = engine
            .drain_events()
            .into_iter()
            .find_map(|event| match event {
                EngineEvent::QuestionClosed { deltas, .. } => Some(deltas),
                _ => None,
            })
            .unwrap();
        assert!(closed.is_empty());
    }
}
