use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        presenter::GameSnapshot,
        sse::{
            AnswerRevealedEvent, BuzzEnabledEvent, BuzzLosersEvent, BuzzReceivedEvent,
            BuzzWinnerEvent, ChoiceEliminatedEvent, CountdownEvent, CountdownStoppedEvent,
            EmptyEvent, FinaleAnswerReceivedEvent, FinaleAnswerShownEvent, FreezeStartedEvent,
            PhaseChangedEvent, PowerUpEvent, PowerUpsDisabledEvent, QuestionClosedEvent,
            QuestionRevealedEvent, ScoreChangedEvent, ScoreDeltaEvent, ServerEvent,
            TipRevealedEvent, TurnChangedEvent, WagerAcceptedEvent, WagerPlacedEvent,
        },
    },
    engine::{
        QuestionVariant,
        events::{CountdownPurpose, DeltaReason, ScoreDelta, ScoreTotals},
        lifecycle::QuestionPhase,
    },
    state::{
        SharedState,
        game::{Answer, PowerUpKind, Question},
    },
};

const EVENT_GAME_LOADED: &str = "game.loaded";
const EVENT_TURN_CHANGED: &str = "turn.changed";
const EVENT_PHASE_CHANGED: &str = "question.phase";
const EVENT_QUESTION_REVEALED: &str = "question.revealed";
const EVENT_QUESTION_CLOSED: &str = "question.closed";
const EVENT_BUZZ_ENABLED: &str = "buzz.enabled";
const EVENT_BUZZ_DISABLED: &str = "buzz.disabled";
const EVENT_BUZZ_RECEIVED: &str = "buzz.received";
const EVENT_BUZZ_WINNER: &str = "buzz.winner";
const EVENT_BUZZ_LOSERS: &str = "buzz.losers";
const EVENT_POWER_UP_ENABLED: &str = "power_up.enabled";
const EVENT_POWER_UPS_DISABLED: &str = "power_up.disabled";
const EVENT_POWER_UP_USED: &str = "power_up.used";
const EVENT_FREEZE_STARTED: &str = "freeze.started";
const EVENT_FREEZE_ENDED: &str = "freeze.ended";
const EVENT_COUNTDOWN_STARTED: &str = "countdown.started";
const EVENT_COUNTDOWN_TICK: &str = "countdown.tick";
const EVENT_COUNTDOWN_STOPPED: &str = "countdown.stopped";
const EVENT_TIP_REVEALED: &str = "tip.revealed";
const EVENT_CHOICE_ELIMINATED: &str = "choice.eliminated";
const EVENT_SCORE_DELTA: &str = "score.delta";
const EVENT_SCORE_CHANGED: &str = "score.changed";
const EVENT_ANSWER_REVEALED: &str = "answer.revealed";
const EVENT_WAGER_PLACED: &str = "wager.placed";
const EVENT_WAGER_ACCEPTED: &str = "wager.accepted";
const EVENT_FINALE_ANSWER_RECEIVED: &str = "finale.answer_received";
const EVENT_FINALE_ANSWER_SHOWN: &str = "finale.answer_shown";

/// Broadcast the board and roster of a freshly loaded game.
pub fn broadcast_game_loaded(state: &SharedState, snapshot: &GameSnapshot) {
    send_public_event(state, EVENT_GAME_LOADED, snapshot);
    send_presenter_event(state, EVENT_GAME_LOADED, snapshot);
}

/// Broadcast who picks the next question.
pub fn broadcast_turn_changed(state: &SharedState, contestant: Uuid) {
    send_both(state, EVENT_TURN_CHANGED, &TurnChangedEvent { contestant });
}

/// Broadcast a question phase change.
pub fn broadcast_phase_changed(state: &SharedState, question: Uuid, phase: QuestionPhase) {
    let payload = PhaseChangedEvent {
        question,
        phase: phase.into(),
    };
    send_both(state, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast the prompt once it is shown. The answer never leaves on this event.
pub fn broadcast_question_revealed(
    state: &SharedState,
    question: &Question,
    variant: QuestionVariant,
) {
    let choices = match &question.answer {
        Answer::Open(_) => Vec::new(),
        Answer::Choices { choices, .. } => choices.clone(),
    };
    let payload = QuestionRevealedEvent {
        question: question.id,
        prompt: question.prompt.clone(),
        value: question.value,
        media: question.media.clone(),
        choices,
        variant,
    };
    send_both(state, EVENT_QUESTION_REVEALED, &payload);
}

/// Broadcast the end of a question with the deltas that stuck.
pub fn broadcast_question_closed(
    state: &SharedState,
    question: Uuid,
    deltas: &[ScoreDelta],
    turn: Option<Uuid>,
) {
    let payload = QuestionClosedEvent {
        question,
        deltas: deltas.iter().copied().map(Into::into).collect(),
        turn,
    };
    send_both(state, EVENT_QUESTION_CLOSED, &payload);
}

/// Broadcast which contestants may buzz.
pub fn broadcast_buzz_enabled(state: &SharedState, eligible: Vec<Uuid>) {
    send_both(state, EVENT_BUZZ_ENABLED, &BuzzEnabledEvent { eligible });
}

/// Broadcast that buzzing is closed.
pub fn broadcast_buzz_disabled(state: &SharedState) {
    send_both(state, EVENT_BUZZ_DISABLED, &EmptyEvent {});
}

/// Feed of buzzes for the presenter.
pub fn broadcast_buzz_received(state: &SharedState, contestant: Uuid, after_ms: u64) {
    let payload = BuzzReceivedEvent {
        contestant,
        after_ms,
    };
    send_presenter_event(state, EVENT_BUZZ_RECEIVED, &payload);
}

/// Broadcast the contestant who answers.
pub fn broadcast_buzz_winner(state: &SharedState, contestant: Uuid) {
    send_both(state, EVENT_BUZZ_WINNER, &BuzzWinnerEvent { contestant });
}

/// Broadcast the contestants who lost the window.
pub fn broadcast_buzz_losers(state: &SharedState, contestants: Vec<Uuid>) {
    send_presenter_event(state, EVENT_BUZZ_LOSERS, &BuzzLosersEvent { contestants });
}

/// Power-up feed: a power-up became usable.
pub fn broadcast_power_up_enabled(state: &SharedState, contestant: Uuid, power_up: PowerUpKind) {
    let payload = PowerUpEvent {
        contestant,
        power_up,
    };
    send_presenter_event(state, EVENT_POWER_UP_ENABLED, &payload);
}

/// Power-up feed: power-ups switched off.
pub fn broadcast_power_ups_disabled(
    state: &SharedState,
    contestant: Uuid,
    power_ups: Vec<PowerUpKind>,
) {
    let payload = PowerUpsDisabledEvent {
        contestant,
        power_ups,
    };
    send_presenter_event(state, EVENT_POWER_UPS_DISABLED, &payload);
}

/// Broadcast a consumed power-up.
pub fn broadcast_power_up_used(state: &SharedState, contestant: Uuid, power_up: PowerUpKind) {
    let payload = PowerUpEvent {
        contestant,
        power_up,
    };
    send_both(state, EVENT_POWER_UP_USED, &payload);
}

/// Broadcast a freeze.
pub fn broadcast_freeze_started(state: &SharedState, contestant: Uuid, duration_ms: u64) {
    let payload = FreezeStartedEvent {
        contestant,
        duration_ms,
    };
    send_both(state, EVENT_FREEZE_STARTED, &payload);
}

/// Broadcast the end of a freeze.
pub fn broadcast_freeze_ended(state: &SharedState) {
    send_both(state, EVENT_FREEZE_ENDED, &EmptyEvent {});
}

/// Broadcast a countdown start.
pub fn broadcast_countdown_started(
    state: &SharedState,
    purpose: CountdownPurpose,
    duration_ms: u64,
) {
    let payload = CountdownEvent {
        purpose,
        elapsed_ms: 0,
        duration_ms,
    };
    send_both(state, EVENT_COUNTDOWN_STARTED, &payload);
}

/// Broadcast countdown progress.
pub fn broadcast_countdown_tick(
    state: &SharedState,
    purpose: CountdownPurpose,
    elapsed_ms: u64,
    duration_ms: u64,
) {
    let payload = CountdownEvent {
        purpose,
        elapsed_ms,
        duration_ms,
    };
    send_both(state, EVENT_COUNTDOWN_TICK, &payload);
}

/// Broadcast a cancelled or expired countdown.
pub fn broadcast_countdown_stopped(state: &SharedState, purpose: CountdownPurpose) {
    send_both(state, EVENT_COUNTDOWN_STOPPED, &CountdownStoppedEvent { purpose });
}

/// Broadcast a tip.
pub fn broadcast_tip_revealed(state: &SharedState, index: usize, tip: String) {
    send_both(state, EVENT_TIP_REVEALED, &TipRevealedEvent { index, tip });
}

/// Broadcast a crossed-out choice.
pub fn broadcast_choice_eliminated(state: &SharedState, index: usize) {
    send_both(state, EVENT_CHOICE_ELIMINATED, &ChoiceEliminatedEvent { index });
}

/// Broadcast a score movement with its reason.
pub fn broadcast_score_delta(
    state: &SharedState,
    contestant: Uuid,
    points: i64,
    reason: DeltaReason,
) {
    let payload = ScoreDeltaEvent {
        contestant,
        points,
        reason,
    };
    send_both(state, EVENT_SCORE_DELTA, &payload);
}

/// Broadcast new totals.
pub fn broadcast_score_changed(state: &SharedState, contestant: Uuid, totals: ScoreTotals) {
    let payload = ScoreChangedEvent {
        contestant,
        score: totals.score,
        hits: totals.hits,
        misses: totals.misses,
    };
    send_both(state, EVENT_SCORE_CHANGED, &payload);
}

/// Broadcast the canonical answer.
pub fn broadcast_answer_revealed(state: &SharedState, answer: String) {
    send_both(state, EVENT_ANSWER_REVEALED, &AnswerRevealedEvent { answer });
}

/// Public side learns that a wager is in; the presenter also gets the amount.
pub fn broadcast_wager_accepted(state: &SharedState, contestant: Uuid, amount: u32) {
    send_public_event(state, EVENT_WAGER_PLACED, &WagerPlacedEvent { contestant });
    send_presenter_event(
        state,
        EVENT_WAGER_ACCEPTED,
        &WagerAcceptedEvent { contestant, amount },
    );
}

/// Broadcast that a finale answer arrived, without its content.
pub fn broadcast_finale_answer_received(state: &SharedState, contestant: Uuid) {
    send_both(
        state,
        EVENT_FINALE_ANSWER_RECEIVED,
        &FinaleAnswerReceivedEvent { contestant },
    );
}

/// Broadcast the finale answer up for judgment.
pub fn broadcast_finale_answer_shown(
    state: &SharedState,
    contestant: Uuid,
    answer: Option<String>,
    wager: u32,
) {
    let payload = FinaleAnswerShownEvent {
        contestant,
        answer,
        wager,
    };
    send_both(state, EVENT_FINALE_ANSWER_SHOWN, &payload);
}

fn send_both(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => {
            state.public_sse().broadcast(event.clone());
            state.presenter_sse().broadcast(event);
        }
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

fn send_presenter_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.presenter_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize presenter SSE payload"),
    }
}
