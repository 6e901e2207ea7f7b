//! Question lifecycle state machine.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::game::ContestantId;

/// Terminal or pending outcome of an answer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Still answering.
    Pending,
    /// Judged correct.
    Correct,
    /// Judged wrong, or the answer countdown ran out.
    Incorrect,
    /// Nobody answered.
    TimedOut,
}

/// Phases a question goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    /// Question picked but not shown yet.
    Hidden,
    /// Prompt shown, buzzing not open yet.
    Revealed,
    /// Contestants may buzz.
    BuzzOpen,
    /// A contestant holds the right to answer.
    Answering {
        /// Who is answering.
        contestant: ContestantId,
    },
    /// The latest attempt (or the buzz window) has an outcome.
    Resolved {
        /// Outcome of the attempt, never [`AttemptOutcome::Pending`].
        outcome: AttemptOutcome,
        /// Who answered, `None` when nobody buzzed.
        contestant: Option<ContestantId>,
    },
    /// Question finished.
    Closed,
}

/// How the first answerer of a question is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPath {
    /// Through a buzz window.
    Standard,
    /// Assigned directly (daily double, finale, hijack before reveal).
    Forced,
}

/// Events that can be applied to the question state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionEvent {
    /// Presenter shows the prompt.
    Reveal,
    /// Buzzing opens for the first time.
    OpenBuzzWindow,
    /// Buzzing opens again after a wrong answer.
    ReopenBuzzWindow,
    /// A buzz won arbitration.
    BuzzWon(ContestantId),
    /// Answer rights handed over without arbitration.
    Assign(ContestantId),
    /// The buzz countdown ran out.
    BuzzTimedOut,
    /// Presenter ends a buzz window nobody took.
    Abort,
    /// Presenter judges the current answer.
    Judge(AttemptOutcome),
    /// The answer countdown ran out.
    AnswerTimedOut,
    /// Presenter reopens the latest judged attempt.
    Undo,
    /// Presenter moves on.
    Advance,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the question was in when the invalid event was received.
    pub from: QuestionPhase,
    /// The event that cannot be applied from this phase.
    pub event: QuestionEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase.
    pub phase: QuestionPhase,
    /// Number of transitions applied so far.
    pub version: usize,
    /// How the question was entered.
    pub entry: EntryPath,
}

/// State machine implementing the question lifecycle.
#[derive(Debug, Clone)]
pub struct QuestionStateMachine {
    phase: QuestionPhase,
    version: usize,
    entry: EntryPath,
}

impl QuestionStateMachine {
    /// Create a machine for a question that has just been picked.
    pub fn new(entry: EntryPath) -> Self {
        Self {
            phase: QuestionPhase::Hidden,
            version: 0,
            entry,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> QuestionPhase {
        self.phase
    }

    /// How the question was entered.
    pub fn entry(&self) -> EntryPath {
        self.entry
    }

    /// Switch to the forced path, used when a hijack happens before the reveal.
    pub fn force_entry(&mut self) {
        self.entry = EntryPath::Forced;
    }

    /// Create a snapshot of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            entry: self.entry,
        }
    }

    /// Validate `event` without applying it.
    pub fn check(&self, event: QuestionEvent) -> Result<QuestionPhase, InvalidTransition> {
        compute_transition(&self.phase, &event)
    }

    /// Apply `event`, leaving the machine untouched when it is invalid.
    pub fn apply(&mut self, event: QuestionEvent) -> Result<QuestionPhase, InvalidTransition> {
        let next = compute_transition(&self.phase, &event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }
}

/// Compute the phase reached by applying `event` from `phase`.
pub fn compute_transition(
    phase: &QuestionPhase,
    event: &QuestionEvent,
) -> Result<QuestionPhase, InvalidTransition> {
    use QuestionEvent as E;
    use QuestionPhase as P;

    let next = match (phase, event) {
        (P::Hidden, E::Reveal) => P::Revealed,
        (P::Revealed, E::OpenBuzzWindow) => P::BuzzOpen,
        (P::BuzzOpen, E::BuzzWon(contestant)) => P::Answering {
            contestant: *contestant,
        },
        (P::Revealed | P::BuzzOpen | P::Answering { .. }, E::Assign(contestant)) => {
            P::Answering {
                contestant: *contestant,
            }
        }
        (P::Resolved { .. }, E::Assign(contestant)) => P::Answering {
            contestant: *contestant,
        },
        (P::Revealed | P::BuzzOpen, E::BuzzTimedOut | E::Abort) => P::Resolved {
            outcome: AttemptOutcome::TimedOut,
            contestant: None,
        },
        (
            P::Answering { contestant },
            E::Judge(outcome @ (AttemptOutcome::Correct | AttemptOutcome::Incorrect)),
        ) => P::Resolved {
            outcome: *outcome,
            contestant: Some(*contestant),
        },
        (P::Answering { contestant }, E::AnswerTimedOut) => P::Resolved {
            outcome: AttemptOutcome::Incorrect,
            contestant: Some(*contestant),
        },
        (
            P::Resolved {
                outcome: AttemptOutcome::Incorrect,
                ..
            },
            E::ReopenBuzzWindow,
        ) => P::BuzzOpen,
        (
            P::Resolved {
                outcome: AttemptOutcome::Correct | AttemptOutcome::Incorrect,
                contestant: Some(contestant),
            },
            E::Undo,
        ) => P::Answering {
            contestant: *contestant,
        },
        (P::Resolved { .. }, E::Advance) => P::Closed,
        _ => {
            return Err(InvalidTransition {
                from: *phase,
                event: *event,
            });
        }
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn apply(sm: &mut QuestionStateMachine, event: QuestionEvent) -> QuestionPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_hidden() {
        let sm = QuestionStateMachine::new(EntryPath::Standard);
        assert_eq!(sm.phase(), QuestionPhase::Hidden);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn full_happy_path_through_question() {
        let ada = Uuid::new_v4();
        let mut sm = QuestionStateMachine::new(EntryPath::Standard);

        assert_eq!(apply(&mut sm, QuestionEvent::Reveal), QuestionPhase::Revealed);
        assert_eq!(
            apply(&mut sm, QuestionEvent::OpenBuzzWindow),
            QuestionPhase::BuzzOpen
        );
        assert_eq!(
            apply(&mut sm, QuestionEvent::BuzzWon(ada)),
            QuestionPhase::Answering { contestant: ada }
        );
        assert_eq!(
            apply(&mut sm, QuestionEvent::Judge(AttemptOutcome::Correct)),
            QuestionPhase::Resolved {
                outcome: AttemptOutcome::Correct,
                contestant: Some(ada)
            }
        );
        assert_eq!(apply(&mut sm, QuestionEvent::Advance), QuestionPhase::Closed);
        assert_eq!(sm.snapshot().version, 5);
    }

    #[test]
    fn wrong_answer_can_reopen_buzzing() {
        let ada = Uuid::new_v4();
        let mut sm = QuestionStateMachine::new(EntryPath::Standard);
        apply(&mut sm, QuestionEvent::Reveal);
        apply(&mut sm, QuestionEvent::OpenBuzzWindow);
        apply(&mut sm, QuestionEvent::BuzzWon(ada));
        apply(&mut sm, QuestionEvent::AnswerTimedOut);

        assert_eq!(
            apply(&mut sm, QuestionEvent::ReopenBuzzWindow),
            QuestionPhase::BuzzOpen
        );
        assert_eq!(
            apply(&mut sm, QuestionEvent::BuzzTimedOut),
            QuestionPhase::Resolved {
                outcome: AttemptOutcome::TimedOut,
                contestant: None
            }
        );
    }

    #[test]
    fn correct_answer_cannot_reopen_buzzing() {
        let ada = Uuid::new_v4();
        let mut sm = QuestionStateMachine::new(EntryPath::Standard);
        apply(&mut sm, QuestionEvent::Reveal);
        apply(&mut sm, QuestionEvent::Assign(ada));
        apply(&mut sm, QuestionEvent::Judge(AttemptOutcome::Correct));

        let err = sm.apply(QuestionEvent::ReopenBuzzWindow).unwrap_err();
        assert_eq!(err.event, QuestionEvent::ReopenBuzzWindow);
        assert_eq!(sm.snapshot().version, 3);
    }

    #[test]
    fn timed_out_window_cannot_be_undone() {
        let mut sm = QuestionStateMachine::new(EntryPath::Standard);
        apply(&mut sm, QuestionEvent::Reveal);
        apply(&mut sm, QuestionEvent::OpenBuzzWindow);
        apply(&mut sm, QuestionEvent::Abort);

        assert!(sm.check(QuestionEvent::Undo).is_err());
    }

    #[test]
    fn judging_requires_an_answerer() {
        let mut sm = QuestionStateMachine::new(EntryPath::Standard);
        apply(&mut sm, QuestionEvent::Reveal);
        let err = sm
            .apply(QuestionEvent::Judge(AttemptOutcome::Correct))
            .unwrap_err();
        assert_eq!(err.from, QuestionPhase::Revealed);
        assert_eq!(sm.phase(), QuestionPhase::Revealed);
    }

    #[test]
    fn pending_is_not_a_judgment() {
        let ada = Uuid::new_v4();
        let mut sm = QuestionStateMachine::new(EntryPath::Forced);
        apply(&mut sm, QuestionEvent::Reveal);
        apply(&mut sm, QuestionEvent::Assign(ada));
        assert!(sm.apply(QuestionEvent::Judge(AttemptOutcome::Pending)).is_err());
    }

    #[test]
    fn closed_is_terminal() {
        let mut sm = QuestionStateMachine::new(EntryPath::Standard);
        apply(&mut sm, QuestionEvent::Reveal);
        apply(&mut sm, QuestionEvent::Abort);
        apply(&mut sm, QuestionEvent::Advance);

        for event in [
            QuestionEvent::Reveal,
            QuestionEvent::Undo,
            QuestionEvent::Advance,
            QuestionEvent::Assign(Uuid::new_v4()),
        ] {
            assert!(sm.check(event).is_err());
        }
    }
}
