use indexmap::IndexMap;
use jeoparty_back::{
    engine::{
        EngineError, EngineSettings, Judgment, QuestionSetup, RoundEngine,
        arbiter::{BuzzOutcome, BuzzRejection},
        events::{DeltaReason, EngineEvent},
        lifecycle::{AttemptOutcome, QuestionPhase},
        power_ups::PowerUpState,
    },
    state::game::{Answer, Contestant, ContestantId, PowerUpKind, Question, QuestionStatus},
};
use uuid::Uuid;

const BUZZ_TIME_MS: u64 = 10_000;

fn open_question(value: u32) -> Question {
    Question {
        id: Uuid::new_v4(),
        prompt: "Which planet has the most moons?".into(),
        answer: Answer::Open("Saturn".into()),
        value,
        tips: Vec::new(),
        media: None,
        buzz_time_s: None,
        is_daily_double: false,
        is_finale: false,
        status: QuestionStatus::Pending,
    }
}

fn choice_question(value: u32) -> Question {
    Question {
        answer: Answer::Choices {
            choices: vec![
                "Saturn".into(),
                "Jupiter".into(),
                "Mars".into(),
                "Venus".into(),
            ],
            correct: 0,
        },
        ..open_question(value)
    }
}

fn roster(count: usize) -> (IndexMap<ContestantId, Contestant>, Vec<ContestantId>) {
    let ids: Vec<ContestantId> = (0..count).map(|_| Uuid::new_v4()).collect();
    let contestants = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            (
                *id,
                Contestant::new(format!("player {i}"), "#3366ff".into(), true),
            )
        })
        .collect();
    (contestants, ids)
}

fn start(question: Question, count: usize) -> (RoundEngine, Vec<ContestantId>) {
    let (contestants, ids) = roster(count);
    let engine = RoundEngine::new(
        QuestionSetup {
            question,
            buzz_time_ms: BUZZ_TIME_MS,
            round_number: 1,
        },
        contestants,
        EngineSettings::default(),
    );
    (engine, ids)
}

fn reveal_and_open(engine: &mut RoundEngine) {
    engine.reveal().unwrap();
    assert_eq!(engine.phase(), QuestionPhase::Revealed);
    engine.tick(EngineSettings::default().buzz_open_delay_ms);
    assert_eq!(engine.phase(), QuestionPhase::BuzzOpen);
}

fn score(engine: &RoundEngine, id: ContestantId) -> i64 {
    engine.contestant(id).unwrap().score
}

#[test]
fn only_the_first_buzz_wins_the_window() {
    let (mut engine, ids) = start(open_question(200), 3);
    reveal_and_open(&mut engine);

    assert_eq!(engine.buzz(ids[1]).unwrap(), BuzzOutcome::Winner);
    assert_eq!(
        engine.buzz(ids[0]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided)
    );
    assert_eq!(
        engine.buzz(ids[1]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::Duplicate)
    );
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[1] }
    );

    let winners: Vec<_> = engine
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::BuzzWinner { contestant } => Some(contestant),
            _ => None,
        })
        .collect();
    assert_eq!(winners, vec![ids[1]]);
}

#[test]
fn buzzes_before_the_window_opens_are_rejected() {
    let (mut engine, ids) = start(open_question(200), 2);
    assert_eq!(
        engine.buzz(ids[0]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::WindowClosed)
    );
    engine.reveal().unwrap();
    assert_eq!(
        engine.buzz(ids[0]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::WindowClosed)
    );
    assert!(matches!(
        engine.buzz(Uuid::new_v4()),
        Err(EngineError::UnknownContestant(_))
    ));
}

#[test]
fn undo_restores_the_score_and_reopens_the_attempt() {
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();

    assert_eq!(
        engine.judge(Judgment::Incorrect).unwrap(),
        AttemptOutcome::Incorrect
    );
    assert_eq!(score(&engine, ids[0]), -200);
    assert!(engine.can_undo());

    engine.undo().unwrap();
    assert_eq!(score(&engine, ids[0]), 0);
    assert_eq!(engine.contestant(ids[0]).unwrap().misses, 0);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[0] }
    );
    assert!(!engine.can_undo());

    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(score(&engine, ids[0]), 200);
    assert!(engine.contestant(ids[0]).unwrap().has_turn);

    engine.undo().unwrap();
    assert_eq!(score(&engine, ids[0]), 0);
    assert!(!engine.contestant(ids[0]).unwrap().has_turn);
    assert!(!engine.answer_revealed());
}

#[test]
fn undo_needs_a_judgment() {
    let (mut engine, _) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    assert!(matches!(
        engine.undo(),
        Err(EngineError::InvalidTransition(_))
    ));
}

#[test]
fn each_shown_tip_halves_the_award() {
    let question = Question {
        tips: vec!["Ringed".into(), "Sixth from the sun".into()],
        ..open_question(200)
    };
    let (mut engine, ids) = start(question, 2);
    reveal_and_open(&mut engine);

    // The first tip lands four seconds after the reveal.
    engine.tick(3_500);
    assert_eq!(engine.tips_shown(), 1);

    engine.buzz(ids[0]).unwrap();
    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(score(&engine, ids[0]), 100);
}

#[test]
fn wrong_choices_are_eliminated_and_shrink_the_award() {
    let (mut engine, ids) = start(choice_question(200), 2);
    reveal_and_open(&mut engine);

    engine.buzz(ids[0]).unwrap();
    assert_eq!(
        engine.judge(Judgment::Choice(1)).unwrap(),
        AttemptOutcome::Incorrect
    );
    assert_eq!(engine.eliminated_choices(), &[1]);
    assert_eq!(score(&engine, ids[0]), -200);

    engine.tick(EngineSettings::default().reopen_delay_ms);
    assert_eq!(engine.phase(), QuestionPhase::BuzzOpen);
    assert_eq!(engine.eligible(), vec![ids[1]]);

    engine.buzz(ids[1]).unwrap();
    assert!(matches!(
        engine.judge(Judgment::Choice(1)),
        Err(EngineError::StaleEvent(_))
    ));
    assert!(matches!(
        engine.judge(Judgment::Choice(9)),
        Err(EngineError::NotPermitted(_))
    ));
    engine.judge(Judgment::Choice(0)).unwrap();
    assert_eq!(score(&engine, ids[1]), 150);
}

#[test]
fn hijack_before_the_reveal_pays_a_bonus() {
    let (mut engine, ids) = start(open_question(200), 3);
    assert_eq!(
        engine.power_up_state(ids[2], PowerUpKind::Hijack),
        PowerUpState::Enabled
    );

    engine.use_power_up(ids[2], PowerUpKind::Hijack).unwrap();
    assert!(engine.hijack_bonus());
    assert_eq!(engine.phase(), QuestionPhase::Hidden);

    engine.reveal().unwrap();
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[2] }
    );
    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(score(&engine, ids[2]), 300);
}

#[test]
fn hijack_during_an_answer_takes_it_over_without_a_bonus() {
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();

    engine.use_power_up(ids[1], PowerUpKind::Hijack).unwrap();
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[1] }
    );
    assert!(!engine.hijack_bonus());
    assert_eq!(engine.current_attempt().unwrap().contestant, ids[1]);
    let countdown = engine.countdown().unwrap();
    assert_eq!(countdown.elapsed_ms, 0);
    assert!(!countdown.paused);

    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(score(&engine, ids[0]), 0);
    assert_eq!(engine.contestant(ids[0]).unwrap().misses, 0);
    assert_eq!(score(&engine, ids[1]), 200);
}

#[test]
fn power_ups_are_single_use() {
    let (mut engine, ids) = start(open_question(200), 2);
    engine.use_power_up(ids[0], PowerUpKind::Hijack).unwrap();

    assert!(matches!(
        engine.use_power_up(ids[0], PowerUpKind::Hijack),
        Err(EngineError::StaleEvent(_))
    ));
    assert!(matches!(
        engine.use_power_up(ids[1], PowerUpKind::Hijack),
        Err(EngineError::PowerUpUnavailable { .. })
    ));
    assert!(engine.contestant(ids[0]).unwrap().power_ups[&PowerUpKind::Hijack].used);
}

#[test]
fn freeze_pauses_the_answer_countdown() {
    let settings = EngineSettings::default();
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();

    engine.use_power_up(ids[0], PowerUpKind::Freeze).unwrap();
    let countdown = engine.countdown().unwrap();
    assert!(countdown.paused);

    // The answer countdown would have run out long ago without the freeze.
    engine.tick(settings.answer_time_ms + 1_000);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[0] }
    );
    engine.drain_events();

    engine.tick(settings.freeze_ms - settings.answer_time_ms - 1_000);
    assert!(engine.drain_events().contains(&EngineEvent::FreezeEnded));
    let countdown = engine.countdown().unwrap();
    assert!(!countdown.paused);
    assert_eq!(countdown.elapsed_ms, 0);

    engine.tick(settings.answer_time_ms);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Resolved {
            outcome: AttemptOutcome::Incorrect,
            contestant: Some(ids[0]),
        }
    );
    assert_eq!(score(&engine, ids[0]), -200);
}

#[test]
fn a_judgment_during_the_freeze_ends_it_for_good() {
    let settings = EngineSettings::default();
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();
    engine.use_power_up(ids[0], PowerUpKind::Freeze).unwrap();
    engine.tick(1_000);

    engine.judge(Judgment::Correct).unwrap();
    assert!(engine.countdown().is_none());
    engine.drain_events();

    engine.tick(settings.freeze_ms);
    assert!(!engine.drain_events().contains(&EngineEvent::FreezeEnded));
    assert!(engine.countdown().is_none());
    assert_eq!(
        engine.phase(),
        QuestionPhase::Resolved {
            outcome: AttemptOutcome::Correct,
            contestant: Some(ids[0]),
        }
    );
    assert_eq!(score(&engine, ids[0]), 200);
}

#[test]
fn freeze_is_withdrawn_near_the_end_of_the_answer() {
    let settings = EngineSettings::default();
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();
    assert_eq!(
        engine.power_up_state(ids[0], PowerUpKind::Freeze),
        PowerUpState::Enabled
    );

    engine.tick(settings.answer_time_ms - settings.freeze_lockout_ms - 1);
    assert_eq!(
        engine.power_up_state(ids[0], PowerUpKind::Freeze),
        PowerUpState::Enabled
    );

    engine.tick(1);
    assert_eq!(
        engine.power_up_state(ids[0], PowerUpKind::Freeze),
        PowerUpState::Idle
    );
    assert!(matches!(
        engine.use_power_up(ids[0], PowerUpKind::Freeze),
        Err(EngineError::PowerUpUnavailable { .. })
    ));
}

#[test]
fn nobody_buzzing_times_the_window_out() {
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.drain_events();

    engine.tick(BUZZ_TIME_MS);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Resolved {
            outcome: AttemptOutcome::TimedOut,
            contestant: None,
        }
    );
    assert!(engine.answer_revealed());
    let events = engine.drain_events();
    assert!(events.contains(&EngineEvent::BuzzDisabled));
    assert!(events.contains(&EngineEvent::AnswerRevealed {
        answer: "Saturn".into()
    }));

    engine.advance().unwrap();
    assert!(engine.is_closed());
    assert!(ids.iter().all(|id| score(&engine, *id) == 0));
}

#[test]
fn running_out_of_answer_time_counts_as_wrong() {
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();
    engine.drain_events();

    engine.tick(EngineSettings::default().answer_time_ms);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Resolved {
            outcome: AttemptOutcome::Incorrect,
            contestant: Some(ids[0]),
        }
    );
    assert_eq!(score(&engine, ids[0]), -200);
    assert!(engine.drain_events().contains(&EngineEvent::ScoreDelta {
        contestant: ids[0],
        points: -200,
        reason: DeltaReason::AnswerTimedOut,
    }));
}

#[test]
fn rewind_hands_eligibility_back_to_later_buzzers() {
    let (mut engine, ids) = start(open_question(200), 3);
    reveal_and_open(&mut engine);

    engine.buzz(ids[0]).unwrap();
    engine.judge(Judgment::Incorrect).unwrap();
    assert_eq!(
        engine.power_up_state(ids[0], PowerUpKind::Rewind),
        PowerUpState::Enabled
    );

    engine.tick(EngineSettings::default().reopen_delay_ms);
    assert_eq!(engine.phase(), QuestionPhase::BuzzOpen);
    assert_eq!(engine.buzz(ids[1]).unwrap(), BuzzOutcome::Winner);
    assert_eq!(
        engine.buzz(ids[2]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided)
    );
    assert!(!engine.eligible().contains(&ids[1]));

    engine.use_power_up(ids[0], PowerUpKind::Rewind).unwrap();
    assert_eq!(score(&engine, ids[0]), 0);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[0] }
    );
    let eligible = engine.eligible();
    assert!(eligible.contains(&ids[1]));
    assert!(eligible.contains(&ids[2]));
    assert!(!eligible.contains(&ids[0]));

    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(score(&engine, ids[0]), 200);
}

#[test]
fn rewind_replays_later_buzzers_in_buzz_order() {
    let (mut engine, ids) = start(open_question(200), 3);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();
    engine.judge(Judgment::Incorrect).unwrap();
    engine.tick(EngineSettings::default().reopen_delay_ms);

    assert_eq!(engine.buzz(ids[2]).unwrap(), BuzzOutcome::Winner);
    assert_eq!(
        engine.buzz(ids[1]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::AlreadyDecided)
    );

    engine.use_power_up(ids[0], PowerUpKind::Rewind).unwrap();
    assert_eq!(engine.eligible(), vec![ids[2], ids[1]]);
}

/// Wrong answers from both contestants, the second one still holding rewind.
fn last_wrong_answer_with_rewind() -> (RoundEngine, Vec<ContestantId>) {
    let (mut engine, ids) = start(open_question(200), 2);
    reveal_and_open(&mut engine);
    engine.buzz(ids[0]).unwrap();
    engine.judge(Judgment::Incorrect).unwrap();
    engine.tick(EngineSettings::default().reopen_delay_ms);
    engine.buzz(ids[1]).unwrap();
    engine.judge(Judgment::Incorrect).unwrap();
    assert!(engine.eligible().is_empty());
    assert_eq!(
        engine.power_up_state(ids[1], PowerUpKind::Rewind),
        PowerUpState::Enabled
    );
    (engine, ids)
}

#[test]
fn the_answer_waits_for_the_rewind_grace_window() {
    let grace = EngineSettings::default().rewind_grace_ms;
    let (mut engine, _) = last_wrong_answer_with_rewind();
    assert!(!engine.answer_revealed());

    engine.tick(grace - 1);
    assert!(!engine.answer_revealed());

    engine.tick(1);
    assert!(engine.answer_revealed());
}

#[test]
fn rewind_inside_the_grace_window_keeps_the_answer_hidden() {
    let grace = EngineSettings::default().rewind_grace_ms;
    let (mut engine, ids) = last_wrong_answer_with_rewind();
    engine.tick(1_000);

    engine.use_power_up(ids[1], PowerUpKind::Rewind).unwrap();
    assert_eq!(score(&engine, ids[1]), 0);
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[1] }
    );

    engine.tick(grace);
    assert!(!engine.answer_revealed());
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[1] }
    );
}

#[test]
fn daily_double_is_played_for_the_wager() {
    let question = Question {
        is_daily_double: true,
        ..open_question(400)
    };
    let (mut contestants, ids) = roster(2);
    if let Some(holder) = contestants.get_mut(&ids[0]) {
        holder.has_turn = true;
    }
    let mut engine = RoundEngine::new(
        QuestionSetup {
            question,
            buzz_time_ms: BUZZ_TIME_MS,
            round_number: 1,
        },
        contestants,
        EngineSettings::default(),
    );

    assert!(matches!(engine.reveal(), Err(EngineError::NotPermitted(_))));
    assert!(matches!(
        engine.wager(ids[1], 300),
        Err(EngineError::NotPermitted(_))
    ));
    assert_eq!(
        engine.wager(ids[0], 50),
        Err(EngineError::InvalidWager { min: 100, max: 500 })
    );
    assert_eq!(engine.wager(ids[0], 350), Ok(350));
    assert!(matches!(
        engine.wager(ids[0], 400),
        Err(EngineError::StaleEvent(_))
    ));

    engine.reveal().unwrap();
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[0] }
    );
    assert_eq!(
        engine.buzz(ids[1]).unwrap(),
        BuzzOutcome::Rejected(BuzzRejection::WindowClosed)
    );

    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(score(&engine, ids[0]), 350);
    engine.advance().unwrap();
    assert!(engine.is_closed());
}

#[test]
fn finale_collects_answers_then_judges_each_finalist() {
    let question = Question {
        is_finale: true,
        ..open_question(0)
    };
    let (mut engine, ids) = start(question, 3);

    assert!(matches!(engine.reveal(), Err(EngineError::NotPermitted(_))));
    assert_eq!(engine.wager(ids[0], 500), Ok(500));
    assert_eq!(engine.wager(ids[1], 1_000), Ok(1_000));
    assert_eq!(
        engine.wager(ids[2], 1_001),
        Err(EngineError::InvalidWager { min: 0, max: 1_000 })
    );

    engine.reveal().unwrap();
    assert_eq!(engine.phase(), QuestionPhase::Revealed);
    engine
        .finale_answer(ids[0], "  Saturn ".into())
        .unwrap();
    engine.finale_answer(ids[1], "Jupiter".into()).unwrap();
    assert!(matches!(
        engine.finale_answer(ids[2], "Mars".into()),
        Err(EngineError::NotPermitted(_))
    ));
    assert_eq!(
        engine.contestant(ids[0]).unwrap().finale_answer.as_deref(),
        Some("Saturn")
    );

    engine.drain_events();
    engine.advance().unwrap();
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[0] }
    );
    assert!(engine.drain_events().contains(&EngineEvent::FinaleAnswerShown {
        contestant: ids[0],
        answer: Some("Saturn".into()),
        wager: 500,
    }));

    engine.judge(Judgment::Correct).unwrap();
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[1] }
    );
    engine.judge(Judgment::Incorrect).unwrap();

    assert!(engine.is_closed());
    assert_eq!(score(&engine, ids[0]), 500);
    assert_eq!(score(&engine, ids[1]), -1_000);
    assert_eq!(score(&engine, ids[2]), 0);
}

#[test]
fn a_zero_finale_wager_is_not_judged() {
    let question = Question {
        is_finale: true,
        ..open_question(0)
    };
    let (mut engine, ids) = start(question, 2);
    assert_eq!(engine.wager(ids[0], 0), Ok(0));
    assert_eq!(engine.wager(ids[1], 300), Ok(300));

    engine.reveal().unwrap();
    engine.finale_answer(ids[0], "Saturn".into()).unwrap();
    engine.finale_answer(ids[1], "Saturn".into()).unwrap();
    engine.advance().unwrap();
    assert_eq!(
        engine.phase(),
        QuestionPhase::Answering { contestant: ids[1] }
    );

    engine.judge(Judgment::Correct).unwrap();
    assert!(engine.is_closed());
    assert_eq!(engine.contestant(ids[0]).unwrap().hits, 0);
    assert_eq!(score(&engine, ids[1]), 300);
}

#[test]
fn a_full_question_ends_with_the_deltas_that_stuck() {
    let (mut engine, ids) = start(open_question(300), 3);
    let question = engine.question().id;
    reveal_and_open(&mut engine);

    engine.buzz(ids[2]).unwrap();
    engine.judge(Judgment::Incorrect).unwrap();
    engine.tick(EngineSettings::default().reopen_delay_ms);
    engine.buzz(ids[0]).unwrap();
    engine.judge(Judgment::Correct).unwrap();
    engine.drain_events();

    engine.advance().unwrap();
    assert!(engine.is_closed());

    let closed = engine
        .drain_events()
        .into_iter()
        .find_map(|event| match event {
            EngineEvent::QuestionClosed { question, deltas } => Some((question, deltas)),
            _ => None,
        })
        .unwrap();
    assert_eq!(closed.0, question);
    let points: Vec<_> = closed
        .1
        .iter()
        .map(|delta| (delta.contestant, delta.points, delta.outcome))
        .collect();
    assert_eq!(
        points,
        vec![
            (ids[2], -300, AttemptOutcome::Incorrect),
            (ids[0], 300, AttemptOutcome::Correct),
        ]
    );
    assert!(engine.contestant(ids[0]).unwrap().has_turn);
    assert_eq!(engine.contestant(ids[0]).unwrap().buzzes, 1);
}
