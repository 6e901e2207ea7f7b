use std::time::Duration;

use jeoparty_back::{
    config::AppConfig,
    dto::{
        phase::{VisibleGameStage, VisibleQuestionPhase},
        presenter::{GameSnapshot, LoadGameRequest},
    },
    engine::{Judgment, lifecycle::AttemptOutcome},
    error::ServiceError,
    services::presenter_service,
    state::{
        AppState, SharedState,
        coordinator::{ContestantAction, PresenterAction, PresenterOutcome},
    },
};
use uuid::Uuid;

const ADA: &str = "5b0f6a52-3c38-4ad9-8e2e-0a5a9d0c6b01";
const GRACE: &str = "9d2e8f14-7a61-4c1b-b0a3-2f4e6d8c1a02";
const QUESTION: &str = "c4a1e7d3-1f2b-4e5a-9c8d-7b6a5f4e3d03";

fn load_request() -> LoadGameRequest {
    serde_json::from_str(&format!(
        r#"{{
            "title": "Friday quiz",
            "rounds": [{{
                "name": "Round one",
                "categories": [{{
                    "name": "Space",
                    "questions": [{{
                        "id": "{QUESTION}",
                        "prompt": "Which planet has the most moons?",
                        "answer": {{ "kind": "open", "text": "Saturn" }},
                        "value": 200
                    }}]
                }}]
            }}],
            "contestants": [
                {{ "id": "{ADA}", "name": "Ada" }},
                {{ "id": "{GRACE}", "name": "Grace" }}
            ]
        }}"#
    ))
    .unwrap()
}

async fn load(state: &SharedState) -> GameSnapshot {
    let game = presenter_service::build_game(state.config(), load_request()).unwrap();
    match state
        .run_presenter_action(PresenterAction::LoadGame(Box::new(game)))
        .await
        .unwrap()
    {
        PresenterOutcome::Snapshot(snapshot) => *snapshot,
        other => panic!("unexpected outcome {other:?}"),
    }
}

async fn snapshot(state: &SharedState) -> GameSnapshot {
    presenter_service::snapshot(state).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn a_question_is_played_through_the_coordinator() {
    let state = AppState::new(AppConfig::default());
    let ada: Uuid = ADA.parse().unwrap();
    let question: Uuid = QUESTION.parse().unwrap();

    let loaded = load(&state).await;
    assert_eq!(loaded.stage, VisibleGameStage::Selection);
    assert_eq!(loaded.contestants.len(), 2);

    state
        .run_presenter_action(PresenterAction::OpenQuestion(question))
        .await
        .unwrap();
    presenter_service::reveal(&state).await.unwrap();

    // Buzzing opens shortly after the reveal.
    tokio::time::sleep(Duration::from_millis(800)).await;
    let active = snapshot(&state).await.active_question.unwrap();
    assert_eq!(active.phase, VisibleQuestionPhase::BuzzOpen);

    state
        .send_contestant_action(ada, ContestantAction::Buzz)
        .await
        .unwrap();
    let active = snapshot(&state).await.active_question.unwrap();
    assert_eq!(
        active.phase,
        VisibleQuestionPhase::Answering { contestant: ada }
    );

    match state
        .run_presenter_action(PresenterAction::Judge(Judgment::Correct))
        .await
        .unwrap()
    {
        PresenterOutcome::Judged(outcome) => assert_eq!(outcome, AttemptOutcome::Correct),
        other => panic!("unexpected outcome {other:?}"),
    }
    presenter_service::advance(&state).await.unwrap();

    let after = snapshot(&state).await;
    assert!(after.active_question.is_none());
    let ada_summary = after
        .contestants
        .iter()
        .find(|contestant| contestant.id == ada)
        .unwrap();
    assert_eq!(ada_summary.score, 200);
    assert!(ada_summary.has_turn);
}

#[tokio::test(start_paused = true)]
async fn presenter_actions_need_a_loaded_game() {
    let state = AppState::new(AppConfig::default());
    let result = presenter_service::reveal(&state).await;
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
}

#[tokio::test(start_paused = true)]
async fn loading_is_refused_while_a_question_is_in_play() {
    let state = AppState::new(AppConfig::default());
    load(&state).await;
    state
        .run_presenter_action(PresenterAction::OpenQuestion(QUESTION.parse().unwrap()))
        .await
        .unwrap();

    let game = presenter_service::build_game(state.config(), load_request()).unwrap();
    let result = state
        .run_presenter_action(PresenterAction::LoadGame(Box::new(game)))
        .await;
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
}

#[tokio::test(start_paused = true)]
async fn the_public_stream_sees_the_game_load() {
    let state = AppState::new(AppConfig::default());
    let mut public = state.public_sse().subscribe();

    load(&state).await;
    let event = public.recv().await.unwrap();
    assert_eq!(event.event.as_deref(), Some("game.loaded"));
    assert!(event.data.contains("Friday quiz"));
}
