use indexmap::IndexMap;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::presenter::{
        ActionResponse, AnswerInput, ContestantInput, FirstTurnResponse, GameSnapshot,
        JudgeRequest, JudgeResponse, LoadGameRequest, QuestionInput,
    },
    error::ServiceError,
    state::{
        SharedState,
        coordinator::{PresenterAction, PresenterOutcome},
        game::{
            Answer, Category, Contestant, ContestantId, Game, Question, QuestionId,
            QuestionStatus, Round, RoundKind,
        },
    },
};

/// Build the game described by `request` and hand it to the coordinator.
pub async fn load_game(
    state: &SharedState,
    request: LoadGameRequest,
) -> Result<GameSnapshot, ServiceError> {
    let game = build_game(state.config(), request)?;
    info!(game = %game.id, rounds = game.rounds.len(), "loading game");
    match state
        .run_presenter_action(PresenterAction::LoadGame(Box::new(game)))
        .await?
    {
        PresenterOutcome::Snapshot(snapshot) => Ok(*snapshot),
        other => Err(unexpected(other)),
    }
}

/// Describe the loaded game.
pub async fn snapshot(state: &SharedState) -> Result<GameSnapshot, ServiceError> {
    match state.run_presenter_action(PresenterAction::Snapshot).await? {
        PresenterOutcome::Snapshot(snapshot) => Ok(*snapshot),
        other => Err(unexpected(other)),
    }
}

/// Give the first turn to a random contestant.
pub async fn choose_first_turn(state: &SharedState) -> Result<FirstTurnResponse, ServiceError> {
    match state
        .run_presenter_action(PresenterAction::ChooseFirstTurn)
        .await?
    {
        PresenterOutcome::FirstTurn(contestant) => Ok(FirstTurnResponse { contestant }),
        other => Err(unexpected(other)),
    }
}

/// Put question `id` in play.
pub async fn open_question(
    state: &SharedState,
    id: QuestionId,
) -> Result<ActionResponse, ServiceError> {
    acknowledge(state, PresenterAction::OpenQuestion(id), "question opened").await
}

/// Show the prompt of the question in play.
pub async fn reveal(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    acknowledge(state, PresenterAction::Reveal, "question revealed").await
}

/// Judge the current answer.
pub async fn judge(
    state: &SharedState,
    request: JudgeRequest,
) -> Result<JudgeResponse, ServiceError> {
    let judgment = request.judgment().ok_or_else(|| {
        ServiceError::InvalidInput("exactly one of `correct` or `choice` must be set".into())
    })?;
    match state
        .run_presenter_action(PresenterAction::Judge(judgment))
        .await?
    {
        PresenterOutcome::Judged(outcome) => Ok(JudgeResponse { outcome }),
        other => Err(unexpected(other)),
    }
}

/// Close the question without scoring it.
pub async fn abort(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    acknowledge(state, PresenterAction::Abort, "question aborted").await
}

/// Put the latest judgment back.
pub async fn undo(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    acknowledge(state, PresenterAction::Undo, "judgment undone").await
}

/// Move on from the resolved attempt.
pub async fn advance(state: &SharedState) -> Result<ActionResponse, ServiceError> {
    acknowledge(state, PresenterAction::Advance, "question advanced").await
}

async fn acknowledge(
    state: &SharedState,
    action: PresenterAction,
    message: &str,
) -> Result<ActionResponse, ServiceError> {
    match state.run_presenter_action(action).await? {
        PresenterOutcome::Ack => Ok(ActionResponse {
            message: message.to_string(),
        }),
        other => Err(unexpected(other)),
    }
}

fn unexpected(outcome: PresenterOutcome) -> ServiceError {
    ServiceError::InvalidState(format!("unexpected coordinator reply: {outcome:?}"))
}

/// Turn a validated load request into a [`Game`].
///
/// Contestants without a color get the first unused palette entry.
pub fn build_game(config: &AppConfig, request: LoadGameRequest) -> Result<Game, ServiceError> {
    if request.rounds.is_empty() {
        return Err(ServiceError::InvalidInput(
            "a game needs at least one round".into(),
        ));
    }
    if request.contestants.is_empty() {
        return Err(ServiceError::InvalidInput(
            "a game needs at least one contestant".into(),
        ));
    }

    let mut contestants: IndexMap<ContestantId, Contestant> = IndexMap::new();
    for input in request.contestants {
        let ContestantInput {
            id,
            name,
            color,
            power_ups,
        } = input;
        let id = id.unwrap_or_else(Uuid::new_v4);
        if contestants.contains_key(&id) {
            return Err(ServiceError::InvalidInput(format!(
                "contestant `{id}` is listed twice"
            )));
        }
        let color = color.unwrap_or_else(|| {
            config.first_unused_color(
                contestants
                    .values()
                    .map(|contestant| contestant.color.as_str()),
            )
        });
        contestants.insert(id, Contestant::new(name.trim().to_string(), color, power_ups));
    }

    let mut seen: Vec<QuestionId> = Vec::new();
    let mut rounds = Vec::with_capacity(request.rounds.len());
    for round in request.rounds {
        let mut categories = Vec::with_capacity(round.categories.len());
        for category in round.categories {
            let mut questions = Vec::with_capacity(category.questions.len());
            for input in category.questions {
                let question = build_question(input, round.kind);
                if seen.contains(&question.id) {
                    return Err(ServiceError::InvalidInput(format!(
                        "question `{}` is listed twice",
                        question.id
                    )));
                }
                seen.push(question.id);
                questions.push(question);
            }
            categories.push(Category {
                name: category.name,
                buzz_time_s: category.buzz_time_s,
                questions,
            });
        }
        rounds.push(Round {
            name: round.name,
            kind: round.kind,
            categories,
        });
    }

    Ok(Game::new(request.title, rounds, contestants))
}

fn build_question(input: QuestionInput, kind: RoundKind) -> Question {
    let answer = match input.answer {
        AnswerInput::Open { text } => Answer::Open(text),
        AnswerInput::Choices { choices, correct } => Answer::Choices { choices, correct },
    };
    Question {
        id: input.id.unwrap_or_else(Uuid::new_v4),
        prompt: input.prompt,
        answer,
        value: input.value,
        tips: input.tips,
        media: input.media,
        buzz_time_s: input.buzz_time_s,
        is_daily_double: input.daily_double || kind == RoundKind::DailyDouble,
        is_finale: kind == RoundKind::Finale,
        status: QuestionStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> LoadGameRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn palette_colors_are_handed_out_in_order() {
        let config = AppConfig {
            colors: vec!["#111111".into(), "#222222".into()],
            ..AppConfig::default()
        };
        let game = build_game(
            &config,
            request(
                r##"{
                    "title": "Quiz",
                    "rounds": [{ "name": "R1", "categories": [] }],
                    "contestants": [
                        { "name": "Ada", "color": "#111111" },
                        { "name": "Grace" }
                    ]
                }"##,
            ),
        )
        .unwrap();
        let colors: Vec<&str> = game
            .contestants
            .values()
            .map(|contestant| contestant.color.as_str())
            .collect();
        assert_eq!(colors, vec!["#111111", "#222222"]);
    }

    #[test]
    fn round_kind_drives_the_question_variant() {
        let game = build_game(
            &AppConfig::default(),
            request(
                r#"{
                    "title": "Quiz",
                    "rounds": [{
                        "name": "Final",
                        "kind": "finale",
                        "categories": [{
                            "name": "History",
                            "questions": [{
                                "prompt": "First computer programmer?",
                                "answer": { "kind": "open", "text": "Ada Lovelace" },
                                "value": 0
                            }]
                        }]
                    }],
                    "contestants": [{ "name": "Ada" }]
                }"#,
            ),
        )
        .unwrap();
        let question = &game.rounds[0].categories[0].questions[0];
        assert!(question.is_finale);
        assert!(!question.is_daily_double);
    }

    #[test]
    fn duplicate_contestants_are_refused() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{
                "title": "Quiz",
                "rounds": [{{ "name": "R1", "categories": [] }}],
                "contestants": [{{ "id": "{id}", "name": "Ada" }}, {{ "id": "{id}", "name": "Bob" }}]
            }}"#
        );
        assert!(matches!(
            build_game(&AppConfig::default(), request(&json)),
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
