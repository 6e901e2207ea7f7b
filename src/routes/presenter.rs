use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::presenter::{
        ActionResponse, FirstTurnResponse, GameSnapshot, JudgeRequest, JudgeResponse,
        LoadGameRequest,
    },
    error::AppError,
    services::presenter_service,
    state::SharedState,
};

const PRESENTER_TOKEN_HEADER: &str = "x-presenter-token";

/// Presenter-only endpoints driving the live game.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/presenter/game", get(get_game).post(load_game))
        .route("/presenter/turn", post(choose_first_turn))
        .route("/presenter/questions/{id}/open", post(open_question))
        .route("/presenter/question/reveal", post(reveal))
        .route("/presenter/question/judge", post(judge))
        .route("/presenter/question/abort", post(abort))
        .route("/presenter/question/undo", post(undo))
        .route("/presenter/question/advance", post(advance))
        .route_layer(middleware::from_fn_with_state(state, require_presenter_token))
}

/// Load a game: board and contestants.
#[utoipa::path(
    post,
    path = "/presenter/game",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    request_body = LoadGameRequest,
    responses(
        (status = 200, description = "Game loaded", body = GameSnapshot),
        (status = 400, description = "Invalid game description"),
        (status = 409, description = "A question is in play")
    )
)]
pub async fn load_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<LoadGameRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(presenter_service::load_game(&state, payload).await?))
}

/// Describe the loaded game, including the question in play.
#[utoipa::path(
    get,
    path = "/presenter/game",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    responses(
        (status = 200, description = "Current game", body = GameSnapshot),
        (status = 409, description = "No game loaded")
    )
)]
pub async fn get_game(State(state): State<SharedState>) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(presenter_service::snapshot(&state).await?))
}

/// Give the first turn to a random contestant.
#[utoipa::path(
    post,
    path = "/presenter/turn",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    responses((status = 200, description = "Turn assigned", body = FirstTurnResponse))
)]
pub async fn choose_first_turn(
    State(state): State<SharedState>,
) -> Result<Json<FirstTurnResponse>, AppError> {
    Ok(Json(presenter_service::choose_first_turn(&state).await?))
}

/// Put a question of the board in play.
#[utoipa::path(
    post,
    path = "/presenter/questions/{id}/open",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream"),
    ("id" = String, Path, description = "Identifier of the question to open")),
    responses(
        (status = 200, description = "Question opened", body = ActionResponse),
        (status = 404, description = "Unknown question"),
        (status = 409, description = "Question already played or another one is in play")
    )
)]
pub async fn open_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(presenter_service::open_question(&state, id).await?))
}

/// Show the prompt of the question in play.
#[utoipa::path(
    post,
    path = "/presenter/question/reveal",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    responses(
        (status = 200, description = "Prompt shown", body = ActionResponse),
        (status = 409, description = "Not allowed in the current phase")
    )
)]
pub async fn reveal(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(presenter_service::reveal(&state).await?))
}

/// Judge the current answer.
#[utoipa::path(
    post,
    path = "/presenter/question/judge",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    request_body = JudgeRequest,
    responses(
        (status = 200, description = "Answer judged", body = JudgeResponse),
        (status = 400, description = "Ambiguous verdict"),
        (status = 409, description = "Nobody is answering")
    )
)]
pub async fn judge(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<JudgeRequest>>,
) -> Result<Json<JudgeResponse>, AppError> {
    Ok(Json(presenter_service::judge(&state, payload).await?))
}

/// Close the question in play without scoring it.
#[utoipa::path(
    post,
    path = "/presenter/question/abort",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    responses((status = 200, description = "Question aborted", body = ActionResponse))
)]
pub async fn abort(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(presenter_service::abort(&state).await?))
}

/// Put the latest judgment back.
#[utoipa::path(
    post,
    path = "/presenter/question/undo",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    responses(
        (status = 200, description = "Judgment undone", body = ActionResponse),
        (status = 409, description = "Nothing to undo")
    )
)]
pub async fn undo(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(presenter_service::undo(&state).await?))
}

/// Close the resolved question, or start judging finale answers.
#[utoipa::path(
    post,
    path = "/presenter/question/advance",
    tag = "presenter",
    params(("X-Presenter-Token" = String, Header, description = "Presenter token issued by the /sse/presenter stream")),
    responses((status = 200, description = "Question advanced", body = ActionResponse))
)]
pub async fn advance(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(presenter_service::advance(&state).await?))
}

async fn require_presenter_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(PRESENTER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing presenter token header `X-Presenter-Token`".into())
        })?;

    let expected = {
        let guard = state.presenter_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid presenter token".into())),
        None => Err(AppError::Unauthorized(
            "presenter SSE stream not initialised yet".into(),
        )),
    }
}
