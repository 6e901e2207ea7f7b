use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Jeoparty Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::presenter_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::presenter::load_game,
        crate::routes::presenter::get_game,
        crate::routes::presenter::choose_first_turn,
        crate::routes::presenter::open_question,
        crate::routes::presenter::reveal,
        crate::routes::presenter::judge,
        crate::routes::presenter::abort,
        crate::routes::presenter::undo,
        crate::routes::presenter::advance,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ContestantInboundMessage,
            crate::dto::ws::ContestantOutboundMessage,
            crate::dto::sse::Handshake,
            crate::dto::sse::PhaseChangedEvent,
            crate::dto::sse::QuestionRevealedEvent,
            crate::dto::sse::BuzzEnabledEvent,
            crate::dto::sse::BuzzReceivedEvent,
            crate::dto::sse::BuzzWinnerEvent,
            crate::dto::sse::BuzzLosersEvent,
            crate::dto::sse::PowerUpEvent,
            crate::dto::sse::PowerUpsDisabledEvent,
            crate::dto::sse::FreezeStartedEvent,
            crate::dto::sse::CountdownEvent,
            crate::dto::sse::CountdownStoppedEvent,
            crate::dto::sse::TipRevealedEvent,
            crate::dto::sse::ChoiceEliminatedEvent,
            crate::dto::sse::ScoreDeltaEvent,
            crate::dto::sse::ScoreChangedEvent,
            crate::dto::sse::AnswerRevealedEvent,
            crate::dto::sse::WagerPlacedEvent,
            crate::dto::sse::WagerAcceptedEvent,
            crate::dto::sse::FinaleAnswerReceivedEvent,
            crate::dto::sse::FinaleAnswerShownEvent,
            crate::dto::sse::QuestionClosedEvent,
            crate::dto::sse::TurnChangedEvent,
            crate::dto::presenter::LoadGameRequest,
            crate::dto::presenter::JudgeRequest,
            crate::dto::presenter::GameSnapshot,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "contestants", description = "WebSocket operations for contestant devices"),
        (name = "presenter", description = "Presenter controls for the live game"),
    )
)]
pub struct ApiDoc;
