use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public SSE stream for the display", content_type = "text/event-stream", body = String))
)]
/// Stream realtime public events to the display.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_public(&state);
    info!("new public SSE connection");
    sse_service::broadcast_handshake(state.public_sse(), "public", None);
    sse_service::to_sse_stream(receiver, StreamKind::Public)
}

#[utoipa::path(
    get,
    path = "/sse/presenter",
    tag = "sse",
    responses(
        (status = 200, description = "Presenter SSE stream; the handshake carries the presenter token", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another presenter is connected")
    )
)]
/// Stream presenter-only events, issuing the presenter token.
pub async fn presenter_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let (receiver, token) = sse_service::subscribe_presenter(&state).await?;
    info!("new presenter SSE connection");
    sse_service::broadcast_handshake(state.presenter_sse(), "presenter", Some(token));
    Ok(sse_service::to_sse_stream(
        receiver,
        StreamKind::Presenter(state),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/presenter", get(presenter_stream))
}
