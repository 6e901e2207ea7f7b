use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod presenter;
pub mod sse;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(presenter::router(state.clone()));

    api_router.merge(docs::router()).with_state(state)
}
