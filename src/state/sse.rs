use tokio::sync::{Mutex, broadcast};

use crate::dto::sse::ServerEvent;

/// SSE-specific sub-state carved out from [`AppState`](super::AppState).
pub struct SseState {
    public: SseHub,
    presenter: PresenterSseState,
}

impl SseState {
    /// Build the SSE sub-tree with per-stream channel capacities.
    pub fn new(public_capacity: usize, presenter_capacity: usize) -> Self {
        Self {
            public: SseHub::new(public_capacity),
            presenter: PresenterSseState {
                hub: SseHub::new(presenter_capacity),
                token: Mutex::new(None),
            },
        }
    }

    /// Hub of the display stream.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Presenter hub and token.
    pub fn presenter(&self) -> &PresenterSseState {
        &self.presenter
    }
}

/// The presenter stream admits one subscriber, identified by the token it was handed.
pub struct PresenterSseState {
    hub: SseHub,
    token: Mutex<Option<String>>,
}

impl PresenterSseState {
    /// Hub of presenter-only events.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Token of the connected presenter, if any.
    pub fn token(&self) -> &Mutex<Option<String>> {
        &self.token
    }
}

/// Broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers. Events sent while nobody listens are dropped.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
