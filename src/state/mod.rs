pub mod coordinator;
pub mod game;
pub mod session;
mod sse;

use std::{sync::Arc, time::Duration};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::score_store::{MemoryScoreStore, ScoreStore},
    dto::ws::ContestantOutboundMessage,
    error::ServiceError,
    services::websocket_service::send_message_to_websocket,
    state::{
        coordinator::{
            Command, ContestantAction, Coordinator, Greeting, PresenterAction, PresenterOutcome,
        },
        game::ContestantId,
    },
};

pub use self::sse::SseHub;
use self::sse::SseState;

pub type SharedState = Arc<AppState>;
/// Longest a presenter request waits for the coordinator.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const COMMAND_CAPACITY: usize = 256;
const SSE_CAPACITY: usize = 256;

#[derive(Clone)]
/// Handle used to push messages to a connected contestant device.
pub struct ContestantConnection {
    pub id: ContestantId,
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: connections, SSE hubs and the handle to the game coordinator.
///
/// The game itself is owned by the coordinator task; everything here only talks to it
/// through the command queue.
pub struct AppState {
    config: Arc<AppConfig>,
    sse: SseState,
    contestants: DashMap<ContestantId, ContestantConnection>,
    score_store: Arc<dyn ScoreStore>,
    commands: mpsc::Sender<Command>,
    command_timeout: Duration,
}

impl AppState {
    /// Build the state with an in-memory score store and start the coordinator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_score_store(config, Arc::new(MemoryScoreStore::new()))
    }

    /// Build the state around `score_store` and start the coordinator.
    pub fn with_score_store(config: AppConfig, score_store: Arc<dyn ScoreStore>) -> SharedState {
        let config = Arc::new(config);
        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let state = Arc::new(Self {
            config: config.clone(),
            sse: SseState::new(SSE_CAPACITY, SSE_CAPACITY),
            contestants: DashMap::new(),
            score_store,
            commands,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        });

        let coordinator = Coordinator::new(Arc::downgrade(&state), config);
        tokio::spawn(coordinator.run(receiver));
        state
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the presenter SSE stream.
    pub fn presenter_sse(&self) -> &SseHub {
        self.sse.presenter().hub()
    }

    /// Token guard that ensures a single presenter SSE subscriber at a time.
    pub fn presenter_token(&self) -> &Mutex<Option<String>> {
        self.sse.presenter().token()
    }

    /// Registry of open contestant sockets.
    pub fn contestants(&self) -> &DashMap<ContestantId, ContestantConnection> {
        &self.contestants
    }

    /// Where closed questions are recorded.
    pub fn score_store(&self) -> Arc<dyn ScoreStore> {
        self.score_store.clone()
    }

    /// Whether the coordinator task still accepts commands.
    pub fn coordinator_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Queue a contestant action. Its outcome reaches the contestant over the socket.
    pub async fn send_contestant_action(
        &self,
        id: ContestantId,
        action: ContestantAction,
    ) -> Result<(), ServiceError> {
        self.commands
            .send(Command::Contestant { id, action })
            .await
            .map_err(|_| ServiceError::CoordinatorGone)
    }

    /// Ask the coordinator how to greet contestant `id`, `None` when it is not in the game.
    pub async fn identify_contestant(
        &self,
        id: ContestantId,
    ) -> Result<Option<Greeting>, ServiceError> {
        self.request(|reply| Command::Identify { id, reply }).await
    }

    /// Run a presenter action and wait for its outcome.
    pub async fn run_presenter_action(
        &self,
        action: PresenterAction,
    ) -> Result<PresenterOutcome, ServiceError> {
        self.request(|reply| Command::Presenter { action, reply })
            .await?
            .map_err(ServiceError::from)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();
        let exchange = async {
            self.commands
                .send(build(reply))
                .await
                .map_err(|_| ServiceError::CoordinatorGone)?;
            response.await.map_err(|_| ServiceError::CoordinatorGone)
        };

        match timeout(self.command_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = self.command_timeout.as_millis() as u64,
                    "coordinator did not answer in time"
                );
                Err(ServiceError::Timeout)
            }
        }
    }

    /// Push a message to contestant `id` if its device is connected.
    ///
    /// A connection whose writer is gone is dropped from the registry.
    pub fn notify_contestant(&self, id: ContestantId, message: &ContestantOutboundMessage) {
        let Some(tx) = self.contestants.get(&id).map(|entry| entry.tx.clone()) else {
            return;
        };
        if send_message_to_websocket(&tx, message).is_err() {
            warn!(contestant = %id, "send failed (writer closed), removing contestant connection");
            self.contestants.remove(&id);
        }
    }

    /// Push a message to every connected contestant.
    pub fn notify_all_contestants(&self, message: &ContestantOutboundMessage) {
        let ids: Vec<ContestantId> = self.contestants.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.notify_contestant(id, message);
        }
    }
}
