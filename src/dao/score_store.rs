use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use uuid::Uuid;

use crate::{
    dao::storage::{StorageError, StorageResult},
    engine::events::ScoreDelta,
};

/// Abstraction over where final question deltas end up.
pub trait ScoreStore: Send + Sync {
    /// Append the deltas that stuck once a question closed.
    fn record_deltas(
        &self,
        game_id: Uuid,
        deltas: Vec<ScoreDelta>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Every delta recorded for a game, in recording order.
    fn deltas(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreDelta>>>;
    /// Check that the backend is usable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Process-local store, the default backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    deltas: Arc<DashMap<Uuid, Vec<ScoreDelta>>>,
    closed: Arc<AtomicBool>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every further operation.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

impl ScoreStore for MemoryScoreStore {
    fn record_deltas(
        &self,
        game_id: Uuid,
        deltas: Vec<ScoreDelta>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.ensure_open().map(|()| {
            self.deltas.entry(game_id).or_default().extend(deltas);
        });
        Box::pin(future::ready(result))
    }

    fn deltas(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<ScoreDelta>>> {
        let result = self.ensure_open().map(|()| {
            self.deltas
                .get(&game_id)
                .map(|entry| entry.value().clone())
                .unwrap_or_default()
        });
        Box::pin(future::ready(result))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(self.ensure_open()))
    }
}
