//! Shared fixtures for the service test suites.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
    time::Duration,
};

use futures::future::{BoxFuture, ready};

use crate::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        models::{CellEntity, GameEntity},
        storage::{StorageError, StorageResult},
    },
    dto::game::CreateGameRequest,
    state::{AppState, SharedState},
};

/// Application state backed by a fresh in-memory store; the store handle is
/// returned so tests can tamper with records directly.
pub(crate) async fn memory_state() -> (SharedState, MemoryGameStore) {
    let store = MemoryGameStore::new();
    let state = AppState::new(&AppConfig::default());
    state.set_game_store(Arc::new(store.clone())).await;
    (state, store)
}

/// Application state backed by a [`FaultyStore`] wrapping a fresh memory store.
pub(crate) async fn faulty_state() -> (SharedState, Arc<FaultyStore>) {
    faulty_state_with(&AppConfig::default()).await
}

pub(crate) async fn faulty_state_with(config: &AppConfig) -> (SharedState, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore::default());
    let state = AppState::new(config);
    state.set_game_store(store.clone()).await;
    (state, store)
}

pub(crate) fn create_request(game_id: &str, a: &str, b: &str) -> CreateGameRequest {
    CreateGameRequest {
        game_id: game_id.into(),
        participant_a: a.into(),
        participant_b: b.into(),
    }
}

/// Memory store that fails selected writes on demand.
pub(crate) struct FaultyStore {
    inner: MemoryGameStore,
    fail_game_writes: AtomicBool,
    fail_deletes: AtomicBool,
    /// Cell writes allowed before failing; negative means unlimited.
    cell_write_budget: AtomicI64,
    cell_write_delay: Mutex<Option<Duration>>,
}

impl Default for FaultyStore {
    fn default() -> Self {
        Self {
            inner: MemoryGameStore::new(),
            fail_game_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            cell_write_budget: AtomicI64::new(-1),
            cell_write_delay: Mutex::new(None),
        }
    }
}

impl FaultyStore {
    pub(crate) fn fail_game_writes(&self, fail: bool) {
        self.fail_game_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn allow_cell_writes(&self, budget: i64) {
        self.cell_write_budget.store(budget, Ordering::SeqCst);
    }

    /// Sleep this long before every cell write lands.
    pub(crate) fn slow_cell_writes(&self, delay: Option<Duration>) {
        *self.cell_write_delay.lock().unwrap() = delay;
    }

    pub(crate) fn inner(&self) -> &MemoryGameStore {
        &self.inner
    }

    fn injected<T: Send + 'static>(operation: &str) -> BoxFuture<'static, StorageResult<T>> {
        let err = StorageError::unavailable(
            format!("injected failure in {operation}"),
            io::Error::other("injected"),
        );
        Box::pin(ready(Err(err)))
    }

    fn take_cell_write(&self) -> bool {
        self.cell_write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| match budget {
                b if b < 0 => Some(b),
                0 => None,
                b => Some(b - 1),
            })
            .is_ok()
    }
}

impl GameStore for FaultyStore {
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        self.inner.find_game(id)
    }

    fn put_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_game_writes.load(Ordering::SeqCst) {
            return Self::injected("put_game");
        }
        self.inner.put_game(game)
    }

    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Self::injected("delete_game");
        }
        self.inner.delete_game(id)
    }

    fn find_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<Option<CellEntity>>> {
        self.inner.find_cell(game_id, row, col)
    }

    fn list_cells(&self, game_id: String) -> BoxFuture<'static, StorageResult<Vec<CellEntity>>> {
        self.inner.list_cells(game_id)
    }

    fn put_cell(&self, cell: CellEntity) -> BoxFuture<'static, StorageResult<()>> {
        if !self.take_cell_write() {
            return Self::injected("put_cell");
        }
        match *self.cell_write_delay.lock().unwrap() {
            Some(delay) => {
                let inner = self.inner.clone();
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    inner.put_cell(cell).await
                })
            }
            None => self.inner.put_cell(cell),
        }
    }

    fn delete_cell(
        &self,
        game_id: String,
        row: u8,
        col: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Self::injected("delete_cell");
        }
        self.inner.delete_cell(game_id, row, col)
    }

    fn list_game_ids(&self) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        self.inner.list_game_ids()
    }

    fn count_cells(&self) -> BoxFuture<'static, StorageResult<u64>> {
        self.inner.count_cells()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
