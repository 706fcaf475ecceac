pub mod board;
mod sse;

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::{Instant, timeout_at};
use tracing::warn;

use crate::{config::AppConfig, dao::game_store::GameStore, error::ServiceError};

pub use self::sse::EventHub;

/// Handle to the application state shared by handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Central application state: the storage handle, per-game locks and the event hub.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    events: EventHub,
    game_locks: DashMap<String, Arc<Mutex<()>>>,
    degraded: watch::Sender<bool>,
    operation_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: &AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            events: EventHub::new(config.event_capacity()),
            game_locks: DashMap::new(),
            degraded: degraded_tx,
            operation_timeout: config.operation_timeout(),
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast hub used for the game event stream.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Deadline for a game operation starting now, derived from the operation timeout.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.operation_timeout)
    }

    /// Run `work` while holding the lock of `game_id`.
    ///
    /// Operations on the same game are serialized; different games never wait on
    /// each other. `deadline` bounds the wait for the lock. Once the lock is held,
    /// `work` runs to completion and decides itself which steps to bound with
    /// [`Deadline::bound`], so a multi-write sequence is never cut in half.
    pub async fn run_exclusive<F, Fut, T>(
        &self,
        game_id: &str,
        deadline: Deadline,
        work: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let lock = self
            .game_locks
            .entry(game_id.to_owned())
            .or_default()
            .clone();

        let outcome = match deadline
            .bound(async { Ok::<_, ServiceError>(lock.lock().await) })
            .await
        {
            Ok(_guard) => work().await,
            Err(err) => Err(err),
        };

        if matches!(outcome, Err(ServiceError::Timeout)) {
            warn!(game_id, "game operation timed out");
        }

        // Only the map and this call hold the lock: nobody is waiting on it.
        self.game_locks
            .remove_if(game_id, |_, entry| Arc::strong_count(entry) == 2);

        outcome
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.game_locks.len()
    }
}

/// Point in time after which a game operation stops waiting on storage.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// Deadline `limit` from now; `None` never expires.
    pub fn after(limit: Option<Duration>) -> Self {
        Self(limit.map(|limit| Instant::now() + limit))
    }

    /// Await `step`, failing with [`ServiceError::Timeout`] once the deadline has
    /// passed. An expired step is dropped, so only bound steps that are safe to
    /// abandon.
    pub async fn bound<T, E>(
        &self,
        step: impl Future<Output = Result<T, E>>,
    ) -> Result<T, ServiceError>
    where
        E: Into<ServiceError>,
    {
        match self.0 {
            Some(at) => match timeout_at(at, step).await {
                Ok(result) => result.map_err(Into::into),
                Err(_) => Err(ServiceError::Timeout),
            },
            None => step.await.map_err(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::sleep;

    use super::*;

    #[tokio::test]
    async fn slow_bounded_step_times_out_and_releases_its_lock() {
        let config = AppConfig::default().with_operation_timeout(Some(Duration::from_millis(20)));
        let state = AppState::new(&config);
        let deadline = state.deadline();

        let result = state
            .run_exclusive("g1", deadline, || async {
                deadline
                    .bound(async {
                        sleep(Duration::from_secs(5)).await;
                        Ok::<_, ServiceError>(())
                    })
                    .await
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert_eq!(state.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn waiting_for_a_held_lock_times_out() {
        let config = AppConfig::default().with_operation_timeout(Some(Duration::from_millis(20)));
        let state = AppState::new(&config);

        let holder = {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .run_exclusive("g1", Deadline::after(None), || async {
                        sleep(Duration::from_millis(200)).await;
                        Ok(())
                    })
                    .await
            })
        };
        sleep(Duration::from_millis(10)).await;

        let waited = state
            .run_exclusive("g1", state.deadline(), || async { Ok(()) })
            .await;
        assert!(matches!(waited, Err(ServiceError::Timeout)));

        holder.await.unwrap().unwrap();
        assert_eq!(state.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn unbounded_work_outlives_the_deadline() {
        let config = AppConfig::default().with_operation_timeout(Some(Duration::from_millis(10)));
        let state = AppState::new(&config);

        let result = state
            .run_exclusive("g1", state.deadline(), || async {
                sleep(Duration::from_millis(40)).await;
                Ok(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn operations_on_one_game_never_overlap() {
        let state = AppState::new(&AppConfig::default());
        let active = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6)
            .map(|_| {
                let state = state.clone();
                let active = active.clone();
                tokio::spawn(async move {
                    state
                        .run_exclusive("g1", state.deadline(), || async {
                            assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                            sleep(Duration::from_millis(5)).await;
                            active.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(state.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn installing_a_store_leaves_degraded_mode() {
        let state = AppState::new(&AppConfig::default());
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_game_store(Arc::new(crate::dao::game_store::memory::MemoryGameStore::new()))
            .await;
        assert!(!state.is_degraded().await);

        state.clear_game_store().await;
        assert!(state.is_degraded().await);
    }
}
