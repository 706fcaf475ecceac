use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Exponential backoff capped at [`MAX_DELAY`].
struct Backoff {
    next: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            next: INITIAL_DELAY,
        }
    }

    async fn wait(&mut self) {
        sleep(self.next).await;
        self.next = (self.next * 2).min(MAX_DELAY);
    }
}

/// Keep a storage backend installed in the shared state, reconnecting with
/// backoff and switching to degraded mode while it is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut backoff = Backoff::new();

    loop {
        match connect().await {
            Ok(store) => {
                state.set_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                backoff = Backoff::new();

                watch_health(&state, store.as_ref()).await;

                warn!("exhausted storage reconnect attempts; dropping the store handle");
                state.clear_game_store().await;
            }
            Err(err) => warn!(error = %err, "storage connection attempt failed"),
        }
        backoff.wait().await;
    }
}

/// Poll the installed store until it fails and cannot be revived in place.
async fn watch_health(state: &SharedState, store: &dyn GameStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                if !reconnect_in_place(state, store).await {
                    return;
                }
                state.update_degraded(false).await;
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect_in_place(state: &SharedState, store: &dyn GameStore) -> bool {
    let mut backoff = Backoff::new();
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "storage reconnect failed; entering degraded mode");
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                backoff.wait().await;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState};

    #[tokio::test]
    async fn successful_connection_leaves_degraded_mode() {
        let state = AppState::new(&AppConfig::default());
        let mut watcher = state.degraded_watcher();
        assert!(*watcher.borrow());

        let supervisor = tokio::spawn(run(state.clone(), || async {
            Ok(Arc::new(MemoryGameStore::new()) as Arc<dyn GameStore>)
        }));

        timeout(Duration::from_secs(2), watcher.wait_for(|degraded| !degraded))
            .await
            .unwrap()
            .unwrap();
        assert!(state.game_store().await.is_some());
        supervisor.abort();
    }
}
