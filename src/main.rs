//! tictactoe-back binary entrypoint wiring REST, SSE, and the configured storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tictactoe_back::{
    config::{AppConfig, StorageBackend},
    dao::game_store::memory::MemoryGameStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(&config);

    start_storage(app_state.clone(), config.storage()).await;
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the in-memory store right away, or hand database backends to the
/// storage supervisor, which keeps the app degraded until they answer.
async fn start_storage(state: SharedState, backend: StorageBackend) {
    match backend {
        StorageBackend::Memory => {
            info!("using in-memory storage; games are lost on restart");
            state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        }
        #[cfg(feature = "mongo-store")]
        StorageBackend::Mongo => {
            use tictactoe_back::dao::{
                game_store::{
                    GameStore,
                    mongodb::{MongoConfig, MongoGameStore},
                },
                storage::StorageError,
            };
            use tictactoe_back::services::storage_supervisor;

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
                let store = MongoGameStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn GameStore>)
            }));
        }
        #[cfg(feature = "couch-store")]
        StorageBackend::Couch => {
            use tictactoe_back::dao::{
                game_store::{
                    GameStore,
                    couchdb::{CouchConfig, CouchGameStore},
                },
                storage::StorageError,
            };
            use tictactoe_back::services::storage_supervisor;

            tokio::spawn(storage_supervisor::run(state, || async {
                let config = CouchConfig::from_env().map_err(StorageError::from)?;
                let store = CouchGameStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn GameStore>)
            }));
        }
        #[allow(unreachable_patterns)]
        other => warn!(
            backend = ?other,
            "storage backend not compiled in; staying in degraded mode"
        ),
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
