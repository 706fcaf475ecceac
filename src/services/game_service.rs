use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        models::{CellEntity, GameEntity},
    },
    dto::game::{
        CreateGameRequest, GameListItem, GameListResponse, GameStateResponse, GameSummary,
        ResetResponse,
    },
    error::ServiceError,
    services::{outcome_service::load_board, sse_events},
    state::{Deadline, SharedState},
};

/// Register a new game together with its nine unclaimed cells.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameSummary, ServiceError> {
    let CreateGameRequest {
        game_id,
        participant_a,
        participant_b,
    } = request;

    if game_id.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "game id must not be empty".into(),
        ));
    }
    if participant_a.trim().is_empty() || participant_b.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "participant ids must not be empty".into(),
        ));
    }
    if participant_a == participant_b {
        return Err(ServiceError::InvalidInput(format!(
            "participants must be distinct, got `{participant_a}` twice"
        )));
    }

    let store = state.require_game_store().await?;
    let deadline = state.deadline();

    let game = state
        .run_exclusive(&game_id, deadline, || async {
            let existing_game = deadline.bound(store.find_game(game_id.clone())).await?;
            let existing_cells = deadline.bound(store.list_cells(game_id.clone())).await?;
            if existing_game.is_some() || !existing_cells.is_empty() {
                return Err(ServiceError::AlreadyExists(game_id.clone()));
            }

            let game = GameEntity::new(game_id.clone(), participant_a, participant_b);
            if let Err(err) = persist_new_game(&store, &game, deadline).await {
                warn!(game_id = %game.id, error = %err, "game creation failed; rolling back");
                rollback_creation(&store, &game.id).await?;
                return Err(err);
            }
            Ok(game)
        })
        .await?;

    info!(
        game_id = %game.id,
        participant_a = %game.participant_a,
        participant_b = %game.participant_b,
        "game created"
    );

    let summary = GameSummary::from(game.clone());
    sse_events::broadcast_game_created(state, GameSummary::from(game));
    Ok(summary)
}

/// Write the game record, then its cells, each write bounded by `deadline`.
async fn persist_new_game(
    store: &Arc<dyn GameStore>,
    game: &GameEntity,
    deadline: Deadline,
) -> Result<(), ServiceError> {
    deadline.bound(store.put_game(game.clone())).await?;
    for cell in CellEntity::full_board(&game.id) {
        deadline.bound(store.put_cell(cell)).await?;
    }
    Ok(())
}

/// Remove whatever a failed creation managed to write. Runs without a deadline
/// so an expired creation still leaves nothing behind.
async fn rollback_creation(store: &Arc<dyn GameStore>, game_id: &str) -> Result<(), ServiceError> {
    let result = async {
        for cell in store.list_cells(game_id.to_owned()).await? {
            store
                .delete_cell(game_id.to_owned(), cell.row, cell.col)
                .await?;
        }
        store.delete_game(game_id.to_owned()).await?;
        Ok::<_, ServiceError>(())
    }
    .await;

    result.map_err(|err| {
        error!(game_id, error = %err, "rollback of failed game creation failed");
        ServiceError::PartialState {
            game_id: game_id.to_owned(),
            reason: format!("creation failed and could not be rolled back: {err}"),
        }
    })
}

/// Delete a game and every cell it owns, returning how many cells were removed.
pub async fn reset_game(state: &SharedState, game_id: &str) -> Result<ResetResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let deadline = state.deadline();

    let removed = state
        .run_exclusive(game_id, deadline, || async {
            if deadline
                .bound(store.find_game(game_id.to_owned()))
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!("game `{game_id}`")));
            }

            // Deletions are not bounded: stopping halfway would strand a game
            // missing some of its cells.
            let cells = deadline.bound(store.list_cells(game_id.to_owned())).await?;
            let mut removed = 0u64;
            for cell in cells {
                if store
                    .delete_cell(game_id.to_owned(), cell.row, cell.col)
                    .await?
                {
                    removed += 1;
                }
            }
            store.delete_game(game_id.to_owned()).await?;
            Ok(removed)
        })
        .await?;

    if removed == 0 {
        warn!(game_id, "reset found a game without cells; prior creation was incomplete");
    } else {
        info!(game_id, removed, "game reset");
    }

    sse_events::broadcast_game_reset(state, game_id, removed);
    Ok(ResetResponse::new(game_id.to_owned(), removed))
}

/// Board view of one game: participants, cells and current outcome.
pub async fn get_game_state(
    state: &SharedState,
    game_id: &str,
) -> Result<GameStateResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let deadline = state.deadline();

    let board = state
        .run_exclusive(game_id, deadline, || {
            deadline.bound(load_board(&store, game_id))
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}`")))?;

    Ok(GameStateResponse::from(&board))
}

/// Enumerate every stored game with its outcome and the total cell count.
pub async fn list_games(state: &SharedState) -> Result<GameListResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let ids = store.list_game_ids().await?;
    let total_cells = store.count_cells().await?;

    let mut games = Vec::with_capacity(ids.len());
    for id in ids {
        let deadline = state.deadline();
        let loaded = state
            .run_exclusive(&id, deadline, || deadline.bound(load_board(&store, &id)))
            .await;
        let item = match loaded {
            Ok(Some(board)) => {
                let outcome = board.outcome();
                GameListItem {
                    id,
                    outcome: outcome.tag().to_string(),
                    winner: outcome.winner().map(str::to_owned),
                }
            }
            // Removed between the listing and the load.
            Ok(None) => continue,
            Err(ServiceError::PartialState { .. }) => GameListItem {
                id,
                outcome: "partial_state".to_string(),
                winner: None,
            },
            Err(err) => return Err(err),
        };
        games.push(item);
    }

    let message = format!(
        "Total Number of Moves: {total_cells} | Games Found: {}",
        games.len()
    );
    Ok(GameListResponse {
        total_cells,
        games,
        message,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        services::{
            move_service::{MoveResult, apply_move},
            outcome_service,
            test_support::{create_request, faulty_state, faulty_state_with, memory_state},
        },
        state::board::Outcome,
    };

    #[tokio::test]
    async fn create_persists_nine_unclaimed_labelled_cells() {
        let (state, store) = memory_state().await;
        let summary = create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
        assert_eq!(summary.id, "g1");
        assert_eq!(
            summary.message,
            "New Game Created, ID: g1 | Player 1: A | Player 2: B"
        );

        let cells = store.list_cells("g1".into()).await.unwrap();
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|cell| !cell.claimed && cell.occupant.is_none()));
        assert!(cells.iter().any(|cell| cell.label == "[1,2]"));

        let game = store.find_game("g1".into()).await.unwrap().unwrap();
        assert_eq!(game.last_mover, None);
        assert_eq!(game.moves_played, 0);
    }

    #[tokio::test]
    async fn duplicate_identifier_is_rejected() {
        let (state, store) = memory_state().await;
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
        assert!(matches!(
            create_game(&state, create_request("g1", "C", "D")).await,
            Err(ServiceError::AlreadyExists(id)) if id == "g1"
        ));
        let game = store.find_game("g1".into()).await.unwrap().unwrap();
        assert_eq!(game.participant_a, "A");
    }

    #[tokio::test]
    async fn leftover_cells_block_creation() {
        let (state, store) = memory_state().await;
        store
            .put_cell(CellEntity::unclaimed("g1", 0, 0))
            .await
            .unwrap();
        assert!(matches!(
            create_game(&state, create_request("g1", "A", "B")).await,
            Err(ServiceError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn invalid_participants_are_rejected() {
        let (state, store) = memory_state().await;
        for request in [
            create_request("", "A", "B"),
            create_request("g1", " ", "B"),
            create_request("g1", "A", "A"),
        ] {
            assert!(matches!(
                create_game(&state, request).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }
        assert!(store.list_game_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_creation_is_rolled_back() {
        let (state, store) = faulty_state().await;
        store.allow_cell_writes(4);

        assert!(matches!(
            create_game(&state, create_request("g1", "A", "B")).await,
            Err(ServiceError::StorageFailure(_))
        ));
        assert!(store.inner().find_game("g1".into()).await.unwrap().is_none());
        assert_eq!(store.inner().count_cells().await.unwrap(), 0);

        store.allow_cell_writes(-1);
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_rollback_is_partial_state() {
        let (state, store) = faulty_state().await;
        store.allow_cell_writes(2);
        store.fail_deletes(true);

        assert!(matches!(
            create_game(&state, create_request("g1", "A", "B")).await,
            Err(ServiceError::PartialState { .. })
        ));
        assert!(matches!(
            outcome_service::evaluate(&state, "g1").await,
            Err(ServiceError::PartialState { .. })
        ));
    }

    #[tokio::test]
    async fn creation_cut_short_by_the_deadline_is_rolled_back() {
        let config =
            AppConfig::default().with_operation_timeout(Some(Duration::from_millis(100)));
        let (state, store) = faulty_state_with(&config).await;
        store.slow_cell_writes(Some(Duration::from_millis(30)));

        assert!(matches!(
            create_game(&state, create_request("g1", "A", "B")).await,
            Err(ServiceError::Timeout)
        ));
        assert!(store.inner().find_game("g1".into()).await.unwrap().is_none());
        assert_eq!(store.inner().count_cells().await.unwrap(), 0);
        assert_eq!(
            outcome_service::evaluate(&state, "g1").await.unwrap(),
            Outcome::NotFound
        );

        store.slow_cell_writes(None);
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_creation_with_failed_rollback_is_partial_state() {
        let config =
            AppConfig::default().with_operation_timeout(Some(Duration::from_millis(100)));
        let (state, store) = faulty_state_with(&config).await;
        store.slow_cell_writes(Some(Duration::from_millis(30)));
        store.fail_deletes(true);

        assert!(matches!(
            create_game(&state, create_request("g1", "A", "B")).await,
            Err(ServiceError::PartialState { game_id, .. }) if game_id == "g1"
        ));
    }

    #[tokio::test]
    async fn reset_of_unknown_game_is_not_found() {
        let (state, _) = memory_state().await;
        assert!(matches!(
            reset_game(&state, "nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reset_removes_all_cells_and_the_game() {
        let (state, store) = memory_state().await;
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
        create_game(&state, create_request("g2", "C", "D"))
            .await
            .unwrap();
        assert!(matches!(
            apply_move(&state, "g1", 0, 0, "A").await.unwrap(),
            MoveResult::Accepted { .. }
        ));

        let response = reset_game(&state, "g1").await.unwrap();
        assert_eq!(response.removed_cells, 9);
        assert_eq!(
            response.message,
            "Game Reset Complete, deleted 9 moves for Game: g1"
        );

        assert_eq!(
            outcome_service::evaluate(&state, "g1").await.unwrap(),
            Outcome::NotFound
        );
        assert!(matches!(
            apply_move(&state, "g1", 1, 1, "B").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(store.count_cells().await.unwrap(), 9);

        // The identifier can be reused once reset.
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reset_of_game_without_cells_reports_zero() {
        let (state, store) = memory_state().await;
        store
            .put_game(GameEntity::new("bare".into(), "A".into(), "B".into()))
            .await
            .unwrap();
        let response = reset_game(&state, "bare").await.unwrap();
        assert_eq!(response.removed_cells, 0);
        assert!(store.find_game("bare".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_view_renders_occupants_and_labels() {
        let (state, _) = memory_state().await;
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
        apply_move(&state, "g1", 0, 0, "A").await.unwrap();

        let view = get_game_state(&state, "g1").await.unwrap();
        assert_eq!(view.last_mover.as_deref(), Some("A"));
        assert_eq!(view.rows[0], vec!["A", "[0,1]", "[0,2]"]);
        assert_eq!(view.participants_moved, vec!["A"]);
        assert_eq!(view.outcome.outcome, "undetermined");

        assert!(matches!(
            get_game_state(&state, "nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_reports_every_game_and_flags_corruption() {
        let (state, store) = memory_state().await;
        create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
        create_game(&state, create_request("g2", "C", "D"))
            .await
            .unwrap();
        store.delete_cell("g2".into(), 2, 2).await.unwrap();

        let listing = list_games(&state).await.unwrap();
        assert_eq!(listing.total_cells, 17);
        let tags = listing
            .games
            .iter()
            .map(|item| (item.id.as_str(), item.outcome.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(tags, vec![("g1", "undetermined"), ("g2", "partial_state")]);
        assert_eq!(state.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn degraded_state_refuses_operations() {
        let (state, _) = memory_state().await;
        state.clear_game_store().await;
        assert!(matches!(
            create_game(&state, create_request("g1", "A", "B")).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(list_games(&state).await, Err(ServiceError::Degraded)));
    }
}
