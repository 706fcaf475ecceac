use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dao::game_store::GameStore,
    dto::game::OutcomeResponse,
    error::ServiceError,
    state::{
        SharedState,
        board::{Board, Outcome},
    },
};

/// Load a game record and its cells and check that they agree.
///
/// Callers are expected to hold the game's lock.
pub(crate) async fn load_board(
    store: &Arc<dyn GameStore>,
    game_id: &str,
) -> Result<Option<Board>, ServiceError> {
    let game = store.find_game(game_id.to_owned()).await?;
    let cells = store.list_cells(game_id.to_owned()).await?;

    Board::assemble(game, cells).map_err(|err| {
        warn!(game_id, error = %err, "stored game is inconsistent");
        ServiceError::partial(game_id, err)
    })
}

/// Evaluate the board of `game_id`.
///
/// An unknown game is reported as [`Outcome::NotFound`] rather than an error.
pub async fn evaluate(state: &SharedState, game_id: &str) -> Result<Outcome, ServiceError> {
    let store = state.require_game_store().await?;

    let deadline = state.deadline();

    state
        .run_exclusive(game_id, deadline, || async {
            let outcome = deadline
                .bound(load_board(&store, game_id))
                .await?
                .map(|board| board.outcome())
                .unwrap_or(Outcome::NotFound);
            debug!(game_id, outcome = outcome.tag(), "evaluated game");
            Ok(outcome)
        })
        .await
}

/// Evaluate `game_id` for transport callers, turning an unknown game into an error.
pub async fn get_outcome(
    state: &SharedState,
    game_id: &str,
) -> Result<OutcomeResponse, ServiceError> {
    match evaluate(state, game_id).await? {
        Outcome::NotFound => Err(ServiceError::NotFound(format!("game `{game_id}`"))),
        outcome => Ok(OutcomeResponse::from(&outcome)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{CellEntity, GameEntity},
        services::{
            game_service, move_service,
            test_support::{create_request, memory_state},
        },
    };

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let (state, _) = memory_state().await;
        assert_eq!(evaluate(&state, "nope").await.unwrap(), Outcome::NotFound);
        assert!(matches!(
            get_outcome(&state, "nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn fresh_game_is_undetermined_until_both_have_moved() {
        let (state, _) = memory_state().await;
        game_service::create_game(&state, create_request("g1", "A", "B"))
            .await
            .unwrap();
        assert_eq!(evaluate(&state, "g1").await.unwrap(), Outcome::Undetermined);

        move_service::apply_move(&state, "g1", 0, 0, "A")
            .await
            .unwrap();
        assert_eq!(evaluate(&state, "g1").await.unwrap(), Outcome::Undetermined);

        move_service::apply_move(&state, "g1", 1, 1, "B")
            .await
            .unwrap();
        let response = get_outcome(&state, "g1").await.unwrap();
        assert_eq!(response.outcome, "in_progress");
        assert_eq!(response.message, "No Winners Yet, Game Continues");
    }

    #[tokio::test]
    async fn orphan_cells_are_partial_state() {
        let (state, store) = memory_state().await;
        store
            .put_cell(CellEntity::unclaimed("ghost", 0, 0))
            .await
            .unwrap();
        assert!(matches!(
            evaluate(&state, "ghost").await,
            Err(ServiceError::PartialState { .. })
        ));
    }

    #[tokio::test]
    async fn game_without_cells_is_partial_state() {
        let (state, store) = memory_state().await;
        store
            .put_game(GameEntity::new("bare".into(), "A".into(), "B".into()))
            .await
            .unwrap();
        assert!(matches!(
            evaluate(&state, "bare").await,
            Err(ServiceError::PartialState { .. })
        ));
    }
}
