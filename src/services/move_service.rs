use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    dao::models::BOARD_SIZE,
    dto::game::{MoveResponse, MoveStatus, outcome_message},
    error::ServiceError,
    services::{outcome_service::load_board, sse_events},
    state::{
        SharedState,
        board::{Outcome, evaluate},
    },
};

/// How a legal or already-settled move request was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// The cell was claimed; `outcome` is the board evaluation right after.
    Accepted {
        row: u8,
        col: u8,
        outcome: Outcome,
    },
    /// The game was already won by this participant; nothing changed.
    GameAlreadyWon(String),
    /// Every cell is claimed; nothing changed.
    NoMovesLeft,
}

impl From<MoveResult> for MoveResponse {
    fn from(result: MoveResult) -> Self {
        match result {
            MoveResult::Accepted { row, col, outcome } => MoveResponse {
                status: MoveStatus::Accepted,
                winner: None,
                message: format!(
                    "Move accepted at [{row},{col}]. {}",
                    outcome_message(&outcome)
                ),
            },
            MoveResult::GameAlreadyWon(winner) => MoveResponse {
                status: MoveStatus::GameAlreadyWon,
                message: format!("Game Won By {winner}"),
                winner: Some(winner),
            },
            MoveResult::NoMovesLeft => MoveResponse {
                status: MoveStatus::NoMovesLeft,
                winner: None,
                message: outcome_message(&Outcome::NoMovesLeft),
            },
        }
    }
}

/// Map signed request coordinates onto the board.
fn resolve_cell(row: i64, col: i64) -> Result<(u8, u8), ServiceError> {
    let in_range = |value: i64| u8::try_from(value).ok().filter(|v| *v < BOARD_SIZE);
    match (in_range(row), in_range(col)) {
        (Some(row), Some(col)) => Ok((row, col)),
        _ => Err(ServiceError::CellOutOfRange { row, col }),
    }
}

/// Claim the cell at `(row, col)` of `game_id` for `claimant`.
///
/// Settled games short-circuit before the claimant or the coordinates are
/// looked at, so a finished game answers the same way whoever asks.
pub async fn apply_move(
    state: &SharedState,
    game_id: &str,
    row: i64,
    col: i64,
    claimant: &str,
) -> Result<MoveResult, ServiceError> {
    let store = state.require_game_store().await?;
    let deadline = state.deadline();

    let result = state
        .run_exclusive(game_id, deadline, || async {
            let Some(board) = deadline.bound(load_board(&store, game_id)).await? else {
                return Err(ServiceError::NotFound(format!("game `{game_id}`")));
            };

            if let Outcome::Winner(winner) = board.outcome() {
                return Ok(MoveResult::GameAlreadyWon(winner));
            }
            if board.unclaimed_count() == 0 {
                return Ok(MoveResult::NoMovesLeft);
            }

            let game = board.game();
            if claimant.trim().is_empty() || !game.is_participant(claimant) {
                return Err(ServiceError::InvalidClaimant {
                    game_id: game_id.to_owned(),
                    claimant: claimant.to_owned(),
                });
            }

            let (row, col) = resolve_cell(row, col)?;
            let Some(target) = board.cell(row, col) else {
                return Err(ServiceError::CellOutOfRange {
                    row: row.into(),
                    col: col.into(),
                });
            };

            if game.last_mover.as_deref() == Some(claimant) {
                return Err(ServiceError::ConsecutiveMove(claimant.to_owned()));
            }

            if let Some(occupant) = target.occupant.as_ref().filter(|_| target.claimed) {
                return Err(ServiceError::CellAlreadyClaimed {
                    label: target.label.clone(),
                    occupant: occupant.clone(),
                });
            }

            let mut cell = target.clone();
            cell.occupant = Some(claimant.to_owned());
            cell.claimed = true;

            let mut game = game.clone();
            game.last_mover = Some(claimant.to_owned());
            game.moves_played += 1;
            game.updated_at = SystemTime::now();

            // Cell first: a failure before the game write leaves a claimed cell
            // the move counter does not account for, which the next load reports.
            // Neither write is bounded by the deadline once the move is decided.
            store.put_cell(cell.clone()).await?;
            store.put_game(game).await?;

            let cells = board
                .cells()
                .iter()
                .map(|existing| {
                    if (existing.row, existing.col) == (row, col) {
                        cell.clone()
                    } else {
                        existing.clone()
                    }
                })
                .collect::<Vec<_>>();
            let outcome = evaluate(&cells);

            info!(
                game_id,
                claimant,
                row,
                col,
                outcome = outcome.tag(),
                "move accepted"
            );
            // Published under the game lock so subscribers see moves in order.
            sse_events::broadcast_game_moved(state, game_id, (row, col), claimant, &outcome);
            Ok(MoveResult::Accepted { row, col, outcome })
        })
        .await;

    match &result {
        Ok(MoveResult::Accepted { .. }) => {}
        Ok(settled) => info!(game_id, claimant, result = ?settled, "move ignored; game is over"),
        Err(err) => warn!(game_id, claimant, error = %err, "move rejected"),
    }

    result
}
