use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{CellEntity, GameEntity},
    dto::{format_system_time, validation::validate_identifier},
    state::board::{Board, Outcome},
};

/// Payload used to register a brand-new game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Caller-chosen unique identifier of the game.
    #[validate(custom(function = "validate_identifier"))]
    pub game_id: String,
    #[validate(custom(function = "validate_identifier"))]
    pub participant_a: String,
    #[validate(custom(function = "validate_identifier"))]
    pub participant_b: String,
}

/// Payload describing a cell claim.
///
/// Coordinates are signed so that out-of-range values reach the move rules
/// instead of being rejected by deserialization.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveRequest {
    pub row: i64,
    pub col: i64,
    pub claimant: String,
}

/// Summary returned once a game has been created.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub last_mover: Option<String>,
    pub moves_played: u32,
    pub created_at: String,
    pub updated_at: String,
    pub message: String,
}

impl From<GameEntity> for GameSummary {
    fn from(game: GameEntity) -> Self {
        let message = format!(
            "New Game Created, ID: {} | Player 1: {} | Player 2: {}",
            game.id, game.participant_a, game.participant_b
        );
        Self {
            id: game.id,
            participant_a: game.participant_a,
            participant_b: game.participant_b,
            last_mover: game.last_mover,
            moves_played: game.moves_played,
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
            message,
        }
    }
}

/// Machine tag describing how a move request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    Accepted,
    GameAlreadyWon,
    NoMovesLeft,
}

/// Response returned by the move endpoint for non-error resolutions.
#[derive(Debug, Serialize, ToSchema)]
pub struct MoveResponse {
    pub status: MoveStatus,
    /// Winner of the game, set when the move was refused because it is already won.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub message: String,
}

/// Response returned once a game has been reset.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    pub game_id: String,
    /// Number of cells removed alongside the game record.
    pub removed_cells: u64,
    pub message: String,
}

impl ResetResponse {
    pub fn new(game_id: String, removed_cells: u64) -> Self {
        let message = if removed_cells == 0 {
            format!("Game Reset Complete, no moves found for Game: {game_id} (creation was incomplete)")
        } else {
            format!("Game Reset Complete, deleted {removed_cells} moves for Game: {game_id}")
        };
        Self {
            game_id,
            removed_cells,
            message,
        }
    }
}

/// Result of evaluating a game's board.
#[derive(Debug, Serialize, ToSchema)]
pub struct OutcomeResponse {
    /// One of `undetermined`, `winner`, `no_moves_left`, `in_progress`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub message: String,
}

impl From<&Outcome> for OutcomeResponse {
    fn from(outcome: &Outcome) -> Self {
        Self {
            outcome: outcome.tag().to_string(),
            winner: outcome.winner().map(str::to_owned),
            message: outcome_message(outcome),
        }
    }
}

/// Human-readable description of an outcome.
pub fn outcome_message(outcome: &Outcome) -> String {
    match outcome {
        Outcome::NotFound => "Game Not Found".into(),
        Outcome::Undetermined => "Not Enough Players Have Moved Yet".into(),
        Outcome::Winner(winner) => format!("Game Won By {winner}"),
        Outcome::NoMovesLeft => "Game Ended, No Winners".into(),
        Outcome::InProgress => "No Winners Yet, Game Continues".into(),
    }
}

/// Public projection of one cell.
#[derive(Debug, Serialize, ToSchema)]
pub struct CellView {
    pub row: u8,
    pub col: u8,
    pub label: String,
    pub occupant: Option<String>,
}

impl From<&CellEntity> for CellView {
    fn from(cell: &CellEntity) -> Self {
        Self {
            row: cell.row,
            col: cell.col,
            label: cell.label.clone(),
            occupant: cell.occupant.clone(),
        }
    }
}

/// Full board view of a single game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStateResponse {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub last_mover: Option<String>,
    pub moves_played: u32,
    /// Participants that have claimed at least one cell, in board order.
    pub participants_moved: Vec<String>,
    /// Display text per cell grouped by row: occupant or coordinate label.
    pub rows: Vec<Vec<String>>,
    /// Plain-text rendering of `rows`.
    pub picture: String,
    pub cells: Vec<CellView>,
    pub outcome: OutcomeResponse,
    pub updated_at: String,
}

impl From<&Board> for GameStateResponse {
    fn from(board: &Board) -> Self {
        let game = board.game();
        Self {
            id: game.id.clone(),
            participant_a: game.participant_a.clone(),
            participant_b: game.participant_b.clone(),
            last_mover: game.last_mover.clone(),
            moves_played: game.moves_played,
            participants_moved: board.participants_who_have_moved().into_iter().collect(),
            rows: board.rows(),
            picture: board.picture(),
            cells: board.cells().iter().map(CellView::from).collect(),
            outcome: OutcomeResponse::from(&board.outcome()),
            updated_at: format_system_time(game.updated_at),
        }
    }
}

/// Listing entry for a known game.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameListItem {
    pub id: String,
    /// Outcome tag, or `partial_state` when the stored records disagree.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

/// Enumeration of every game currently stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameListResponse {
    /// Number of cell records across all games.
    pub total_cells: u64,
    pub games: Vec<GameListItem>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_blank_identifiers() {
        let request = CreateGameRequest {
            game_id: "g1".into(),
            participant_a: "  ".into(),
            participant_b: "B".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("participant_a"));
    }

    #[test]
    fn move_status_uses_snake_case_tags() {
        let response = MoveResponse {
            status: MoveStatus::GameAlreadyWon,
            winner: Some("A".into()),
            message: "Game Won By A".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "game_already_won");
        assert_eq!(json["winner"], "A");
    }

    #[test]
    fn outcome_response_carries_winner_only_when_won() {
        let won = OutcomeResponse::from(&Outcome::Winner("B".into()));
        assert_eq!(won.outcome, "winner");
        assert_eq!(won.winner.as_deref(), Some("B"));
        assert_eq!(won.message, "Game Won By B");

        let open = OutcomeResponse::from(&Outcome::InProgress);
        assert_eq!(open.outcome, "in_progress");
        assert!(open.winner.is_none());
    }

    #[test]
    fn reset_message_reports_count() {
        assert_eq!(
            ResetResponse::new("g1".into(), 9).message,
            "Game Reset Complete, deleted 9 moves for Game: g1"
        );
        assert!(ResetResponse::new("g1".into(), 0).message.contains("incomplete"));
    }
}
