use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Side length of the square board.
pub const BOARD_SIZE: u8 = 3;
/// Number of cells created alongside every game.
pub const CELL_COUNT: usize = (BOARD_SIZE as usize) * (BOARD_SIZE as usize);

/// Aggregate game record persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Caller-supplied primary key of the game.
    pub id: String,
    /// First participant identifier, fixed at creation.
    pub participant_a: String,
    /// Second participant identifier, fixed at creation.
    pub participant_b: String,
    /// Participant who made the most recent accepted move.
    pub last_mover: Option<String>,
    /// Number of accepted moves, checked against the claimed cells on load.
    pub moves_played: u32,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
}

impl GameEntity {
    /// Build a fresh game record with no move played yet.
    pub fn new(id: String, participant_a: String, participant_b: String) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            participant_a,
            participant_b,
            last_mover: None,
            moves_played: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `claimant` is one of the two participants of this game.
    pub fn is_participant(&self, claimant: &str) -> bool {
        claimant == self.participant_a || claimant == self.participant_b
    }
}

/// One of the nine cells owned by a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellEntity {
    /// Identifier of the owning game.
    pub game_id: String,
    /// Row index in `0..3`.
    pub row: u8,
    /// Column index in `0..3`.
    pub col: u8,
    /// Participant that claimed the cell, if any.
    pub occupant: Option<String>,
    /// Set once the cell has been claimed; only a reset clears it.
    pub claimed: bool,
    /// Coordinate label displayed while the cell is unclaimed (e.g. `[0,2]`).
    pub label: String,
}

impl CellEntity {
    /// Build an unclaimed cell at `(row, col)` for `game_id`.
    pub fn unclaimed(game_id: &str, row: u8, col: u8) -> Self {
        Self {
            game_id: game_id.to_owned(),
            row,
            col,
            occupant: None,
            claimed: false,
            label: coordinate_label(row, col),
        }
    }

    /// Build the complete, unclaimed cell set of a new game in row-major order.
    pub fn full_board(game_id: &str) -> Vec<Self> {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| (row, col)))
            .map(|(row, col)| Self::unclaimed(game_id, row, col))
            .collect()
    }

    /// Text shown for the cell: the occupant when claimed, the coordinate label otherwise.
    pub fn display(&self) -> &str {
        self.occupant.as_deref().unwrap_or(&self.label)
    }
}

/// Human readable coordinate label used for never-claimed cells.
pub fn coordinate_label(row: u8, col: u8) -> String {
    format!("[{row},{col}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_board_covers_every_coordinate_once() {
        let cells = CellEntity::full_board("g1");
        assert_eq!(cells.len(), CELL_COUNT);

        let mut coords = cells.iter().map(|c| (c.row, c.col)).collect::<Vec<_>>();
        coords.sort();
        coords.dedup();
        assert_eq!(coords.len(), CELL_COUNT);
        assert!(cells.iter().all(|c| !c.claimed && c.occupant.is_none()));
        assert!(cells.iter().all(|c| c.game_id == "g1"));
    }

    #[test]
    fn display_falls_back_to_label() {
        let mut cell = CellEntity::unclaimed("g1", 1, 2);
        assert_eq!(cell.display(), "[1,2]");
        cell.occupant = Some("alice".into());
        cell.claimed = true;
        assert_eq!(cell.display(), "alice");
    }
}
