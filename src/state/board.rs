//! Board assembly and outcome evaluation.
//!
//! Everything here is a pure function of the game record and its cells; the
//! services layer loads those from the store and decides what to persist.

use indexmap::IndexSet;
use thiserror::Error;

use crate::dao::models::{BOARD_SIZE, CELL_COUNT, CellEntity, GameEntity};

/// A `(row, col)` coordinate on the board.
pub type Coord = (u8, u8);

/// Every line that wins the game, scanned in this order: rows, columns, then
/// the main diagonal and the anti-diagonal. The first complete line wins.
pub const WINNING_LINES: [[Coord; 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Result of evaluating a game's board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Neither the game nor any of its cells exist.
    NotFound,
    /// Fewer than two distinct participants have claimed a cell; never a winner.
    Undetermined,
    /// A participant completed a line.
    Winner(String),
    /// Every cell is claimed and nobody completed a line.
    NoMovesLeft,
    /// Unclaimed cells remain and nobody completed a line.
    InProgress,
}

impl Outcome {
    /// Machine-readable tag exposed to clients.
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::NotFound => "not_found",
            Outcome::Undetermined => "undetermined",
            Outcome::Winner(_) => "winner",
            Outcome::NoMovesLeft => "no_moves_left",
            Outcome::InProgress => "in_progress",
        }
    }

    /// Winner identifier when the game has been won.
    pub fn winner(&self) -> Option<&str> {
        match self {
            Outcome::Winner(id) => Some(id),
            _ => None,
        }
    }
}

/// Distinct occupants of claimed cells, in row-major order of first appearance.
pub fn participants_who_have_moved(cells: &[CellEntity]) -> IndexSet<String> {
    let mut ordered = cells.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|cell| (cell.row, cell.col));
    ordered
        .into_iter()
        .filter(|cell| cell.claimed)
        .filter_map(|cell| cell.occupant.clone())
        .collect()
}

/// Occupant grid indexed `[row][col]`; coordinates outside the board are ignored.
fn occupant_grid(cells: &[CellEntity]) -> [[Option<&str>; 3]; 3] {
    let mut grid = [[None; 3]; 3];
    for cell in cells {
        if cell.row < BOARD_SIZE && cell.col < BOARD_SIZE && cell.claimed {
            grid[cell.row as usize][cell.col as usize] = cell.occupant.as_deref();
        }
    }
    grid
}

/// First line in [`WINNING_LINES`] whose three occupants are present and equal.
pub fn find_winner(cells: &[CellEntity]) -> Option<String> {
    let grid = occupant_grid(cells);
    WINNING_LINES.iter().find_map(|line| {
        let [first, second, third] = line.map(|(row, col)| grid[row as usize][col as usize]);
        match (first, second, third) {
            (Some(a), Some(b), Some(c)) if a == b && b == c => Some(a.to_owned()),
            _ => None,
        }
    })
}

/// Number of cells nobody has claimed yet.
pub fn unclaimed_count(cells: &[CellEntity]) -> usize {
    cells.iter().filter(|cell| !cell.claimed).count()
}

/// Evaluate a set of cells belonging to one game.
pub fn evaluate(cells: &[CellEntity]) -> Outcome {
    if cells.is_empty() {
        return Outcome::NotFound;
    }

    if participants_who_have_moved(cells).len() < 2 {
        return Outcome::Undetermined;
    }

    if let Some(winner) = find_winner(cells) {
        return Outcome::Winner(winner);
    }

    if unclaimed_count(cells) == 0 {
        Outcome::NoMovesLeft
    } else {
        Outcome::InProgress
    }
}

/// Inconsistency between a game record and its cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardIntegrityError {
    #[error("{cells} cell(s) exist but the game record is missing")]
    MissingGame { cells: usize },
    #[error("expected 9 cells, found {found}")]
    CellCount { found: usize },
    #[error("cell ({row},{col}) is outside the board")]
    OutOfRange { row: u8, col: u8 },
    #[error("cell ({row},{col}) is stored more than once")]
    DuplicateCell { row: u8, col: u8 },
    #[error("cell ({row},{col}) has inconsistent claim flags")]
    ClaimMismatch { row: u8, col: u8 },
    #[error("cell ({row},{col}) is held by `{occupant}`, who is not a participant")]
    ForeignOccupant { row: u8, col: u8, occupant: String },
    #[error("game records {recorded} move(s) but {claimed} cell(s) are claimed")]
    MoveCountMismatch { recorded: u32, claimed: usize },
    #[error("last mover is inconsistent with the moves played")]
    LastMoverMismatch,
}

/// A game record together with its complete, validated set of nine cells.
#[derive(Debug, Clone)]
pub struct Board {
    game: GameEntity,
    /// Row-major: index `row * 3 + col`.
    cells: Vec<CellEntity>,
}

impl Board {
    /// Combine what the store returned for one game id.
    ///
    /// Returns `Ok(None)` when neither a record nor cells exist, and an integrity
    /// error whenever the two disagree, so partially applied writes are never
    /// mistaken for a playable board.
    pub fn assemble(
        game: Option<GameEntity>,
        mut cells: Vec<CellEntity>,
    ) -> Result<Option<Self>, BoardIntegrityError> {
        let game = match game {
            Some(game) => game,
            None if cells.is_empty() => return Ok(None),
            None => return Err(BoardIntegrityError::MissingGame { cells: cells.len() }),
        };

        for cell in &cells {
            if cell.row >= BOARD_SIZE || cell.col >= BOARD_SIZE {
                return Err(BoardIntegrityError::OutOfRange {
                    row: cell.row,
                    col: cell.col,
                });
            }
        }

        cells.sort_by_key(|cell| (cell.row, cell.col));
        if let Some(pair) = cells
            .windows(2)
            .find(|pair| (pair[0].row, pair[0].col) == (pair[1].row, pair[1].col))
        {
            return Err(BoardIntegrityError::DuplicateCell {
                row: pair[0].row,
                col: pair[0].col,
            });
        }

        if cells.len() != CELL_COUNT {
            return Err(BoardIntegrityError::CellCount { found: cells.len() });
        }

        for cell in &cells {
            if cell.claimed != cell.occupant.is_some() {
                return Err(BoardIntegrityError::ClaimMismatch {
                    row: cell.row,
                    col: cell.col,
                });
            }
            if let Some(occupant) = &cell.occupant {
                if !game.is_participant(occupant) {
                    return Err(BoardIntegrityError::ForeignOccupant {
                        row: cell.row,
                        col: cell.col,
                        occupant: occupant.clone(),
                    });
                }
            }
        }

        let claimed = cells.iter().filter(|cell| cell.claimed).count();
        if claimed != game.moves_played as usize {
            return Err(BoardIntegrityError::MoveCountMismatch {
                recorded: game.moves_played,
                claimed,
            });
        }

        let last_mover_ok = match &game.last_mover {
            None => game.moves_played == 0,
            Some(mover) => game.moves_played > 0 && game.is_participant(mover),
        };
        if !last_mover_ok {
            return Err(BoardIntegrityError::LastMoverMismatch);
        }

        Ok(Some(Self { game, cells }))
    }

    /// The game record this board belongs to.
    pub fn game(&self) -> &GameEntity {
        &self.game
    }

    /// All nine cells in row-major order.
    pub fn cells(&self) -> &[CellEntity] {
        &self.cells
    }

    /// Cell at `(row, col)`, or `None` outside the board.
    pub fn cell(&self, row: u8, col: u8) -> Option<&CellEntity> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return None;
        }
        self.cells.get((row * BOARD_SIZE + col) as usize)
    }

    /// Current evaluation of the board.
    pub fn outcome(&self) -> Outcome {
        evaluate(&self.cells)
    }

    /// Number of cells nobody has claimed yet.
    pub fn unclaimed_count(&self) -> usize {
        unclaimed_count(&self.cells)
    }

    /// Distinct claimants on this board, in row-major order of first appearance.
    pub fn participants_who_have_moved(&self) -> IndexSet<String> {
        participants_who_have_moved(&self.cells)
    }

    /// Display text of every cell, grouped by row.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.cells
            .chunks(BOARD_SIZE as usize)
            .map(|row| row.iter().map(|cell| cell.display().to_owned()).collect())
            .collect()
    }

    /// Plain-text rendering of the board, one line per row.
    pub fn picture(&self) -> String {
        self.rows()
            .iter()
            .map(|row| format!(" {} ", row.join(" | ")))
            .collect::<Vec<_>>()
            .join("\n-----------------------------\n")
    }
}
