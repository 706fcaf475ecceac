use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{CellEntity, GameEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    participant_a: String,
    participant_b: String,
    #[serde(default)]
    last_mover: Option<String>,
    #[serde(default)]
    moves_played: u32,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            participant_a: value.participant_a,
            participant_b: value.participant_b,
            last_mover: value.last_mover,
            moves_played: value.moves_played,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            participant_a: value.participant_a,
            participant_b: value.participant_b,
            last_mover: value.last_mover,
            moves_played: value.moves_played,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Cell document; MongoDB assigns the `_id`, lookups go through the
/// `(game_id, row, col)` compound index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCellDocument {
    game_id: String,
    row: i32,
    col: i32,
    #[serde(default)]
    occupant: Option<String>,
    #[serde(default)]
    claimed: bool,
    label: String,
}

impl From<CellEntity> for MongoCellDocument {
    fn from(value: CellEntity) -> Self {
        Self {
            game_id: value.game_id,
            row: i32::from(value.row),
            col: i32::from(value.col),
            occupant: value.occupant,
            claimed: value.claimed,
            label: value.label,
        }
    }
}

impl MongoCellDocument {
    /// Convert back into an entity. Coordinates that do not fit a board are
    /// reported rather than skipped.
    pub fn into_entity(self) -> MongoResult<CellEntity> {
        let (Ok(row), Ok(col)) = (u8::try_from(self.row), u8::try_from(self.col)) else {
            return Err(MongoDaoError::CorruptCell {
                game_id: self.game_id,
                row: self.row,
                col: self.col,
            });
        };
        Ok(CellEntity {
            game_id: self.game_id,
            row,
            col,
            occupant: self.occupant,
            claimed: self.claimed,
            label: self.label,
        })
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

pub fn cell_key(game_id: &str, row: u8, col: u8) -> Document {
    doc! {"game_id": game_id, "row": i32::from(row), "col": i32::from(col)}
}

pub fn cells_of(game_id: &str) -> Document {
    doc! {"game_id": game_id}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_cell(row: i32, col: i32) -> MongoCellDocument {
        MongoCellDocument {
            game_id: "g1".into(),
            row,
            col,
            occupant: None,
            claimed: false,
            label: format!("[{row},{col}]"),
        }
    }

    #[test]
    fn negative_coordinates_are_reported() {
        assert!(matches!(
            stored_cell(-1, 2).into_entity(),
            Err(MongoDaoError::CorruptCell { row: -1, col: 2, .. })
        ));
    }

    #[test]
    fn byte_sized_coordinates_convert() {
        let cell = stored_cell(2, 1).into_entity().unwrap();
        assert_eq!((cell.row, cell.col), (2, 1));
    }
}
