use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{CellEntity, GameEntity};

pub const GAME_PREFIX: &str = "game::";
pub const CELL_PREFIX: &str = "cell::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Minimal projection used to fetch the current revision before a write or delete.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBody {
    pub game_id: String,
    pub participant_a: String,
    pub participant_b: String,
    #[serde(default)]
    pub last_mover: Option<String>,
    #[serde(default)]
    pub moves_played: u32,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl From<(GameEntity, Option<String>)> for CouchGameDocument {
    fn from((game, rev): (GameEntity, Option<String>)) -> Self {
        Self {
            id: game_doc_id(&game.id),
            rev,
            game: GameBody {
                game_id: game.id,
                participant_a: game.participant_a,
                participant_b: game.participant_b,
                last_mover: game.last_mover,
                moves_played: game.moves_played,
                created_at: game.created_at,
                updated_at: game.updated_at,
            },
        }
    }
}

impl From<CouchGameDocument> for GameEntity {
    fn from(doc: CouchGameDocument) -> Self {
        let body = doc.game;
        Self {
            id: body.game_id,
            participant_a: body.participant_a,
            participant_b: body.participant_b,
            last_mover: body.last_mover,
            moves_played: body.moves_played,
            created_at: body.created_at,
            updated_at: body.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchCellDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub cell: CellEntity,
}

impl From<(CellEntity, Option<String>)> for CouchCellDocument {
    fn from((cell, rev): (CellEntity, Option<String>)) -> Self {
        Self {
            id: cell_doc_id(&cell.game_id, cell.row, cell.col),
            rev,
            cell,
        }
    }
}

pub fn game_doc_id(id: &str) -> String {
    format!("{GAME_PREFIX}{id}")
}

/// Key prefix shared by every cell of `game_id`; range queries over it act as the
/// per-game cell index.
pub fn cell_prefix(game_id: &str) -> String {
    format!("{CELL_PREFIX}{game_id}::")
}

pub fn cell_doc_id(game_id: &str, row: u8, col: u8) -> String {
    format!("{}{row}{col}", cell_prefix(game_id))
}

/// JSON-encoded `startkey`/`endkey` pair covering every id that starts with `prefix`.
pub fn prefix_range(prefix: &str) -> serde_json::Result<(String, String)> {
    let start = serde_json::to_string(prefix)?;
    let end = serde_json::to_string(&format!("{prefix}{END_SUFFIX}"))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_ids_share_the_game_prefix() {
        let id = cell_doc_id("g1", 2, 0);
        assert_eq!(id, "cell::g1::20");
        assert!(id.starts_with(&cell_prefix("g1")));
        assert_eq!(game_doc_id("g1"), "game::g1");
    }

    #[test]
    fn range_keys_escape_the_game_id() {
        let prefix = cell_prefix("a\"b\\c");
        let (start, end) = prefix_range(&prefix).unwrap();

        assert_eq!(serde_json::from_str::<String>(&start).unwrap(), prefix);
        let end = serde_json::from_str::<String>(&end).unwrap();
        assert!(end.starts_with(&prefix));
        assert!(end.ends_with(END_SUFFIX));
    }
}
