use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::GameSummary;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already rendered data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a new game has been registered.
pub struct GameCreatedEvent {
    pub game: GameSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after a move has been accepted.
pub struct GameMovedEvent {
    pub game_id: String,
    pub row: u8,
    pub col: u8,
    pub claimant: String,
    /// Outcome tag evaluated right after the move.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a game and its cells have been removed.
pub struct GameResetEvent {
    pub game_id: String,
    pub removed_cells: u64,
}
