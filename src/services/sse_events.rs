use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::{
        game::GameSummary,
        sse::{GameCreatedEvent, GameMovedEvent, GameResetEvent, ServerEvent},
    },
    state::{SharedState, board::Outcome},
};

const EVENT_GAME_CREATED: &str = "game.created";
const EVENT_GAME_MOVED: &str = "game.moved";
const EVENT_GAME_RESET: &str = "game.reset";

/// Broadcast the creation of a new game.
pub fn broadcast_game_created(state: &SharedState, game: GameSummary) {
    let payload = GameCreatedEvent { game };
    send_event(state, EVENT_GAME_CREATED, &payload);
}

/// Broadcast an accepted move together with the outcome it produced.
pub fn broadcast_game_moved(
    state: &SharedState,
    game_id: &str,
    (row, col): (u8, u8),
    claimant: &str,
    outcome: &Outcome,
) {
    let payload = GameMovedEvent {
        game_id: game_id.to_string(),
        row,
        col,
        claimant: claimant.to_string(),
        outcome: outcome.tag().to_string(),
        winner: outcome.winner().map(str::to_owned),
    };
    send_event(state, EVENT_GAME_MOVED, &payload);
}

/// Broadcast that a game has been removed.
pub fn broadcast_game_reset(state: &SharedState, game_id: &str, removed_cells: u64) {
    let payload = GameResetEvent {
        game_id: game_id.to_string(),
        removed_cells,
    };
    send_event(state, EVENT_GAME_RESET, &payload);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(payload) => {
            let delivered = state.events().publish(payload);
            debug!(event, delivered, "published game event");
        }
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
