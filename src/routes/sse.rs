use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/games",
    tag = "sse",
    responses((status = 200, description = "Game event stream (game.created, game.moved, game.reset)", content_type = "text/event-stream", body = String))
)]
/// Stream game lifecycle events to connected clients.
pub async fn game_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!("New game SSE connection");
    let greeting = sse_service::handshake(&state).await;
    sse_service::to_sse_stream(receiver, greeting)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/games", get(game_stream))
}
