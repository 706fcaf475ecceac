use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        CreateGameRequest, GameListResponse, GameStateResponse, GameSummary, MoveRequest,
        MoveResponse, OutcomeResponse, ResetResponse,
    },
    error::AppError,
    services::{game_service, move_service, outcome_service},
    state::SharedState,
};

/// Routes covering the game lifecycle: creation, moves, outcome and reset.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game_state).delete(reset_game))
        .route("/games/{id}/moves", post(apply_move))
        .route("/games/{id}/outcome", get(get_outcome))
}

/// Register a new game for two participants.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameSummary),
        (status = 400, description = "Blank identifiers or identical participants"),
        (status = 409, description = "A game with this identifier already exists")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::create_game(&state, payload).await?;
    Ok(Json(summary))
}

/// List every stored game with its outcome.
#[utoipa::path(
    get,
    path = "/games",
    tag = "game",
    responses((status = 200, description = "Known games", body = GameListResponse))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<GameListResponse>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

/// Board view of a single game.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game board", body = GameStateResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game_state(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameStateResponse>, AppError> {
    Ok(Json(game_service::get_game_state(&state, &id).await?))
}

/// Delete a game together with all of its cells.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game to reset")),
    responses(
        (status = 200, description = "Game removed", body = ResetResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn reset_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, AppError> {
    Ok(Json(game_service::reset_game(&state, &id).await?))
}

/// Claim a cell for one of the participants.
#[utoipa::path(
    post,
    path = "/games/{id}/moves",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    request_body = MoveRequest,
    responses(
        (status = 200, description = "Move accepted, or refused because the game is over", body = MoveResponse),
        (status = 400, description = "Coordinates outside the board"),
        (status = 403, description = "Claimant is not a participant"),
        (status = 404, description = "Unknown game"),
        (status = 409, description = "Consecutive move or cell already claimed")
    )
)]
pub async fn apply_move(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let result =
        move_service::apply_move(&state, &id, payload.row, payload.col, &payload.claimant).await?;
    Ok(Json(result.into()))
}

/// Evaluate the current outcome of a game.
#[utoipa::path(
    get,
    path = "/games/{id}/outcome",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Current outcome", body = OutcomeResponse),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_outcome(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<OutcomeResponse>, AppError> {
    Ok(Json(outcome_service::get_outcome(&state, &id).await?))
}
