use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the tic-tac-toe backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::game_stream,
        crate::routes::game::create_game,
        crate::routes::game::list_games,
        crate::routes::game::get_game_state,
        crate::routes::game::reset_game,
        crate::routes::game::apply_move,
        crate::routes::game::get_outcome,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::MoveRequest,
            crate::dto::game::GameSummary,
            crate::dto::game::MoveStatus,
            crate::dto::game::MoveResponse,
            crate::dto::game::ResetResponse,
            crate::dto::game::OutcomeResponse,
            crate::dto::game::CellView,
            crate::dto::game::GameStateResponse,
            crate::dto::game::GameListItem,
            crate::dto::game::GameListResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::GameCreatedEvent,
            crate::dto::sse::GameMovedEvent,
            crate::dto::sse::GameResetEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "game", description = "Game lifecycle, moves and outcomes"),
    )
)]
pub struct ApiDoc;
