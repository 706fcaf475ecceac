/// OpenAPI documentation generation.
pub mod documentation;
/// Game registry: creation, reset, board views and listing.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Move validation and application.
pub mod move_service;
/// Board loading and outcome evaluation.
pub mod outcome_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;

#[cfg(test)]
mod test_support;
