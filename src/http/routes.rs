use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/episodes/:episode_id/session",
            post(handlers::create_session)
                .get(handlers::get_session_status)
                .delete(handlers::delete_session),
        )
        .route(
            "/episodes/:episode_id/session/initialize",
            post(handlers::initialize_session),
        )
        .route(
            "/episodes/:episode_id/session/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/episodes/:episode_id/session/record/stop",
            post(handlers::stop_recording),
        )
        .route(
            "/episodes/:episode_id/session/complete",
            post(handlers::complete_session),
        )
        // Teleprompter navigation
        .route(
            "/episodes/:episode_id/session/questions/next",
            post(handlers::next_question),
        )
        .route(
            "/episodes/:episode_id/session/questions/previous",
            post(handlers::previous_question),
        )
        .route(
            "/episodes/:episode_id/session/questions/jump",
            post(handlers::jump_to_question),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
