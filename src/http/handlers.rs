use super::state::AppState;
use crate::error::SessionError;
use crate::script::Question;
use crate::session::{RecordingSession, SessionSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub snapshot: SessionSnapshot,
    /// Question currently on the teleprompter, if the script is non-empty.
    pub current_question: Option<Question>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub snapshot: SessionSnapshot,
    /// Where the finished artifact was saved.
    pub artifact_path: String,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn session_response(session: &RecordingSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        snapshot: session.snapshot(),
        current_question: session.current_question(),
    })
}

/// HTTP status for a session error. Retryable device problems come back as
/// 503 so callers know to fix the device and try again.
fn error_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::PermissionDenied(_) | SessionError::DeviceUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::UnsupportedFormat { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SessionError::QuestionOutOfRange { .. } => StatusCode::BAD_REQUEST,
        SessionError::Gateway(_) => StatusCode::BAD_GATEWAY,
        SessionError::Encoder(_) | SessionError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: SessionError) -> axum::response::Response {
    (
        error_status(&error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /episodes/:episode_id/session
/// Create a session for an episode and run initialization.
pub async fn create_session(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    info!("creating session for episode: {}", episode_id);

    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&episode_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("episode {episode_id} already has an active session"),
                }),
            )
                .into_response();
        }
    }

    let episode = match state.gateway.fetch_episode(&episode_id).await {
        Ok(episode) => episode,
        Err(e) => {
            error!("failed to fetch episode {episode_id}: {e}");
            return error_response(e);
        }
    };
    let questions = match state.gateway.fetch_questions(&episode_id).await {
        Ok(questions) => questions,
        Err(e) => {
            error!("failed to fetch questions for {episode_id}: {e}");
            return error_response(e);
        }
    };

    let session = Arc::new(RecordingSession::new(
        episode,
        questions,
        state.session_config.clone(),
        Arc::clone(&state.backend),
        Arc::clone(&state.gateway),
    ));

    // The session is stored before initialization so a device failure
    // leaves it in place for a retry via the initialize endpoint.
    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(episode_id.clone(), Arc::clone(&session));
    }

    if let Err(e) = session.initialize().await {
        error!("initialization failed for {episode_id}: {e}");
        return (error_status(&e), session_response(&session)).into_response();
    }

    info!("session ready for episode: {}", episode_id);
    (StatusCode::OK, session_response(&session)).into_response()
}

/// POST /episodes/:episode_id/session/initialize
/// Retry initialization after a device failure.
pub async fn initialize_session(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    match session.initialize().await {
        Ok(()) => (StatusCode::OK, session_response(&session)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /episodes/:episode_id/session/record/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    match session.start_recording().await {
        Ok(()) => (StatusCode::OK, session_response(&session)).into_response(),
        Err(e) => {
            error!("failed to start recording for {episode_id}: {e}");
            error_response(e)
        }
    }
}

/// POST /episodes/:episode_id/session/record/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    match session.stop_recording().await {
        Ok(()) => (StatusCode::OK, session_response(&session)).into_response(),
        Err(e) => {
            error!("failed to stop recording for {episode_id}: {e}");
            error_response(e)
        }
    }
}

/// POST /episodes/:episode_id/session/complete
/// Persist completion and save the artifact locally.
pub async fn complete_session(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    match session.complete().await {
        Ok(path) => (
            StatusCode::OK,
            Json(CompleteResponse {
                snapshot: session.snapshot(),
                artifact_path: path.display().to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("failed to complete session for {episode_id}: {e}");
            error_response(e)
        }
    }
}

/// POST /episodes/:episode_id/session/questions/next
pub async fn next_question(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    session.next_question();
    (StatusCode::OK, session_response(&session)).into_response()
}

/// POST /episodes/:episode_id/session/questions/previous
pub async fn previous_question(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    session.previous_question();
    (StatusCode::OK, session_response(&session)).into_response()
}

/// POST /episodes/:episode_id/session/questions/jump
pub async fn jump_to_question(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
    Json(request): Json<JumpRequest>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    match session.jump_to_question(request.index) {
        Ok(_) => (StatusCode::OK, session_response(&session)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /episodes/:episode_id/session
/// Live status: lifecycle state, audio level, teleprompter position.
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = lookup(&state, &episode_id).await else {
        return not_found(&episode_id);
    };
    (StatusCode::OK, session_response(&session)).into_response()
}

/// DELETE /episodes/:episode_id/session
/// Tear the session down (releasing every resource) and drop it.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(episode_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&episode_id)
    };
    match session {
        Some(session) => {
            session.teardown().await;
            info!("session removed for episode: {}", episode_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(&episode_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn lookup(state: &AppState, episode_id: &str) -> Option<Arc<RecordingSession>> {
    let sessions = state.sessions.read().await;
    sessions.get(episode_id).cloned()
}

fn not_found(episode_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("no session for episode {episode_id}"),
        }),
    )
        .into_response()
}
