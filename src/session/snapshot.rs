use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::recorder::Codec;

use super::state::SessionState;

/// Externally observable session status.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub episode_id: String,

    /// Fresh per recording attempt; sessions are never resumed.
    pub attempt_id: Uuid,

    pub state: SessionState,

    /// When this attempt was created.
    pub started_at: DateTime<Utc>,

    /// Latest detector level on the 0..255 byte scale.
    pub audio_level: f32,

    /// Whether the latest level crossed the speaking threshold.
    pub is_speaking: bool,

    /// Cursor into the question script; `None` for an unscripted episode.
    pub current_question_index: Option<usize>,

    pub question_count: usize,

    /// Fragments captured so far; non-zero only after a stop has flushed.
    pub chunk_count: usize,

    /// Codec negotiated at recorder start, if recording has begun.
    pub codec: Option<Codec>,
}
