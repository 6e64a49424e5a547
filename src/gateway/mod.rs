//! Contract with the surrounding application's persistence layer.
//!
//! The gateway owns episodes and questions; the recording session only
//! reads them and reports status changes. Status updates are best-effort
//! from the session's point of view: a failed update is logged by the
//! caller and never rolls back local recording state.

mod nats;

pub use nats::NatsGateway;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::script::Question;

/// How an episode is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingMode {
    Video,
    Audio,
}

/// Episode lifecycle status, owned by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Draft,
    Recording,
    Completed,
}

/// A person attached to an episode, identity already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
}

/// An episode as served by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub recording_mode: RecordingMode,
    pub guest: Participant,
    pub moderator: Participant,
    pub status: EpisodeStatus,
}

impl Episode {
    /// Whether a session for this episode should request a camera.
    pub fn wants_video(&self) -> bool {
        self.recording_mode == RecordingMode::Video
    }
}

/// External persistence collaborator.
#[async_trait::async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Fetch an episode with guest/moderator identities resolved.
    async fn fetch_episode(&self, episode_id: &str) -> Result<Episode>;

    /// Fetch the episode's ordered question script.
    async fn fetch_questions(&self, episode_id: &str) -> Result<Vec<Question>>;

    /// Report a status change. Called once on entering `Recording` and once
    /// on entering `Completed`.
    async fn update_episode_status(&self, episode_id: &str, status: EpisodeStatus) -> Result<()>;
}
