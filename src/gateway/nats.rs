use async_nats::Client;
use serde::Serialize;
use tracing::info;

use crate::error::{Result, SessionError};
use crate::script::Question;

use super::{Episode, EpisodeStatus, PersistenceGateway};

/// Status update published to the surrounding application.
#[derive(Debug, Serialize)]
struct StatusUpdate<'a> {
    episode_id: &'a str,
    status: EpisodeStatus,
    timestamp: String,
}

/// NATS-backed persistence gateway.
///
/// Fetches use request/reply against the application's episode service;
/// status changes are published fire-and-forget.
pub struct NatsGateway {
    client: Client,
}

impl NatsGateway {
    pub async fn connect(url: &str) -> Result<Self> {
        info!("connecting to NATS at {url}");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| SessionError::Gateway(format!("failed to connect to NATS: {e}")))?;
        info!("connected to NATS");
        Ok(Self { client })
    }

    fn episode_subject(episode_id: &str) -> String {
        format!("episodes.get.{episode_id}")
    }

    fn questions_subject(episode_id: &str) -> String {
        format!("episodes.questions.{episode_id}")
    }

    fn status_subject(episode_id: &str) -> String {
        format!("episodes.status.{episode_id}")
    }
}

#[async_trait::async_trait]
impl PersistenceGateway for NatsGateway {
    async fn fetch_episode(&self, episode_id: &str) -> Result<Episode> {
        let reply = self
            .client
            .request(Self::episode_subject(episode_id), "".into())
            .await
            .map_err(|e| SessionError::Gateway(format!("episode fetch failed: {e}")))?;

        serde_json::from_slice(&reply.payload)
            .map_err(|e| SessionError::Gateway(format!("malformed episode payload: {e}")))
    }

    async fn fetch_questions(&self, episode_id: &str) -> Result<Vec<Question>> {
        let reply = self
            .client
            .request(Self::questions_subject(episode_id), "".into())
            .await
            .map_err(|e| SessionError::Gateway(format!("questions fetch failed: {e}")))?;

        serde_json::from_slice(&reply.payload)
            .map_err(|e| SessionError::Gateway(format!("malformed questions payload: {e}")))
    }

    async fn update_episode_status(&self, episode_id: &str, status: EpisodeStatus) -> Result<()> {
        let update = StatusUpdate {
            episode_id,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&update)
            .map_err(|e| SessionError::Gateway(format!("failed to encode status update: {e}")))?;

        self.client
            .publish(Self::status_subject(episode_id), payload.into())
            .await
            .map_err(|e| SessionError::Gateway(format!("status publish failed: {e}")))?;

        info!(episode_id, ?status, "episode status published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_scoped_per_episode() {
        assert_eq!(NatsGateway::episode_subject("ep-1"), "episodes.get.ep-1");
        assert_eq!(
            NatsGateway::questions_subject("ep-1"),
            "episodes.questions.ep-1"
        );
        assert_eq!(NatsGateway::status_subject("ep-1"), "episodes.status.ep-1");
    }
}
