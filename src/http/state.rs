use crate::capture::CaptureBackend;
use crate::gateway::PersistenceGateway;
use crate::session::{RecordingSession, SessionConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active recording sessions (episode_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<RecordingSession>>>>,

    /// External persistence collaborator.
    pub gateway: Arc<dyn PersistenceGateway>,

    /// Capture backend shared by all sessions.
    pub backend: Arc<dyn CaptureBackend>,

    /// Template applied to each new session.
    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        backend: Arc<dyn CaptureBackend>,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            gateway,
            backend,
            session_config,
        }
    }
}
