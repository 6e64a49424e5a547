use serde::{Deserialize, Serialize};

/// Lifecycle of one recording attempt.
///
/// `Idle → Initializing → Ready → Recording → Stopped → Completed`, with
/// `Failed` reachable from `Initializing` and `Recording`. `initialize()`
/// re-enters from `Failed`, which is how retry is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No resources held.
    Idle,
    /// Waiting on device acquisition.
    Initializing,
    /// Devices acquired, detector running, not yet recording.
    Ready,
    /// Recorder active.
    Recording,
    /// Recorder flushed; chunks finalized.
    Stopped,
    /// Artifact saved, status persisted. Terminal.
    Completed,
    /// Initialization or recording failed; retryable via `initialize()`
    /// when the underlying error allows it.
    Failed,
}
