use thiserror::Error;

use crate::recorder::Codec;
use crate::session::SessionState;

/// Errors surfaced by the recording session and its components.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The user declined the microphone/camera permission prompt.
    /// Retryable: re-grant access and call `initialize()` again.
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),

    /// No usable capture device, or the device went away.
    /// Retryable: reconnect the device and call `initialize()` again.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// No compatible encoder, even after falling back from the preferred
    /// codec. Fatal to the session.
    #[error("no supported recording format (preferred: {preferred:?})")]
    UnsupportedFormat { preferred: Codec },

    /// A lifecycle operation was called from the wrong state. The session
    /// state is left unchanged.
    #[error("cannot {operation} while session is {state:?}")]
    InvalidTransition {
        state: SessionState,
        operation: &'static str,
    },

    /// `jump_to` was given an index outside the script. The cursor is left
    /// unchanged.
    #[error("question index {index} out of range (script has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    /// The encoder rejected or failed to flush captured audio.
    #[error("encoder failure: {0}")]
    Encoder(String),

    /// The persistence gateway could not be reached. Lifecycle callers treat
    /// this as best-effort and log it; it never rolls back local state.
    #[error("persistence gateway error: {0}")]
    Gateway(String),

    #[error("artifact i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether `initialize()` may be retried after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::PermissionDenied(_) | SessionError::DeviceUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
