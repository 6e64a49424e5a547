pub mod activity;
pub mod artifact;
pub mod capture;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod recorder;
pub mod script;
pub mod session;

pub use activity::{ActivityDetector, DetectorHandle, LevelMeter, SPEAKING_THRESHOLD};
pub use artifact::Artifact;
pub use capture::{
    stream_pair, AudioFrame, BackendKind, CaptureBackend, CaptureBackendFactory, CaptureConfig,
    DeviceRequest, MediaStream, StreamDriver, StreamSpec,
};
pub use config::Config;
pub use error::{Result, SessionError};
pub use gateway::{Episode, EpisodeStatus, NatsGateway, Participant, PersistenceGateway, RecordingMode};
pub use http::{create_router, AppState};
pub use recorder::{CaptureRecorder, Codec, Fragment, RecorderHandle, TrackEncoder};
pub use script::{InterviewScript, Question};
pub use session::{RecordingSession, SessionConfig, SessionSnapshot, SessionState};
