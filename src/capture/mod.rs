pub mod backend;
pub mod microphone;
pub mod stream;
pub mod synthetic;

pub use backend::{
    AudioFrame, BackendKind, CaptureBackend, CaptureBackendFactory, CaptureConfig, DeviceRequest,
    StreamSpec,
};
pub use microphone::MicrophoneBackend;
pub use stream::{stream_pair, MediaStream, StreamDriver};
pub use synthetic::SyntheticBackend;
