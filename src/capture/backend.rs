use crate::error::Result;
use std::sync::Arc;

use super::stream::MediaStream;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Shape of an acquired stream, fixed at acquisition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Whether the stream carries a video track alongside audio.
    pub has_video: bool,
}

/// What the session asks the backend for. Audio is always requested; video
/// only when the episode records in video mode.
#[derive(Debug, Clone, Copy)]
pub struct DeviceRequest {
    pub wants_video: bool,
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (backend converts if needed)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

impl CaptureConfig {
    /// Interleaved samples per emitted frame.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.buffer_duration_ms / 1000) as usize
            * self.channels as usize
    }
}

/// Capture device backend.
///
/// Implementations own the platform capture handle and feed PCM frames into
/// the returned [`MediaStream`] until it is released or the device is lost.
/// Acquisition failures are `PermissionDenied` or `DeviceUnavailable`, both
/// of which the caller may retry after fixing the underlying condition.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire capture devices and start the stream.
    async fn acquire(&self, request: DeviceRequest) -> Result<MediaStream>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Which capture backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Default microphone via cpal (all platforms)
    Microphone,
    /// Deterministic generated stream (tests, hardware-free demos)
    Synthetic,
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(kind: BackendKind, config: CaptureConfig) -> Arc<dyn CaptureBackend> {
        match kind {
            BackendKind::Microphone => {
                Arc::new(super::microphone::MicrophoneBackend::new(config))
            }
            BackendKind::Synthetic => Arc::new(super::synthetic::SyntheticBackend::new(config)),
        }
    }
}
