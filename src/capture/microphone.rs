use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::error::{Result, SessionError};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, DeviceRequest, StreamSpec};
use super::stream::{stream_pair, MediaStream, StreamDriver};

/// How often the capture thread checks for release/device-loss.
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(25);

/// Default microphone backend.
///
/// cpal streams are not `Send`, so each acquisition runs on a dedicated
/// thread that owns the `cpal::Stream` and forwards PCM frames into the
/// `MediaStream` until the session releases it or the device errors out.
///
/// There is no camera path through cpal; requests with `wants_video` are
/// reported as `DeviceUnavailable` so the caller can surface actionable
/// guidance.
pub struct MicrophoneBackend {
    config: CaptureConfig,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn acquire(&self, request: DeviceRequest) -> Result<MediaStream> {
        if request.wants_video {
            return Err(SessionError::DeviceUnavailable(
                "no camera backend available on this platform; reconnect a camera or switch the \
                 episode to audio mode"
                    .to_string(),
            ));
        }

        let (ready_tx, ready_rx) = oneshot::channel::<Result<StreamSpec>>();
        let capture_config = self.config.clone();

        // The stream/driver pair is created up front; the spec is corrected
        // once the device reports what it actually granted.
        let (mut stream, driver) = stream_pair(StreamSpec {
            sample_rate: capture_config.sample_rate,
            channels: capture_config.channels,
            has_video: false,
        });

        std::thread::Builder::new()
            .name("podbooth-capture".to_string())
            .spawn(move || run_capture(capture_config, driver, ready_tx))
            .map_err(|e| SessionError::DeviceUnavailable(format!("capture thread: {e}")))?;

        let spec = ready_rx
            .await
            .map_err(|_| SessionError::DeviceUnavailable("capture thread exited".to_string()))??;

        info!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            "microphone acquired"
        );

        stream.set_spec(spec);
        Ok(stream)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Body of the capture thread. Owns the cpal stream for its whole lifetime.
fn run_capture(
    config: CaptureConfig,
    driver: StreamDriver,
    ready_tx: oneshot::Sender<Result<StreamSpec>>,
) {
    let driver = Arc::new(driver);
    let failed = Arc::new(AtomicBool::new(false));

    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(SessionError::DeviceUnavailable(
                "no default input device found".to_string(),
            )));
            return;
        }
    };

    let (stream_config, sample_format) = match select_config(&device, &config) {
        Ok(selected) => selected,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let spec = StreamSpec {
        sample_rate: stream_config.sample_rate.0,
        channels: stream_config.channels,
        has_video: false,
    };

    let buffer_ms = config.buffer_duration_ms.max(1);
    let build_result = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(
            &device,
            &stream_config,
            buffer_ms,
            Arc::clone(&driver),
            Arc::clone(&failed),
        ),
        SampleFormat::I16 => build_stream::<i16>(
            &device,
            &stream_config,
            buffer_ms,
            Arc::clone(&driver),
            Arc::clone(&failed),
        ),
        SampleFormat::U16 => build_stream::<u16>(
            &device,
            &stream_config,
            buffer_ms,
            Arc::clone(&driver),
            Arc::clone(&failed),
        ),
        other => Err(SessionError::DeviceUnavailable(format!(
            "unsupported sample format {other:?}"
        ))),
    };

    let stream = match build_result {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(acquisition_error("failed to start stream", &e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(spec));

    // Supervise until the session releases the stream or the device dies.
    while !driver.is_shutdown() && !failed.load(Ordering::SeqCst) {
        std::thread::sleep(SUPERVISE_INTERVAL);
    }

    drop(stream);
    driver.mark_ended();
    info!("microphone capture stopped");
}

/// Prefer the configured rate/channels when the device supports them,
/// otherwise fall back to the device default.
fn select_config(
    device: &cpal::Device,
    target: &CaptureConfig,
) -> Result<(StreamConfig, SampleFormat)> {
    let default = device
        .default_input_config()
        .map_err(|e| acquisition_error("failed to read device config", &e.to_string()))?;

    if let Ok(mut supported) = device.supported_input_configs() {
        if let Some(range) = supported.find(|r| {
            r.channels() == target.channels
                && r.min_sample_rate().0 <= target.sample_rate
                && r.max_sample_rate().0 >= target.sample_rate
        }) {
            let format = range.sample_format();
            let config = range.with_sample_rate(SampleRate(target.sample_rate));
            return Ok((config.into(), format));
        }
    }

    warn!(
        requested_rate = target.sample_rate,
        requested_channels = target.channels,
        "requested capture format unsupported, using device default"
    );
    let format = default.sample_format();
    Ok((default.into(), format))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    buffer_ms: u64,
    driver: Arc<StreamDriver>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let samples_per_frame =
        ((sample_rate as u64 * buffer_ms / 1000).max(1) as usize) * channels as usize;

    let mut pending: Vec<i16> = Vec::with_capacity(samples_per_frame);
    let mut emitted_samples: u64 = 0;

    let error_driver = Arc::clone(&driver);
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    let value: f32 = cpal::Sample::from_sample(sample);
                    pending.push((value.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                }
                while pending.len() >= samples_per_frame {
                    let rest = pending.split_off(samples_per_frame);
                    let samples = std::mem::replace(&mut pending, rest);
                    let timestamp_ms =
                        emitted_samples * 1000 / (sample_rate as u64 * channels as u64);
                    emitted_samples += samples.len() as u64;
                    driver.push(AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                        timestamp_ms,
                    });
                }
            },
            move |err| {
                error!("capture device error: {err}");
                failed.store(true, Ordering::SeqCst);
                error_driver.mark_ended();
            },
            None,
        )
        .map_err(|e| acquisition_error("failed to open input stream", &e.to_string()))?;

    Ok(stream)
}

/// Classify a backend error string. Platforms report permission problems as
/// backend-specific errors, so the message text is the only signal.
fn acquisition_error(context: &str, detail: &str) -> SessionError {
    let lowered = detail.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("access") {
        SessionError::PermissionDenied(format!("{context}: {detail}"))
    } else {
        SessionError::DeviceUnavailable(format!("{context}: {detail}"))
    }
}
