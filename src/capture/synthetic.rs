use std::time::Duration;
use tracing::info;

use crate::error::Result;

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, DeviceRequest, StreamSpec};
use super::stream::{stream_pair, MediaStream};

/// Deterministic generated capture source for tests and hardware-free demos.
///
/// Produces a fixed-frequency tone at the configured frame cadence. A frame
/// budget can be set to simulate mid-session device loss: once the budget is
/// exhausted the stream ends as if the device were unplugged. When video is
/// requested the stream simply advertises a video track so the negotiation
/// paths can be exercised without camera hardware.
pub struct SyntheticBackend {
    config: CaptureConfig,
    tone_hz: f32,
    amplitude: f32,
    max_frames: Option<u64>,
}

impl SyntheticBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            tone_hz: 440.0,
            amplitude: 0.4,
            max_frames: None,
        }
    }

    pub fn with_tone(mut self, tone_hz: f32, amplitude: f32) -> Self {
        self.tone_hz = tone_hz;
        self.amplitude = amplitude;
        self
    }

    /// End the stream after `frames` frames, simulating device loss.
    pub fn with_frame_budget(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SyntheticBackend {
    async fn acquire(&self, request: DeviceRequest) -> Result<MediaStream> {
        let spec = StreamSpec {
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            has_video: request.wants_video,
        };
        let (stream, driver) = stream_pair(spec);

        let samples_per_frame = self.config.samples_per_frame();
        let frame_interval = Duration::from_millis(self.config.buffer_duration_ms.max(1));
        let tone_hz = self.tone_hz;
        let amplitude = self.amplitude.clamp(0.0, 1.0);
        let max_frames = self.max_frames;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut frame_index: u64 = 0;
            let mut sample_clock: u64 = 0;
            loop {
                ticker.tick().await;
                if driver.is_shutdown() {
                    break;
                }
                if let Some(budget) = max_frames {
                    if frame_index >= budget {
                        info!("synthetic stream frame budget exhausted, ending stream");
                        driver.mark_ended();
                        break;
                    }
                }

                let samples = (0..samples_per_frame)
                    .map(|i| {
                        let t = ((sample_clock + i as u64) / spec.channels as u64) as f32
                            / spec.sample_rate as f32;
                        let value =
                            (t * tone_hz * 2.0 * std::f32::consts::PI).sin() * amplitude;
                        (value * i16::MAX as f32) as i16
                    })
                    .collect::<Vec<i16>>();

                let timestamp_ms =
                    sample_clock * 1000 / (spec.sample_rate as u64 * spec.channels as u64).max(1);
                sample_clock += samples_per_frame as u64;

                driver.push(AudioFrame {
                    samples,
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    timestamp_ms,
                });
                frame_index += 1;
            }
        });

        info!(
            tone_hz,
            sample_rate = spec.sample_rate,
            has_video = spec.has_video,
            "synthetic stream acquired"
        );
        Ok(stream)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
