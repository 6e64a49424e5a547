//! Continuous audio-activity analysis over an acquired stream.
//!
//! One recurring task per session folds incoming PCM into a fixed analysis
//! window and periodically recomputes a frequency-domain level estimate.
//! The result is published through [`LevelMeter`] as plain atomic stores,
//! so the controller and the HTTP surface read it without a lock.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::capture::MediaStream;

/// Analysis window size in samples.
pub const FFT_SIZE: usize = 1024;

/// Per-bin temporal smoothing factor: `s = 0.8 * prev + 0.2 * new`.
pub const SMOOTHING_FACTOR: f32 = 0.8;

/// Level above which the input is classified as active speech.
pub const SPEAKING_THRESHOLD: f32 = 20.0;

/// Recompute cadence, roughly one display frame.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

// Byte-scale mapping range for bin magnitudes, in dBFS.
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Latest activity estimate, shared between the detector task and readers.
///
/// Updates are single atomic assignments; readers may observe a level from
/// one tick and a flag from the next, which is harmless because the flag is
/// always recomputed from the level that was stored with it.
pub struct LevelMeter {
    level_bits: AtomicU32,
    speaking: AtomicBool,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            level_bits: AtomicU32::new(0f32.to_bits()),
            speaking: AtomicBool::new(false),
        }
    }

    /// Record a new level sample; derives the speaking flag from it.
    pub fn record(&self, level: f32) {
        let level = level.max(0.0);
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
        self.speaking
            .store(level > SPEAKING_THRESHOLD, Ordering::Relaxed);
    }

    /// Mean bin magnitude on the 0..255 byte scale.
    pub fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Windowed FFT analysis state: Hann window, per-bin smoothing, byte-scale
/// dB mapping. The level is the mean across bins.
pub(crate) struct LevelAnalyzer {
    window: VecDeque<f32>,
    smoothed: Vec<f32>,
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl LevelAnalyzer {
    pub(crate) fn new() -> Self {
        let hann = (0..FFT_SIZE)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos())
            })
            .collect();

        Self {
            window: VecDeque::with_capacity(FFT_SIZE),
            smoothed: vec![0.0; FFT_SIZE / 2],
            hann,
            fft: FftPlanner::new().plan_fft_forward(FFT_SIZE),
        }
    }

    /// Fold new PCM into the window, keeping only the most recent
    /// `FFT_SIZE` samples.
    pub(crate) fn push(&mut self, samples: &[i16]) {
        for &sample in samples {
            if self.window.len() == FFT_SIZE {
                self.window.pop_front();
            }
            self.window.push_back(sample as f32 / i16::MAX as f32);
        }
    }

    /// Recompute the smoothed spectrum and return the current level.
    pub(crate) fn level(&mut self) -> f32 {
        // Tail-align a partially filled window; missing history is silence.
        let mut buffer = [Complex::new(0.0f32, 0.0f32); FFT_SIZE];
        let offset = FFT_SIZE - self.window.len();
        for (i, &sample) in self.window.iter().enumerate() {
            let idx = offset + i;
            buffer[idx] = Complex::new(sample * self.hann[idx], 0.0);
        }

        self.fft.process(&mut buffer);

        let mut sum = 0.0f32;
        for (bin, slot) in self.smoothed.iter_mut().enumerate() {
            let magnitude = buffer[bin].norm() * 2.0 / FFT_SIZE as f32;
            *slot = SMOOTHING_FACTOR * *slot + (1.0 - SMOOTHING_FACTOR) * magnitude;
            sum += byte_scale(*slot);
        }

        sum / self.smoothed.len() as f32
    }
}

/// Map a linear magnitude onto the 0..255 byte scale over
/// [`MIN_DECIBELS`, `MAX_DECIBELS`].
fn byte_scale(magnitude: f32) -> f32 {
    if magnitude <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0)
}

/// Audio activity detector: spawns the recurring sampling task.
pub struct ActivityDetector;

impl ActivityDetector {
    /// Start the sampling loop over `stream`, publishing into `meter`.
    ///
    /// The loop runs until the handle is stopped or the stream closes.
    /// Exactly one detector may be active per session; the controller
    /// enforces this.
    pub fn start(stream: &MediaStream, meter: Arc<LevelMeter>) -> DetectorHandle {
        let mut frames = stream.subscribe();
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut analyzer = LevelAnalyzer::new();
            let mut ticker = tokio::time::interval(TICK_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!("activity detector started");
            loop {
                tokio::select! {
                    _ = cancel_rx.changed() => break,
                    result = frames.recv() => match result {
                        Ok(frame) => analyzer.push(&frame.samples),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "activity detector lagged, skipping frames");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = ticker.tick() => {
                        meter.record(analyzer.level());
                    }
                }
            }
            meter.record(0.0);
            info!("activity detector stopped");
        });

        DetectorHandle {
            cancel: cancel_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running detector loop. Stopping cancels the pending tick and
/// joins the task; safe to call repeatedly.
pub struct DetectorHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl DetectorHandle {
    pub async fn stop(&mut self) {
        let _ = self.cancel.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise_frame(amplitude: f32, len: usize) -> Vec<i16> {
        // Deterministic pseudo-random broadband signal.
        let mut state: u32 = 0x2545_f491;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                let unit = (state >> 16) as f32 / u16::MAX as f32 * 2.0 - 1.0;
                (unit * amplitude * i16::MAX as f32) as i16
            })
            .collect()
    }

    #[test]
    fn silence_yields_zero_level() {
        let mut analyzer = LevelAnalyzer::new();
        analyzer.push(&vec![0i16; FFT_SIZE]);
        assert_eq!(analyzer.level(), 0.0);
    }

    #[test]
    fn broadband_signal_crosses_speaking_threshold() {
        let mut analyzer = LevelAnalyzer::new();
        // Several windows so the smoothing converges upward.
        let mut level = 0.0;
        for _ in 0..20 {
            analyzer.push(&noise_frame(0.5, FFT_SIZE));
            level = analyzer.level();
        }
        assert!(
            level > SPEAKING_THRESHOLD,
            "expected loud broadband input above threshold, got {level}"
        );
    }

    #[test]
    fn meter_flag_tracks_threshold() {
        let meter = LevelMeter::new();
        for &level in &[0.0, 5.0, 19.9, 20.0, 20.1, 200.0, 3.0] {
            meter.record(level);
            assert_eq!(meter.is_speaking(), level > SPEAKING_THRESHOLD);
            assert!((meter.level() - level).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn partially_filled_window_is_tolerated() {
        let mut analyzer = LevelAnalyzer::new();
        analyzer.push(&noise_frame(0.5, FFT_SIZE / 4));
        // Must not panic; level is defined with missing history as silence.
        let level = analyzer.level();
        assert!(level >= 0.0);
    }
}
