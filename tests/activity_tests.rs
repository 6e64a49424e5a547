// Integration tests for the audio activity detector.
//
// The detector loop runs against an in-process stream; tests feed PCM and
// observe the shared meter the way the controller and the HTTP surface do.

use podbooth::{stream_pair, ActivityDetector, AudioFrame, LevelMeter, StreamSpec};
use std::sync::Arc;
use std::time::Duration;

fn spec() -> StreamSpec {
    StreamSpec {
        sample_rate: 16000,
        channels: 1,
        has_video: false,
    }
}

/// Deterministic broadband signal, loud enough to cross the threshold.
fn noise_frame(amplitude: f32, len: usize) -> AudioFrame {
    let mut state: u32 = 0x1234_5678;
    AudioFrame {
        samples: (0..len)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                let unit = (state >> 16) as f32 / u16::MAX as f32 * 2.0 - 1.0;
                (unit * amplitude * i16::MAX as f32) as i16
            })
            .collect(),
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    }
}

fn silence_frame(len: usize) -> AudioFrame {
    AudioFrame {
        samples: vec![0; len],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    }
}

async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let steps = (deadline.as_millis() / 10).max(1);
    for _ in 0..steps {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn speech_crosses_the_speaking_threshold() {
    let (stream, driver) = stream_pair(spec());
    let meter = Arc::new(LevelMeter::new());
    let mut handle = ActivityDetector::start(&stream, Arc::clone(&meter));

    // Feed loud broadband audio until the detector reports speech.
    let speaking = {
        let meter = Arc::clone(&meter);
        wait_until(Duration::from_secs(3), move || {
            driver.push(noise_frame(0.6, 1600));
            meter.is_speaking()
        })
        .await
    };
    assert!(speaking, "loud input never crossed the speaking threshold");
    assert!(meter.level() > podbooth::SPEAKING_THRESHOLD);

    handle.stop().await;
    assert!(handle.is_stopped());
    // Stopping resets the published level.
    assert_eq!(meter.level(), 0.0);
    assert!(!meter.is_speaking());
}

#[tokio::test]
async fn silence_after_speech_clears_the_flag() {
    let (stream, driver) = stream_pair(spec());
    let meter = Arc::new(LevelMeter::new());
    let mut handle = ActivityDetector::start(&stream, Arc::clone(&meter));

    let became_loud = {
        let meter = Arc::clone(&meter);
        let driver = &driver;
        wait_until(Duration::from_secs(3), move || {
            driver.push(noise_frame(0.6, 1600));
            meter.is_speaking()
        })
        .await
    };
    assert!(became_loud);

    let went_quiet = {
        let meter = Arc::clone(&meter);
        let driver = &driver;
        wait_until(Duration::from_secs(3), move || {
            driver.push(silence_frame(1600));
            !meter.is_speaking()
        })
        .await
    };
    assert!(went_quiet, "silence never brought the level back down");

    handle.stop().await;
}

#[tokio::test]
async fn detector_stop_is_idempotent() {
    let (stream, _driver) = stream_pair(spec());
    let meter = Arc::new(LevelMeter::new());
    let mut handle = ActivityDetector::start(&stream, Arc::clone(&meter));

    handle.stop().await;
    handle.stop().await;
    assert!(handle.is_stopped());
}

#[tokio::test]
async fn detector_survives_stream_release() {
    let (stream, driver) = stream_pair(spec());
    let meter = Arc::new(LevelMeter::new());
    let mut handle = ActivityDetector::start(&stream, Arc::clone(&meter));

    driver.push(noise_frame(0.6, 1600));
    stream.release();

    // The loop must stay cancellable after its source is gone.
    handle.stop().await;
    assert!(handle.is_stopped());
    assert!(!meter.is_speaking());
}
