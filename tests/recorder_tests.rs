// Integration tests for the capture recorder.
//
// These drive the recorder over an in-process stream and verify fragment
// ordering, the final-fragment flush signal, and codec negotiation.

use podbooth::recorder::wav::WAV_HEADER_LEN;
use podbooth::{stream_pair, AudioFrame, CaptureRecorder, Codec, Fragment, StreamSpec};
use std::io::Cursor;
use tokio::sync::mpsc;

fn audio_spec(sample_rate: u32, channels: u16) -> StreamSpec {
    StreamSpec {
        sample_rate,
        channels,
        has_video: false,
    }
}

fn frame(samples: Vec<i16>, sample_rate: u32, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate,
        channels: 1,
        timestamp_ms,
    }
}

async fn collect_fragments(mut rx: mpsc::Receiver<Fragment>) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    while let Some(fragment) = rx.recv().await {
        let last = fragment.is_last;
        fragments.push(fragment);
        if last {
            break;
        }
    }
    fragments
}

#[tokio::test]
async fn wav_fragments_arrive_in_order_and_terminate() {
    let (stream, driver) = stream_pair(audio_spec(8000, 1));
    let (mut handle, rx) = CaptureRecorder::start(&stream, Codec::Wav).unwrap();
    assert_eq!(handle.codec(), Codec::Wav);

    // One fragment boundary per second of PCM at 8kHz mono.
    for i in 0..3u64 {
        driver.push(frame(vec![i as i16 + 1; 8000], 8000, i * 1000));
    }

    handle.stop().await.unwrap();
    let fragments = collect_fragments(rx).await;

    // Three data fragments plus the (empty) flush marker.
    assert_eq!(fragments.len(), 4);
    for (i, fragment) in fragments.iter().enumerate() {
        assert_eq!(fragment.sequence, i as u64);
    }
    assert!(fragments[3].is_last);
    assert!(fragments[3].bytes.is_empty());

    // First fragment carries the streaming header, the rest are raw PCM.
    assert_eq!(&fragments[0].bytes[0..4], b"RIFF");
    assert_eq!(fragments[0].bytes.len(), WAV_HEADER_LEN + 8000 * 2);
    assert_eq!(fragments[1].bytes.len(), 8000 * 2);
    assert_eq!(&fragments[1].bytes[0..2], &2i16.to_le_bytes());
}

#[tokio::test]
async fn stop_flushes_frames_already_captured() {
    let (stream, driver) = stream_pair(audio_spec(8000, 1));
    let (mut handle, rx) = CaptureRecorder::start(&stream, Codec::Wav).unwrap();

    // No yield between pushes and stop: everything below is still queued
    // when the stop signal lands, and must survive the flush.
    driver.push(frame(vec![7; 3000], 8000, 0));
    driver.push(frame(vec![8; 3000], 8000, 375));
    handle.stop().await.unwrap();

    let fragments = collect_fragments(rx).await;
    let total_bytes: usize = fragments.iter().map(|f| f.bytes.len()).sum();
    assert_eq!(total_bytes, WAV_HEADER_LEN + 6000 * 2);
    assert!(fragments.last().unwrap().is_last);
}

#[tokio::test]
async fn flac_emits_one_encoded_stream_at_flush() {
    let (stream, driver) = stream_pair(audio_spec(16000, 1));
    let (mut handle, rx) = CaptureRecorder::start(&stream, Codec::Flac).unwrap();
    assert_eq!(handle.codec(), Codec::Flac);

    let samples: Vec<i16> = (0..32000)
        .map(|i| {
            let t = i as f32 / 16000.0;
            ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 10000.0) as i16
        })
        .collect();
    driver.push(frame(samples[..16000].to_vec(), 16000, 0));
    driver.push(frame(samples[16000..].to_vec(), 16000, 1000));

    handle.stop().await.unwrap();
    let fragments = collect_fragments(rx).await;

    // FLAC buffers until flush: a single final fragment with the stream.
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].is_last);
    assert_eq!(&fragments[0].bytes[0..4], b"fLaC");

    let mut reader = claxon::FlacReader::new(Cursor::new(&fragments[0].bytes)).unwrap();
    let decoded: Vec<i32> = reader.samples().map(|s| s.unwrap()).collect();
    assert_eq!(decoded.len(), 32000);
    assert_eq!(decoded[0], samples[0] as i32);
}

#[tokio::test]
async fn preferred_codec_falls_back_on_unsupported_stream() {
    // FLAC caps at 8 channels; a 12-channel interface falls back to WAV.
    let (stream, _driver) = stream_pair(audio_spec(48000, 12));
    let (handle, _rx) = CaptureRecorder::start(&stream, Codec::Flac).unwrap();
    assert_eq!(handle.codec(), Codec::Wav);
}

#[tokio::test]
async fn video_stream_is_rejected_after_fallback() {
    let spec = StreamSpec {
        sample_rate: 48000,
        channels: 1,
        has_video: true,
    };
    let (stream, _driver) = stream_pair(spec);
    let err = CaptureRecorder::start(&stream, Codec::Flac).unwrap_err();
    assert!(matches!(
        err,
        podbooth::SessionError::UnsupportedFormat {
            preferred: Codec::Flac
        }
    ));
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (stream, driver) = stream_pair(audio_spec(8000, 1));
    let (mut handle, rx) = CaptureRecorder::start(&stream, Codec::Wav).unwrap();
    driver.push(frame(vec![1; 100], 8000, 0));

    handle.stop().await.unwrap();
    handle.stop().await.unwrap();
    assert!(handle.is_stopped());

    let fragments = collect_fragments(rx).await;
    assert_eq!(fragments.iter().filter(|f| f.is_last).count(), 1);
}
