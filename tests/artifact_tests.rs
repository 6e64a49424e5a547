// Integration tests for artifact assembly and local save.
//
// Saved artifacts are decoded back with hound (WAV) and claxon (FLAC) to
// prove the concatenated fragment stream is a playable file.

use podbooth::recorder::{FlacEncoder, TrackEncoder, WavEncoder};
use podbooth::{Artifact, AudioFrame, Codec, StreamSpec};
use tempfile::TempDir;

fn spec(sample_rate: u32) -> StreamSpec {
    StreamSpec {
        sample_rate,
        channels: 1,
        has_video: false,
    }
}

fn frame(samples: Vec<i16>, sample_rate: u32) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate,
        channels: 1,
        timestamp_ms: 0,
    }
}

fn sine(sample_rate: u32, len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 10000.0) as i16
        })
        .collect()
}

#[test]
fn saved_wav_artifact_decodes_with_patched_sizes() {
    let samples = sine(8000, 12000);
    let mut encoder = WavEncoder::new(&spec(8000));
    let mut chunks = Vec::new();

    // One full fragment second, then a short tail flushed at finish.
    if let Some(bytes) = encoder.encode(&frame(samples[..8000].to_vec(), 8000)).unwrap() {
        chunks.push(bytes);
    }
    assert!(encoder
        .encode(&frame(samples[8000..].to_vec(), 8000))
        .unwrap()
        .is_none());
    let tail = encoder.finish().unwrap();
    if !tail.is_empty() {
        chunks.push(tail);
    }
    assert_eq!(chunks.len(), 2);

    let dir = TempDir::new().unwrap();
    let artifact = Artifact::from_chunks(Codec::Wav, &chunks);
    let path = artifact.save(dir.path(), "Episode 7: Origins").unwrap();
    assert_eq!(path.file_name().unwrap(), "episode-7-origins.wav");

    // hound rejects streams whose declared sizes are wrong, so a clean
    // decode proves the placeholder sizes were patched at save time.
    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 8000);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().bits_per_sample, 16);
    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded, samples);
}

#[test]
fn saved_flac_artifact_decodes_losslessly() {
    let samples = sine(16000, 16000);
    let mut encoder = FlacEncoder::new(&spec(16000));
    assert!(encoder
        .encode(&frame(samples.clone(), 16000))
        .unwrap()
        .is_none());
    let chunks = vec![encoder.finish().unwrap()];

    let dir = TempDir::new().unwrap();
    let artifact = Artifact::from_chunks(Codec::Flac, &chunks);
    let path = artifact.save(dir.path(), "Quiet Episode").unwrap();
    assert_eq!(path.file_name().unwrap(), "quiet-episode.flac");

    let mut reader = claxon::FlacReader::open(&path).unwrap();
    let decoded: Vec<i32> = reader.samples().map(|s| s.unwrap()).collect();
    assert_eq!(decoded.len(), samples.len());
    for (original, decoded) in samples.iter().zip(decoded.iter()) {
        assert_eq!(*original as i32, *decoded);
    }
}

#[test]
fn artifact_naming_is_deterministic_per_title() {
    let dir = TempDir::new().unwrap();
    let artifact = Artifact::from_chunks(Codec::Wav, &[vec![0u8; 16]]);

    let first = artifact.save(dir.path(), "Same Title").unwrap();
    let second = artifact.save(dir.path(), "Same Title").unwrap();
    assert_eq!(first, second);

    let other = artifact.save(dir.path(), "Other Title").unwrap();
    assert_ne!(first, other);
}

#[test]
fn empty_recording_still_saves_a_file() {
    let dir = TempDir::new().unwrap();
    let artifact = Artifact::from_chunks(Codec::Flac, &[]);
    let path = artifact.save(dir.path(), "Nothing Recorded").unwrap();
    assert!(path.exists());
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
}
