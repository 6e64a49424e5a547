use crate::capture::{AudioFrame, StreamSpec};
use crate::error::Result;

use super::encoder::{Codec, TrackEncoder};

/// Seconds of PCM per emitted fragment.
const FRAGMENT_SECONDS: u64 = 1;

/// Size fields written while the stream length is still unknown, the
/// streaming-WAV convention. `Artifact::save` patches them once the total
/// length is known.
pub const STREAMING_SIZE_PLACEHOLDER: u32 = u32::MAX;

/// Length of the RIFF/fmt/data preamble emitted before the first sample.
pub const WAV_HEADER_LEN: usize = 44;

/// Streamed 16-bit PCM WAV encoder.
///
/// The first fragment carries the RIFF header with placeholder sizes (the
/// sink is a fragment stream, not a seekable file, so the totals cannot be
/// back-patched here) followed by PCM data; subsequent fragments are raw
/// PCM. Concatenated fragments form a playable streaming WAV.
#[derive(Debug)]
pub struct WavEncoder {
    sample_rate: u32,
    channels: u16,
    header_written: bool,
    pending: Vec<u8>,
    fragment_bytes: usize,
}

impl WavEncoder {
    pub fn new(spec: &StreamSpec) -> Self {
        let fragment_bytes =
            (spec.sample_rate as u64 * FRAGMENT_SECONDS) as usize * spec.channels as usize * 2;
        Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            header_written: false,
            pending: Vec::with_capacity(fragment_bytes + WAV_HEADER_LEN),
            fragment_bytes,
        }
    }

    fn header(&self) -> [u8; WAV_HEADER_LEN] {
        let mut header = [0u8; WAV_HEADER_LEN];
        let byte_rate = self.sample_rate * self.channels as u32 * 2;
        let block_align = self.channels * 2;

        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&STREAMING_SIZE_PLACEHOLDER.to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        header[32..34].copy_from_slice(&block_align.to_le_bytes());
        header[34..36].copy_from_slice(&16u16.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&STREAMING_SIZE_PLACEHOLDER.to_le_bytes());
        header
    }

    fn take_pending(&mut self) -> Vec<u8> {
        let mut bytes = std::mem::take(&mut self.pending);
        if !self.header_written {
            let mut with_header = self.header().to_vec();
            with_header.append(&mut bytes);
            self.header_written = true;
            with_header
        } else {
            bytes
        }
    }
}

impl TrackEncoder for WavEncoder {
    fn codec(&self) -> Codec {
        Codec::Wav
    }

    fn encode(&mut self, frame: &AudioFrame) -> Result<Option<Vec<u8>>> {
        for &sample in &frame.samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }
        if self.pending.len() >= self.fragment_bytes {
            Ok(Some(self.take_pending()))
        } else {
            Ok(None)
        }
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.pending.is_empty() && self.header_written {
            return Ok(Vec::new());
        }
        // A recording that stopped before the first boundary still needs a
        // valid header in front of its data.
        Ok(self.take_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> StreamSpec {
        StreamSpec {
            sample_rate: 8000,
            channels: 1,
            has_video: false,
        }
    }

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 8000,
            channels: 1,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn first_fragment_carries_header() {
        let mut encoder = WavEncoder::new(&spec());
        // 8000 samples = exactly one fragment second.
        let fragment = encoder.encode(&frame(vec![1i16; 8000])).unwrap().unwrap();
        assert_eq!(&fragment[0..4], b"RIFF");
        assert_eq!(&fragment[8..12], b"WAVE");
        assert_eq!(fragment.len(), WAV_HEADER_LEN + 8000 * 2);
    }

    #[test]
    fn later_fragments_are_raw_pcm() {
        let mut encoder = WavEncoder::new(&spec());
        encoder.encode(&frame(vec![0i16; 8000])).unwrap().unwrap();
        let second = encoder.encode(&frame(vec![2i16; 8000])).unwrap().unwrap();
        assert_eq!(second.len(), 8000 * 2);
        assert_eq!(&second[0..2], &2i16.to_le_bytes());
    }

    #[test]
    fn finish_flushes_short_recordings_with_header() {
        let mut encoder = WavEncoder::new(&spec());
        assert!(encoder.encode(&frame(vec![3i16; 100])).unwrap().is_none());
        let tail = encoder.finish().unwrap();
        assert_eq!(&tail[0..4], b"RIFF");
        assert_eq!(tail.len(), WAV_HEADER_LEN + 100 * 2);
    }

    #[test]
    fn finish_after_boundary_is_empty() {
        let mut encoder = WavEncoder::new(&spec());
        encoder.encode(&frame(vec![0i16; 8000])).unwrap().unwrap();
        assert!(encoder.finish().unwrap().is_empty());
    }
}
