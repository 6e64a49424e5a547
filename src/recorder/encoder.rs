use serde::{Deserialize, Serialize};

use crate::capture::{AudioFrame, StreamSpec};
use crate::error::{Result, SessionError};

/// Container/codec of the recorded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// FLAC stream, lossless compressed. Preferred default.
    Flac,
    /// Streamed RIFF/PCM. Fallback; every platform can play it.
    Wav,
}

impl Codec {
    /// Fallback used when the preferred codec does not fit the stream.
    pub const FALLBACK: Codec = Codec::Wav;

    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Flac => "flac",
            Codec::Wav => "wav",
        }
    }

    /// Whether this codec can encode a stream of the given shape. Neither
    /// built-in codec carries a video track; FLAC additionally caps the
    /// channel count and sample rate per its format limits.
    pub fn supports(&self, spec: &StreamSpec) -> bool {
        if spec.has_video || spec.channels == 0 || spec.sample_rate == 0 {
            return false;
        }
        match self {
            Codec::Flac => spec.channels <= 8 && spec.sample_rate <= 655_350,
            Codec::Wav => true,
        }
    }
}

/// An incremental piece of encoded media. The fragment with `is_last` set is
/// emitted exactly once, when the encoder flushes; it is the signal that no
/// further data will arrive.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub sequence: u64,
    pub bytes: Vec<u8>,
    pub is_last: bool,
}

/// Incremental track encoder.
///
/// `encode` may buffer internally and emit data at its own cadence; `finish`
/// flushes whatever remains. Fragment bytes concatenate, in order, into the
/// final artifact.
pub trait TrackEncoder: Send + std::fmt::Debug {
    fn codec(&self) -> Codec;

    /// Feed one captured frame; returns encoded bytes when a fragment
    /// boundary is reached.
    fn encode(&mut self, frame: &AudioFrame) -> Result<Option<Vec<u8>>>;

    /// Flush remaining data. May return an empty payload.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// Pick an encoder for the stream: the preferred codec if it fits,
/// otherwise the fallback, otherwise `UnsupportedFormat`.
pub fn negotiate(preferred: Codec, spec: &StreamSpec) -> Result<Box<dyn TrackEncoder>> {
    for codec in [preferred, Codec::FALLBACK] {
        if codec.supports(spec) {
            return Ok(build_encoder(codec, spec));
        }
    }
    Err(SessionError::UnsupportedFormat { preferred })
}

fn build_encoder(codec: Codec, spec: &StreamSpec) -> Box<dyn TrackEncoder> {
    match codec {
        Codec::Flac => Box::new(super::flac::FlacEncoder::new(spec)),
        Codec::Wav => Box::new(super::wav::WavEncoder::new(spec)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_spec() -> StreamSpec {
        StreamSpec {
            sample_rate: 48000,
            channels: 1,
            has_video: false,
        }
    }

    #[test]
    fn preferred_codec_wins_when_supported() {
        let encoder = negotiate(Codec::Flac, &audio_spec()).unwrap();
        assert_eq!(encoder.codec(), Codec::Flac);
    }

    #[test]
    fn falls_back_when_preferred_does_not_fit() {
        // FLAC caps at 8 channels; WAV takes anything audio.
        let spec = StreamSpec {
            channels: 12,
            ..audio_spec()
        };
        let encoder = negotiate(Codec::Flac, &spec).unwrap();
        assert_eq!(encoder.codec(), Codec::Wav);
    }

    #[test]
    fn video_stream_is_unsupported_after_fallback() {
        let spec = StreamSpec {
            has_video: true,
            ..audio_spec()
        };
        let err = negotiate(Codec::Flac, &spec).unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnsupportedFormat {
                preferred: Codec::Flac
            }
        ));
    }
}
