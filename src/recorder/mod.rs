pub mod encoder;
pub mod flac;
pub mod recorder;
pub mod wav;

pub use encoder::{negotiate, Codec, Fragment, TrackEncoder};
pub use flac::FlacEncoder;
pub use recorder::{CaptureRecorder, RecorderHandle};
pub use wav::WavEncoder;
