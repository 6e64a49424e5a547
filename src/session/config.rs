use std::path::PathBuf;

use crate::recorder::Codec;

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Codec requested at recorder start; negotiation may fall back.
    pub preferred_codec: Codec,

    /// Where finished artifacts are saved.
    pub recordings_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preferred_codec: Codec::Flac,
            recordings_dir: PathBuf::from("recordings"),
        }
    }
}
