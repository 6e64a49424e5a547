//! The finished recording and its local-save hand-off.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::recorder::{Codec, Fragment};

/// A finished recording: the session's fragments concatenated in arrival
/// order, tagged with the codec that was negotiated at recorder start.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub codec: Codec,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn from_chunks(codec: Codec, chunks: &[Vec<u8>]) -> Self {
        let mut bytes = Vec::with_capacity(chunks.iter().map(Vec::len).sum());
        for chunk in chunks {
            bytes.extend_from_slice(chunk);
        }
        Self { codec, bytes }
    }

    /// File name derived deterministically from the episode title.
    pub fn file_name(&self, title: &str) -> String {
        format!("{}.{}", slugify(title), self.codec.extension())
    }

    /// Save under `dir`, named from the episode title. WAV artifacts get
    /// their streaming-placeholder RIFF sizes patched now that the total
    /// length is known.
    pub fn save(&self, dir: &Path, title: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name(title));

        let mut bytes = self.bytes.clone();
        if self.codec == Codec::Wav {
            patch_riff_sizes(&mut bytes);
        }

        fs::write(&path, &bytes)?;
        info!(path = %path.display(), size = bytes.len(), "artifact saved");
        Ok(path)
    }
}

/// Append fragment payloads in arrival order. The final flush marker may
/// carry no data; appending an empty chunk would only distort the count.
pub fn append_fragment(chunks: &mut Vec<Vec<u8>>, fragment: Fragment) {
    if !(fragment.is_last && fragment.bytes.is_empty()) {
        chunks.push(fragment.bytes);
    }
}

/// Lowercased, dash-separated, filesystem-safe rendition of a title.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}

/// Rewrite the RIFF and data chunk sizes of a streamed WAV in place.
fn patch_riff_sizes(bytes: &mut [u8]) {
    const HEADER_LEN: usize = crate::recorder::wav::WAV_HEADER_LEN;
    if bytes.len() < HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[36..40] != b"data" {
        return;
    }
    let riff_size = (bytes.len() - 8) as u32;
    let data_size = (bytes.len() - HEADER_LEN) as u32;
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
    bytes[40..44].copy_from_slice(&data_size.to_le_bytes());
}
