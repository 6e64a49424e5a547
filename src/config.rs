use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::capture::{BackendKind, CaptureConfig};
use crate::recorder::Codec;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureSettings,
    pub storage: StorageConfig,
    pub nats: NatsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    /// "microphone" or "synthetic"
    pub backend: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    pub preferred_codec: Codec,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub recordings_path: String,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn backend_kind(&self) -> Result<BackendKind> {
        match self.capture.backend.as_str() {
            "microphone" => Ok(BackendKind::Microphone),
            "synthetic" => Ok(BackendKind::Synthetic),
            other => anyhow::bail!("unknown capture backend {other:?}"),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.capture.sample_rate,
            channels: self.capture.channels,
            buffer_duration_ms: self.capture.buffer_duration_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            preferred_codec: self.capture.preferred_codec,
            recordings_dir: PathBuf::from(&self.storage.recordings_path),
        }
    }
}
