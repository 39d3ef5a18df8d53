use anyhow::Result;
use serde::Deserialize;

use crate::media::{FacingMode, SyntheticConfig};
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct CameraConfig {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub default_facing_mode: FacingMode,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    pub file_stem: String,
    pub output_dir: String,
    pub reset_buffer_on_start: bool,
    pub chunk_interval_ms: u64,
    pub chunk_channel_capacity: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load from `path` (any format the config crate understands), with
    /// `CAPTURE_BOOTH__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "capture-booth")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8080)?
            .set_default("camera.ideal_width", 1920)?
            .set_default("camera.ideal_height", 1080)?
            .set_default("camera.default_facing_mode", "environment")?
            .set_default("recording.file_stem", "capture-stream")?
            .set_default("recording.output_dir", "~/Downloads")?
            .set_default("recording.reset_buffer_on_start", true)?
            .set_default("recording.chunk_interval_ms", 1000)?
            .set_default("recording.chunk_channel_capacity", 64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("CAPTURE_BOOTH")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Per-session settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ideal_width: self.camera.ideal_width,
            ideal_height: self.camera.ideal_height,
            default_facing_mode: self.camera.default_facing_mode,
            file_stem: self.recording.file_stem.clone(),
            reset_buffer_on_start: self.recording.reset_buffer_on_start,
            ..SessionConfig::default()
        }
    }
}
