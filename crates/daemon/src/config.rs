//! Daemon settings and TOML loading.
//!
//! Lookup order: the file named by `RIFFCUT_CONFIG`, then `riffcut.toml` in
//! the working directory, then built-in defaults. A missing file is fine; a
//! malformed one is an error.

use anyhow::{Context, Result};
use engine::request::{GenerationDefaults, DEFAULT_CHECKPOINT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

pub const CONFIG_ENV: &str = "RIFFCUT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "riffcut.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Base URL of the spectrogram inference server.
    pub url: String,
    pub timeout_secs: u64,
    /// Checkpoints a run may ask for. Empty means any.
    pub checkpoints: Vec<String>,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3013".to_string(),
            timeout_secs: 600,
            checkpoints: vec![DEFAULT_CHECKPOINT.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    /// Every run gets its own directory tree under `<workspace_root>/runs/`.
    pub workspace_root: PathBuf,
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    pub max_upload_bytes: usize,
    /// Clip encodes allowed in flight at once.
    pub encode_concurrency: usize,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub synthesizer: SynthesizerConfig,
    pub defaults: GenerationDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7878".to_string(),
            workspace_root: PathBuf::from(".riffcut"),
            log_level: "info".to_string(),
            max_upload_bytes: 1024 * 1024 * 1024,
            encode_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            synthesizer: SynthesizerConfig::default(),
            defaults: GenerationDefaults::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(text)?;
        settings.encode_concurrency = settings.encode_concurrency.max(1);
        Ok(settings)
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.to_ascii_lowercase().as_str() {
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::INFO,
        }
    }
}
