pub mod ffmpeg;

use anyhow::Result;
use async_trait::async_trait;
use engine::interval::ClipInterval;
use engine::render::AudioSource;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub fps_num: i32,
    pub fps_den: i32,
    pub width: i32,
    pub height: i32,
    pub has_audio: bool,
}

/// A probed source video, held by a run from upload until the run is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaHandle {
    pub path: PathBuf,
    pub info: MediaInfo,
}

impl MediaHandle {
    pub fn duration(&self) -> f64 {
        self.info.duration_seconds
    }
}

/// Decode/encode collaborator. The ffmpeg implementation lives in [`ffmpeg`];
/// tests substitute their own.
#[async_trait]
pub trait Codec: Send + Sync {
    async fn probe(&self, path: &Path) -> engine::Result<MediaInfo>;

    /// Write `interval` of `source` to `output` with the given audio track.
    async fn encode_clip(
        &self,
        source: &Path,
        interval: &ClipInterval,
        audio: &AudioSource,
        output: &Path,
    ) -> engine::Result<()>;
}

pub async fn compute_file_checksum(file_path: &Path) -> Result<String> {
    let file = File::open(file_path).await?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
