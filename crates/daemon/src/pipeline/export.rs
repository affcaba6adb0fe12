use engine::naming::clip_file_name;
use engine::render::Clip;
use engine::{PipelineError, Result};
use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::media::Codec;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedClip {
    pub index: usize,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Re-encode every clip into `out_dir`, up to `concurrency` at a time.
///
/// Cancellation is checked before each clip starts, never during an encode.
/// Results come back in clip order regardless of completion order.
pub async fn encode_all(
    codec: &dyn Codec,
    source: &Path,
    clips: &[Clip],
    stem: &str,
    out_dir: &Path,
    concurrency: usize,
    cancel: &CancellationToken,
    on_encoded: &(dyn Fn(usize, usize) + Send + Sync),
) -> Result<Vec<EncodedClip>> {
    let total = clips.len();

    // Collected first so the spawned run future stays `Send`.
    let encodes: Vec<_> = clips
        .iter()
        .map(|clip| async move {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let index = clip.interval.index;
            let file_name = clip_file_name(stem, index);
            let path = out_dir.join(&file_name);

            codec
                .encode_clip(source, &clip.interval, &clip.audio, &path)
                .await?;
            info!(clip = index + 1, total, file = %file_name, "Encoded clip");
            on_encoded(index, total);

            Ok(EncodedClip {
                index,
                file_name,
                path,
            })
        })
        .collect();

    stream::iter(encodes)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    #[serde(skip)]
    pub path: PathBuf,
    pub entries: Vec<String>,
    pub sha256: String,
}

/// Zip every file in `dir` into `archive_path`.
///
/// Fails without leaving anything at `archive_path` if an expected clip is
/// missing or any write fails. The archive is assembled under a `.part` name
/// and renamed into place only once complete.
pub async fn archive(dir: &Path, expected: &[String], archive_path: &Path) -> Result<ArchiveInfo> {
    for name in expected {
        let path = dir.join(name);
        let present = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !present {
            return Err(PipelineError::Packaging(format!(
                "expected clip file {} is missing",
                name
            )));
        }
    }

    let dir = dir.to_path_buf();
    let target = archive_path.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || write_zip(&dir, &target))
        .await
        .map_err(|e| PipelineError::Packaging(format!("archive task failed: {}", e)))??;

    let sha256 = crate::media::compute_file_checksum(archive_path)
        .await
        .map_err(|e| PipelineError::Packaging(format!("failed to checksum archive: {}", e)))?;

    info!(path = %archive_path.display(), entries = entries.len(), "Created zip archive of clips");
    Ok(ArchiveInfo {
        path: archive_path.to_path_buf(),
        entries,
        sha256,
    })
}

fn write_zip(dir: &Path, archive_path: &Path) -> Result<Vec<String>> {
    let part = archive_path.with_extension("zip.part");
    match build_zip(dir, &part) {
        Ok(entries) => {
            fs::rename(&part, archive_path).map_err(|e| {
                let _ = fs::remove_file(&part);
                PipelineError::Packaging(format!("failed to finalize archive: {}", e))
            })?;
            Ok(entries)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&part) {
                if rm.kind() != io::ErrorKind::NotFound {
                    warn!(path = %part.display(), error = %rm, "Failed to remove partial archive");
                }
            }
            Err(PipelineError::Packaging(e.to_string()))
        }
    }
}

fn build_zip(dir: &Path, part: &Path) -> anyhow::Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();

    let file = File::create(part)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in &names {
        zip.start_file(name.as_str(), options)?;
        let mut input = File::open(dir.join(name))?;
        io::copy(&mut input, &mut zip)?;
    }
    zip.finish()?.sync_all()?;

    Ok(names)
}
