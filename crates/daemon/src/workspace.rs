use engine::naming::ARCHIVE_FILENAME;
use engine::{PipelineError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

const UPLOAD_DIR: &str = "uploads";
const AUDIO_DIR: &str = "generated_audio";
const OUTPUT_DIR: &str = "output_clips";

/// Scratch directories of one run: `<root>/runs/<run-id>/{uploads,generated_audio,output_clips}`
/// plus the archive next to them.
///
/// Runs never share directories, so concurrent runs cannot wipe each other.
#[derive(Debug, Clone)]
pub struct Workspace {
    run_dir: PathBuf,
}

impl Workspace {
    pub fn for_run(root: &Path, run_id: Uuid) -> Self {
        Workspace {
            run_dir: root.join("runs").join(run_id.to_string()),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.run_dir.join(UPLOAD_DIR)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.run_dir.join(AUDIO_DIR)
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.run_dir.join(OUTPUT_DIR)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.run_dir.join(ARCHIVE_FILENAME)
    }

    /// Wipe everything a previous attempt produced, except the upload.
    pub async fn reset_for_run(&self) -> Result<()> {
        ensure_clean(&self.audio_dir()).await?;
        ensure_clean(&self.clips_dir()).await?;
        remove_if_exists(&self.archive_path()).await
    }

    /// Drop the whole run tree.
    pub async fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.run_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::io(
                format!("Failed to remove {}", self.run_dir.display()),
                e,
            )),
        }
    }
}

/// Recreate `dir` empty. Any previous contents are destroyed.
pub async fn ensure_clean(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(PipelineError::io(
                format!("Failed to delete {}", dir.display()),
                e,
            ))
        }
    }

    fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::io(format!("Failed to create {}", dir.display()), e))?;

    let meta = fs::metadata(dir)
        .await
        .map_err(|e| PipelineError::io(format!("Failed to stat {}", dir.display()), e))?;
    if meta.permissions().readonly() {
        return Err(PipelineError::io(
            format!("{} is not writable", dir.display()),
            std::io::Error::from(ErrorKind::PermissionDenied),
        ));
    }
    Ok(())
}

pub async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::io(
            format!("Failed to remove {}", path.display()),
            e,
        )),
    }
}
