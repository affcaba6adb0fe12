use chrono::{DateTime, Utc};
use engine::naming::{is_supported_container, sanitize_upload_name, SUPPORTED_CONTAINERS};
use engine::{PipelineError, PipelineRequest, RunConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::media::{MediaHandle, MediaInfo};
use crate::pipeline::{OverlayOutcome, Pipeline, PipelineEvent, RunOutput};
use crate::workspace::{ensure_clean, Workspace};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Uploaded,
    Configured,
    Running,
    Succeeded,
    Failed { kind: String, reason: String },
}

impl RunState {
    fn failed(err: &PipelineError) -> Self {
        RunState::Failed {
            kind: err.kind().to_string(),
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    StateChanged { run_id: Uuid, state: RunState },
    AudioOverlaid { run_id: Uuid, outcome: OverlayOutcome },
    ClipEncoded { run_id: Uuid, index: usize, total: usize },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::StateChanged { run_id, .. }
            | RunEvent::AudioOverlaid { run_id, .. }
            | RunEvent::ClipEncoded { run_id, .. } => *run_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("run {0} not found")]
    NotFound(Uuid),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type RunResult<T> = std::result::Result<T, RunError>;

struct RunRecord {
    state: RunState,
    workspace: Workspace,
    media: Option<MediaHandle>,
    request: Option<PipelineRequest>,
    output: Option<RunOutput>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RunRecord {
    fn enter(&mut self, state: RunState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Read-only view of a run. Clip names and the grid are only present once the
/// run has succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: Uuid,
    #[serde(flatten)]
    pub state: RunState,
    pub source: Option<String>,
    pub duration_seconds: Option<f64>,
    pub media: Option<MediaInfo>,
    pub request: Option<PipelineRequest>,
    pub output: Option<RunOutput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct RunManager {
    settings: Arc<Settings>,
    pipeline: Pipeline,
    runs: Mutex<HashMap<Uuid, RunRecord>>,
    event_tx: broadcast::Sender<RunEvent>,
}

impl RunManager {
    pub fn new(settings: Arc<Settings>, pipeline: Pipeline) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        RunManager {
            settings,
            pipeline,
            runs: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.event_tx.subscribe()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<Uuid, RunRecord>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RunEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn set_state(&self, id: Uuid, state: RunState) {
        if let Some(record) = self.runs().get_mut(&id) {
            record.enter(state.clone());
        }
        self.emit(RunEvent::StateChanged { run_id: id, state });
    }

    /// Store an uploaded video in a fresh run and probe it.
    pub async fn upload(&self, file_name: &str, data: &[u8]) -> RunResult<Uuid> {
        let name = sanitize_upload_name(file_name)
            .ok_or_else(|| PipelineError::invalid("missing upload file name"))?;
        if !is_supported_container(&name) {
            return Err(PipelineError::invalid(format!(
                "unsupported video container `{}` (expected one of {})",
                name,
                SUPPORTED_CONTAINERS.join(", ")
            ))
            .into());
        }
        if data.is_empty() {
            return Err(PipelineError::invalid("uploaded video is empty").into());
        }

        let id = Uuid::new_v4();
        let workspace = Workspace::for_run(&self.settings.workspace_root, id);
        let now = Utc::now();
        self.runs().insert(
            id,
            RunRecord {
                state: RunState::Idle,
                workspace: workspace.clone(),
                media: None,
                request: None,
                output: None,
                cancel: CancellationToken::new(),
                created_at: now,
                updated_at: now,
            },
        );

        match self.store_upload(&workspace, &name, data).await {
            Ok(media) => {
                info!(
                    run_id = %id,
                    dir = %workspace.run_dir().display(),
                    path = %media.path.display(),
                    duration = media.duration(),
                    "Uploaded video saved"
                );
                if let Some(record) = self.runs().get_mut(&id) {
                    record.media = Some(media);
                }
                self.set_state(id, RunState::Uploaded);
                Ok(id)
            }
            Err(e) => {
                warn!(run_id = %id, error = %e, "Rejected upload");
                self.runs().remove(&id);
                if let Err(rm) = workspace.remove().await {
                    warn!(run_id = %id, error = %rm, "Failed to clean up rejected upload");
                }
                Err(e.into())
            }
        }
    }

    async fn store_upload(
        &self,
        workspace: &Workspace,
        name: &str,
        data: &[u8],
    ) -> engine::Result<MediaHandle> {
        let upload_dir = workspace.upload_dir();
        ensure_clean(&upload_dir).await?;
        let path: PathBuf = upload_dir.join(name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| PipelineError::io(format!("Failed to write {}", path.display()), e))?;

        let info = self.pipeline.codec().probe(&path).await?;
        if !(info.duration_seconds > 0.0) {
            return Err(PipelineError::invalid(format!(
                "{} has no playable duration",
                name
            )));
        }
        Ok(MediaHandle { path, info })
    }

    /// Validate and bind a configuration. Nothing on disk changes.
    pub fn configure(&self, id: Uuid, config: RunConfig) -> RunResult<PipelineRequest> {
        let request = {
            let mut runs = self.runs();
            let record = runs.get_mut(&id).ok_or(RunError::NotFound(id))?;
            match record.state {
                RunState::Idle => {
                    return Err(RunError::Conflict("video upload has not finished".into()))
                }
                RunState::Running => {
                    return Err(RunError::Conflict("run is in progress".into()))
                }
                _ => {}
            }
            let media = record
                .media
                .as_ref()
                .ok_or_else(|| RunError::Conflict("no video uploaded".into()))?;

            let request = config.validate(
                media.duration(),
                &self.settings.defaults,
                &self.settings.synthesizer.checkpoints,
            )?;
            record.request = Some(request.clone());
            record.output = None;
            record.enter(RunState::Configured);
            request
        };
        self.emit(RunEvent::StateChanged {
            run_id: id,
            state: RunState::Configured,
        });
        Ok(request)
    }

    /// Move a configured (or finished) run to `Running` and execute it in the
    /// background. Re-starting discards the previous attempt's artifacts.
    pub fn start(self: &Arc<Self>, id: Uuid) -> RunResult<()> {
        let (media, request, workspace, cancel) = {
            let mut runs = self.runs();
            let record = runs.get_mut(&id).ok_or(RunError::NotFound(id))?;
            match record.state {
                RunState::Configured | RunState::Succeeded | RunState::Failed { .. } => {}
                RunState::Running => {
                    return Err(RunError::Conflict("run is already in progress".into()))
                }
                _ => return Err(RunError::Conflict("run has not been configured".into())),
            }
            let (Some(media), Some(request)) = (record.media.clone(), record.request.clone())
            else {
                return Err(RunError::Conflict("run has not been configured".into()));
            };
            record.cancel = CancellationToken::new();
            record.output = None;
            // Claimed under the lock so a concurrent start sees `Running`.
            record.enter(RunState::Running);
            (media, request, record.workspace.clone(), record.cancel.clone())
        };
        self.emit(RunEvent::StateChanged {
            run_id: id,
            state: RunState::Running,
        });

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.execute(id, media, request, workspace, cancel).await;
        });
        Ok(())
    }

    async fn execute(
        &self,
        id: Uuid,
        media: MediaHandle,
        request: PipelineRequest,
        workspace: Workspace,
        cancel: CancellationToken,
    ) {
        info!(
            run_id = %id,
            clips = request.clip_count,
            selected = request.selected_index + 1,
            "Run started"
        );
        let tx = self.event_tx.clone();
        let on_event = move |event: PipelineEvent| {
            let event = match event {
                PipelineEvent::AudioOverlaid { outcome } => RunEvent::AudioOverlaid {
                    run_id: id,
                    outcome,
                },
                PipelineEvent::ClipEncoded { index, total } => RunEvent::ClipEncoded {
                    run_id: id,
                    index,
                    total,
                },
            };
            let _ = tx.send(event);
        };

        match self
            .pipeline
            .run(&media, &request, &workspace, &cancel, &on_event)
            .await
        {
            Ok(output) => {
                info!(run_id = %id, archive = %output.archive.path.display(), "Processing complete");
                if let Some(record) = self.runs().get_mut(&id) {
                    record.output = Some(output);
                }
                self.set_state(id, RunState::Succeeded);
            }
            Err(e) => {
                error!(run_id = %id, kind = e.kind(), error = %e, "Run failed");
                self.set_state(id, RunState::failed(&e));
            }
        }
    }

    /// Request cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self, id: Uuid) -> RunResult<()> {
        let runs = self.runs();
        let record = runs.get(&id).ok_or(RunError::NotFound(id))?;
        if record.state != RunState::Running {
            return Err(RunError::Conflict("run is not in progress".into()));
        }
        record.cancel.cancel();
        info!(run_id = %id, "Cancellation requested");
        Ok(())
    }

    /// Forget a run and delete its directory tree.
    pub async fn remove(&self, id: Uuid) -> RunResult<()> {
        let workspace = {
            let mut runs = self.runs();
            let record = runs.get(&id).ok_or(RunError::NotFound(id))?;
            if matches!(record.state, RunState::Running | RunState::Idle) {
                return Err(RunError::Conflict("run is busy".into()));
            }
            let workspace = record.workspace.clone();
            runs.remove(&id);
            workspace
        };
        workspace.remove().await?;
        Ok(())
    }

    pub fn snapshot(&self, id: Uuid) -> RunResult<RunSnapshot> {
        let runs = self.runs();
        let record = runs.get(&id).ok_or(RunError::NotFound(id))?;
        Ok(RunSnapshot {
            id,
            state: record.state.clone(),
            source: record.media.as_ref().and_then(|m| {
                m.path.file_name().map(|n| n.to_string_lossy().to_string())
            }),
            duration_seconds: record.media.as_ref().map(|m| m.duration()),
            media: record.media.as_ref().map(|m| m.info.clone()),
            request: record.request.clone(),
            output: match record.state {
                RunState::Succeeded => record.output.clone(),
                _ => None,
            },
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn list(&self) -> Vec<RunSnapshot> {
        let ids: Vec<Uuid> = self.runs().keys().copied().collect();
        let mut snapshots: Vec<RunSnapshot> =
            ids.into_iter().filter_map(|id| self.snapshot(id).ok()).collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Path of a clip from a succeeded run, if `name` is one of its clips.
    pub fn clip_path(&self, id: Uuid, name: &str) -> RunResult<Option<PathBuf>> {
        let runs = self.runs();
        let record = runs.get(&id).ok_or(RunError::NotFound(id))?;
        let output = match (&record.state, &record.output) {
            (RunState::Succeeded, Some(output)) => output,
            _ => return Ok(None),
        };
        Ok(output
            .clips
            .iter()
            .find(|c| c.file_name == name)
            .map(|c| c.path.clone()))
    }

    /// Archive path and checksum of a succeeded run.
    pub fn archive(&self, id: Uuid) -> RunResult<Option<(PathBuf, String)>> {
        let runs = self.runs();
        let record = runs.get(&id).ok_or(RunError::NotFound(id))?;
        Ok(match (&record.state, &record.output) {
            (RunState::Succeeded, Some(output)) => {
                Some((output.archive.path.clone(), output.archive.sha256.clone()))
            }
            _ => None,
        })
    }
}
