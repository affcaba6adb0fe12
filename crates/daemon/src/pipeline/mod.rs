//! Runs one configured request end to end:
//! workspace reset -> partition -> audio overlay -> encode -> archive.
//!
//! Every stage fails fast. Cancellation is honoured only between stages and
//! between clip encodes.

pub mod export;
pub mod overlay;
#[cfg(test)]
pub mod testing;

use engine::naming::{clip_file_names, grid_layout, source_stem};
use engine::render::Clip;
use engine::{
    partition, width_for_duration, AudioGenerationRequest, PipelineError, PipelineRequest, Result,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::media::{Codec, MediaHandle};
use crate::synth::Synthesizer;
use crate::workspace::Workspace;

pub use export::{ArchiveInfo, EncodedClip};
pub use overlay::OverlayOutcome;

/// Progress reported while a run is in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    AudioOverlaid { outcome: OverlayOutcome },
    ClipEncoded { index: usize, total: usize },
}

/// What a successful run leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub overlay: OverlayOutcome,
    pub clips: Vec<EncodedClip>,
    /// Clip file names, `columns` per row, in clip order.
    pub grid: Vec<Vec<String>>,
    pub archive: ArchiveInfo,
}

pub struct Pipeline {
    codec: Arc<dyn Codec>,
    synth: Arc<dyn Synthesizer>,
    encode_concurrency: usize,
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

impl Pipeline {
    pub fn new(
        codec: Arc<dyn Codec>,
        synth: Arc<dyn Synthesizer>,
        encode_concurrency: usize,
    ) -> Self {
        Pipeline {
            codec,
            synth,
            encode_concurrency: encode_concurrency.max(1),
        }
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub async fn run(
        &self,
        media: &MediaHandle,
        request: &PipelineRequest,
        workspace: &Workspace,
        cancel: &CancellationToken,
        on_event: &(dyn Fn(PipelineEvent) + Send + Sync),
    ) -> Result<RunOutput> {
        if request.selected_index >= request.clip_count {
            return Err(PipelineError::invalid(format!(
                "selected clip {} out of range for {} clips",
                request.selected_index + 1,
                request.clip_count
            )));
        }

        workspace.reset_for_run().await?;

        let intervals = partition(media.duration(), request.clip_count)?;
        let mut clips = Clip::from_intervals(&intervals);
        info!(
            clips = clips.len(),
            duration = media.duration(),
            "Partitioned source video"
        );
        checkpoint(cancel)?;

        let generation = match &request.prompt {
            Some(prompt) => {
                let width = width_for_duration(intervals[request.selected_index].duration())?;
                AudioGenerationRequest::new(prompt, &request.generation, width)
            }
            None => AudioGenerationRequest::new("", &request.generation, 0),
        };
        let outcome = overlay::overlay(
            &mut clips,
            request.selected_index,
            generation,
            self.synth.as_ref(),
            &workspace.audio_dir(),
        )
        .await?;
        on_event(PipelineEvent::AudioOverlaid {
            outcome: outcome.clone(),
        });
        checkpoint(cancel)?;

        let stem = source_stem(&media.path);
        let clips_dir = workspace.clips_dir();
        let encoded = export::encode_all(
            self.codec.as_ref(),
            &media.path,
            &clips,
            &stem,
            &clips_dir,
            self.encode_concurrency,
            cancel,
            &|index, total| on_event(PipelineEvent::ClipEncoded { index, total }),
        )
        .await?;

        let expected = clip_file_names(&stem, clips.len());
        let archive = export::archive(&clips_dir, &expected, &workspace.archive_path()).await?;

        Ok(RunOutput {
            overlay: outcome,
            grid: grid_layout(&expected, request.columns),
            clips: encoded,
            archive,
        })
    }
}
