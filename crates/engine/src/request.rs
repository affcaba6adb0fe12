use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::interval::partition;
use crate::resolution::{width_for_duration, SPECTROGRAM_HEIGHT};
use crate::spectrogram::SpectrogramParams;

pub const MIN_NUM_CLIPS: u32 = 1;
pub const MAX_NUM_CLIPS: u32 = 10;
pub const MIN_COLUMNS: u32 = 1;
pub const MAX_COLUMNS: u32 = 5;
pub const MAX_INFERENCE_STEPS: u32 = 1000;

pub const DEFAULT_CHECKPOINT: &str = "riffusion/riffusion-model-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scheduler {
    #[default]
    DPMSolverMultistepScheduler,
    PNDMScheduler,
    DDIMScheduler,
    LMSDiscreteScheduler,
    EulerDiscreteScheduler,
    EulerAncestralDiscreteScheduler,
}

impl Scheduler {
    pub const ALL: [Scheduler; 6] = [
        Scheduler::DPMSolverMultistepScheduler,
        Scheduler::PNDMScheduler,
        Scheduler::DDIMScheduler,
        Scheduler::LMSDiscreteScheduler,
        Scheduler::EulerDiscreteScheduler,
        Scheduler::EulerAncestralDiscreteScheduler,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cuda,
    Cpu,
    Mps,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Cuda, Device::Cpu, Device::Mps];
}

/// Container the synthesized track is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioExtension {
    #[default]
    Mp3,
    Wav,
    Flac,
    Webm,
    M4a,
    Ogg,
}

impl AudioExtension {
    pub const ALL: [AudioExtension; 6] = [
        AudioExtension::Mp3,
        AudioExtension::Wav,
        AudioExtension::Flac,
        AudioExtension::Webm,
        AudioExtension::M4a,
        AudioExtension::Ogg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioExtension::Mp3 => "mp3",
            AudioExtension::Wav => "wav",
            AudioExtension::Flac => "flac",
            AudioExtension::Webm => "webm",
            AudioExtension::M4a => "m4a",
            AudioExtension::Ogg => "ogg",
        }
    }
}

/// Values used when a run configuration leaves a field out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    pub clip_count: u32,
    pub columns: u32,
    pub seed: u64,
    pub inference_steps: u32,
    pub guidance: f32,
    pub scheduler: Scheduler,
    pub device: Device,
    pub extension: AudioExtension,
    pub checkpoint: String,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            clip_count: 1,
            columns: 3,
            seed: 42,
            inference_steps: 30,
            guidance: 7.0,
            scheduler: Scheduler::default(),
            device: Device::default(),
            extension: AudioExtension::default(),
            checkpoint: DEFAULT_CHECKPOINT.to_string(),
        }
    }
}

/// Raw, unvalidated run parameters as submitted by a client.
///
/// `selected_clip` is 1-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub clip_count: Option<u32>,
    pub selected_clip: Option<u32>,
    pub prompt: String,
    pub negative_prompt: String,
    pub seed: Option<u64>,
    pub inference_steps: Option<u32>,
    pub guidance: Option<f32>,
    pub scheduler: Option<Scheduler>,
    pub extended_range: bool,
    pub extension: Option<AudioExtension>,
    pub device: Option<Device>,
    pub checkpoint: Option<String>,
    pub columns: Option<u32>,
}

/// Everything the synthesizer needs except the prompt and the width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub negative_prompt: String,
    pub seed: u64,
    pub inference_steps: u32,
    pub guidance: f32,
    pub scheduler: Scheduler,
    pub checkpoint: String,
    pub device: Device,
    pub extension: AudioExtension,
    pub spectrogram: SpectrogramParams,
}

/// A validated run, ready to hand to the orchestrator.
///
/// `selected_index` is 0-based. `prompt` is `None` when the submitted prompt
/// was blank, in which case no audio is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub clip_count: usize,
    pub selected_index: usize,
    pub prompt: Option<String>,
    pub generation: GenerationParams,
    pub columns: usize,
}

impl RunConfig {
    /// Bind defaults and check every field against the source duration.
    ///
    /// Performs no I/O, so a rejected configuration leaves the workspace alone.
    pub fn validate(
        self,
        total_duration: f64,
        defaults: &GenerationDefaults,
        allowed_checkpoints: &[String],
    ) -> Result<PipelineRequest> {
        let clip_count = self.clip_count.unwrap_or(defaults.clip_count);
        if !(MIN_NUM_CLIPS..=MAX_NUM_CLIPS).contains(&clip_count) {
            return Err(PipelineError::invalid(format!(
                "clip count must be between {} and {}, got {}",
                MIN_NUM_CLIPS, MAX_NUM_CLIPS, clip_count
            )));
        }

        let selected = self.selected_clip.unwrap_or(1);
        if selected < 1 || selected > clip_count {
            return Err(PipelineError::invalid(format!(
                "selected clip must be between 1 and {}, got {}",
                clip_count, selected
            )));
        }

        let columns = self.columns.unwrap_or(defaults.columns);
        if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&columns) {
            return Err(PipelineError::invalid(format!(
                "column count must be between {} and {}, got {}",
                MIN_COLUMNS, MAX_COLUMNS, columns
            )));
        }

        let inference_steps = self.inference_steps.unwrap_or(defaults.inference_steps);
        if inference_steps == 0 || inference_steps > MAX_INFERENCE_STEPS {
            return Err(PipelineError::invalid(format!(
                "inference steps must be between 1 and {}, got {}",
                MAX_INFERENCE_STEPS, inference_steps
            )));
        }

        let guidance = self.guidance.unwrap_or(defaults.guidance);
        if !guidance.is_finite() || guidance < 0.0 {
            return Err(PipelineError::invalid(format!(
                "guidance must be a non-negative number, got {}",
                guidance
            )));
        }

        let checkpoint = self
            .checkpoint
            .unwrap_or_else(|| defaults.checkpoint.clone());
        if !allowed_checkpoints.is_empty() && !allowed_checkpoints.contains(&checkpoint) {
            return Err(PipelineError::invalid(format!(
                "unknown checkpoint `{}`",
                checkpoint
            )));
        }

        let prompt = Some(self.prompt.trim().to_string()).filter(|p| !p.is_empty());

        let intervals = partition(total_duration, clip_count as usize)?;
        let selected_index = (selected - 1) as usize;
        if prompt.is_some() {
            width_for_duration(intervals[selected_index].duration())?;
        }

        Ok(PipelineRequest {
            clip_count: clip_count as usize,
            selected_index,
            prompt,
            generation: GenerationParams {
                negative_prompt: self.negative_prompt.trim().to_string(),
                seed: self.seed.unwrap_or(defaults.seed),
                inference_steps,
                guidance,
                scheduler: self.scheduler.unwrap_or(defaults.scheduler),
                checkpoint,
                device: self.device.unwrap_or(defaults.device),
                extension: self.extension.unwrap_or(defaults.extension),
                spectrogram: SpectrogramParams::for_range(self.extended_range),
            },
            columns: columns as usize,
        })
    }
}

/// One call to the synthesizer. Passed by value; the synthesizer knows nothing
/// about clips or partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioGenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub seed: u64,
    pub inference_steps: u32,
    pub guidance: f32,
    pub scheduler: Scheduler,
    pub checkpoint: String,
    pub device: Device,
    pub width: u32,
    pub height: u32,
    pub extension: AudioExtension,
    pub spectrogram_params: SpectrogramParams,
}

impl AudioGenerationRequest {
    pub fn new(prompt: &str, params: &GenerationParams, width: u32) -> Self {
        AudioGenerationRequest {
            prompt: prompt.to_string(),
            negative_prompt: params.negative_prompt.clone(),
            seed: params.seed,
            inference_steps: params.inference_steps,
            guidance: params.guidance,
            scheduler: params.scheduler,
            checkpoint: params.checkpoint.clone(),
            device: params.device,
            width,
            height: SPECTROGRAM_HEIGHT,
            extension: params.extension,
            spectrogram_params: params.spectrogram,
        }
    }
}
