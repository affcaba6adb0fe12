use engine::render::{AudioSource, Clip};
use engine::{width_for_duration, AudioGenerationRequest, PipelineError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::synth::Synthesizer;

const GENERATED_AUDIO_STEM: &str = "generated_audio";

/// Which branch the overlay stage took.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OverlayOutcome {
    /// Blank prompt: nothing was synthesized and every clip keeps its audio.
    Skipped,
    Replaced { index: usize, audio_path: PathBuf },
}

/// Replace the audio of `clips[selected_index]` with freshly synthesized audio.
///
/// The synthesizer is called at most once. Clips are only touched after the
/// generated track is safely on disk, so any error leaves them as they were.
pub async fn overlay(
    clips: &mut [Clip],
    selected_index: usize,
    request: AudioGenerationRequest,
    synth: &dyn Synthesizer,
    audio_dir: &Path,
) -> Result<OverlayOutcome> {
    let selected = clips.get(selected_index).ok_or_else(|| {
        PipelineError::invalid(format!(
            "selected clip index {} out of range for {} clips",
            selected_index,
            clips.len()
        ))
    })?;

    if request.prompt.trim().is_empty() {
        info!(clip = selected_index + 1, "Empty prompt, keeping original audio");
        return Ok(OverlayOutcome::Skipped);
    }

    let expected_width = width_for_duration(selected.interval.duration())?;
    if request.width != expected_width {
        return Err(PipelineError::invalid(format!(
            "generation width {} does not match clip duration (expected {})",
            request.width, expected_width
        )));
    }

    let extension = request.extension;
    let audio = synth.synthesize(request).await?;
    if audio.is_empty() {
        return Err(PipelineError::Generation(
            "synthesizer returned no audio".to_string(),
        ));
    }

    let audio_path = audio_dir.join(format!("{}.{}", GENERATED_AUDIO_STEM, extension.as_str()));
    tokio::fs::write(&audio_path, &audio).await.map_err(|e| {
        PipelineError::io(format!("Failed to write {}", audio_path.display()), e)
    })?;
    info!(path = %audio_path.display(), "Audio segment exported");

    clips[selected_index].audio = AudioSource::Replaced(audio_path.clone());
    info!(clip = selected_index + 1, "Added generated audio to clip");

    Ok(OverlayOutcome::Replaced {
        index: selected_index,
        audio_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::FakeSynth;
    use engine::{partition, GenerationDefaults, RunConfig};

    fn request(prompt: &str, width: u32) -> AudioGenerationRequest {
        let req = RunConfig::default()
            .validate(10.0, &GenerationDefaults::default(), &[])
            .unwrap();
        AudioGenerationRequest::new(prompt, &req.generation, width)
    }

    fn clips(count: usize) -> Vec<Clip> {
        Clip::from_intervals(&partition(20.0, count).unwrap())
    }

    #[tokio::test]
    async fn replaces_only_selected_clip() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = FakeSynth::ok(b"riff".to_vec());
        let mut clips = clips(4);
        let width = width_for_duration(5.0).unwrap();

        let outcome = overlay(&mut clips, 1, request("jazz", width), &synth, tmp.path())
            .await
            .unwrap();

        let path = tmp.path().join("generated_audio.mp3");
        assert_eq!(
            outcome,
            OverlayOutcome::Replaced {
                index: 1,
                audio_path: path.clone()
            }
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"riff");
        assert_eq!(synth.calls(), 1);
        assert_eq!(synth.last_request().unwrap().width, width);
        for (i, clip) in clips.iter().enumerate() {
            if i == 1 {
                assert_eq!(clip.audio, AudioSource::Replaced(path.clone()));
            } else {
                assert_eq!(clip.audio, AudioSource::Original);
            }
        }
    }

    #[tokio::test]
    async fn empty_prompt_skips_synthesis() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = FakeSynth::ok(b"riff".to_vec());
        let mut clips = clips(4);

        let outcome = overlay(&mut clips, 1, request("  ", 0), &synth, tmp.path())
            .await
            .unwrap();

        assert_eq!(outcome, OverlayOutcome::Skipped);
        assert_eq!(synth.calls(), 0);
        assert!(clips.iter().all(|c| c.audio == AudioSource::Original));
    }

    #[tokio::test]
    async fn generation_failure_leaves_clips_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = FakeSynth::failing("model exploded");
        let mut clips = clips(2);
        let width = width_for_duration(10.0).unwrap();

        let err = overlay(&mut clips, 0, request("jazz", width), &synth, tmp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(clips.iter().all(|c| c.audio == AudioSource::Original));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_audio_is_a_generation_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = FakeSynth::ok(Vec::new());
        let mut clips = clips(1);
        let width = width_for_duration(20.0).unwrap();

        let err = overlay(&mut clips, 0, request("jazz", width), &synth, tmp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Generation(_)));
        assert_eq!(clips[0].audio, AudioSource::Original);
    }

    #[tokio::test]
    async fn rejects_bad_index_and_width() {
        let tmp = tempfile::tempdir().unwrap();
        let synth = FakeSynth::ok(b"riff".to_vec());
        let mut clips = clips(2);

        let err = overlay(&mut clips, 2, request("jazz", 856), &synth, tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));

        let err = overlay(&mut clips, 0, request("jazz", 8), &synth, tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
        assert_eq!(synth.calls(), 0);
    }
}
