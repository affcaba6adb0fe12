use async_trait::async_trait;
use engine::interval::ClipInterval;
use engine::render::{generate_clip_command, AudioSource};
use engine::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use super::{Codec, MediaInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutput {
    format: Option<FormatInfo>,
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Shells out to the `ffprobe`/`ffmpeg` binaries.
pub struct FFmpegWrapper {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl FFmpegWrapper {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        FFmpegWrapper {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

fn parse_probe(stdout: &[u8]) -> engine::Result<MediaInfo> {
    let probe_output: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| PipelineError::Codec(format!("Failed to parse ffprobe JSON output: {}", e)))?;

    let duration_seconds = probe_output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let video_stream = probe_output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| PipelineError::Codec("no video stream found".to_string()))?;

    // "30/1" or "30000/1001"
    let fps_str = video_stream
        .r_frame_rate
        .as_deref()
        .or(video_stream.avg_frame_rate.as_deref());
    let (fps_num, fps_den) = fps_str
        .and_then(|s| {
            let (num, den) = s.split_once('/')?;
            Some((num.parse::<i32>().ok()?, den.parse::<i32>().ok()?))
        })
        .unwrap_or((30, 1));

    let has_audio = probe_output
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaInfo {
        duration_seconds,
        fps_num,
        fps_den,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        has_audio,
    })
}

#[async_trait]
impl Codec for FFmpegWrapper {
    async fn probe(&self, media_path: &Path) -> engine::Result<MediaInfo> {
        let output = Command::new(&self.ffprobe_bin)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=codec_type,width,height,r_frame_rate,avg_frame_rate",
                "-of",
                "json",
            ])
            .arg(media_path)
            .output()
            .await
            .map_err(|e| {
                PipelineError::Codec(format!(
                    "Failed to execute ffprobe. Make sure FFmpeg is installed. ({})",
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Codec(format!("ffprobe failed: {}", stderr.trim())));
        }

        parse_probe(&output.stdout)
    }

    async fn encode_clip(
        &self,
        source: &Path,
        interval: &ClipInterval,
        audio: &AudioSource,
        output: &Path,
    ) -> engine::Result<()> {
        let render = generate_clip_command(source, interval, audio, output.to_path_buf());
        debug!(args = ?render.ffmpeg_args, "ffmpeg clip encode");

        // A dropped encode (sibling failure) must not keep writing into the clip dir.
        let result = Command::new(&self.ffmpeg_bin)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(&render.ffmpeg_args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::Codec(format!(
                    "Failed to execute ffmpeg. Make sure FFmpeg is installed. ({})",
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PipelineError::Codec(format!(
                "ffmpeg failed to encode clip {}: {}",
                interval.index + 1,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_json() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "12.480000"}
        }"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.duration_seconds, 12.48);
        assert_eq!((info.fps_num, info.fps_den), (30000, 1001));
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!(info.has_audio);
    }

    #[test]
    fn audio_only_input_is_rejected() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        assert!(matches!(parse_probe(json), Err(PipelineError::Codec(_))));
    }

    #[test]
    fn silent_video_without_frame_rate() {
        let json = br#"{"streams": [{"codec_type": "video"}], "format": {}}"#;
        let info = parse_probe(json).unwrap();
        assert_eq!(info.duration_seconds, 0.0);
        assert_eq!((info.fps_num, info.fps_den), (30, 1));
        assert!(!info.has_audio);
    }
}
