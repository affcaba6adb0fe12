use crate::interval::ClipInterval;
use std::path::{Path, PathBuf};

/// Audio track a clip is encoded with.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Whatever audio the source has over the interval (none is fine).
    Original,
    /// An external file, padded with silence if shorter than the clip.
    Replaced(PathBuf),
}

/// One segment of the source video and the audio it will be encoded with.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub interval: ClipInterval,
    pub audio: AudioSource,
}

impl Clip {
    pub fn from_intervals(intervals: &[ClipInterval]) -> Vec<Clip> {
        intervals
            .iter()
            .map(|interval| Clip {
                interval: *interval,
                audio: AudioSource::Original,
            })
            .collect()
    }
}

pub struct RenderCommand {
    pub ffmpeg_args: Vec<String>,
    pub output_path: PathBuf,
}

fn seconds(value: f64) -> String {
    format!("{:.6}", value)
}

/// FFmpeg arguments that cut `interval` out of `source` and re-encode it to
/// H.264/AAC at `output_path`.
///
/// The video stream always comes from the source; the output is capped at the
/// interval duration so a longer replacement track is truncated.
pub fn generate_clip_command(
    source: &Path,
    interval: &ClipInterval,
    audio: &AudioSource,
    output_path: PathBuf,
) -> RenderCommand {
    let duration = seconds(interval.duration());

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-ss".into(),
        seconds(interval.start),
        "-t".into(),
        duration.clone(),
        "-i".into(),
        source.to_string_lossy().to_string(),
    ];

    match audio {
        AudioSource::Replaced(path) => {
            args.push("-i".into());
            args.push(path.to_string_lossy().to_string());
            args.extend(["-map", "0:v:0", "-map", "1:a:0", "-af", "apad"].map(String::from));
        }
        AudioSource::Original => {
            // `?` keeps sources without an audio stream encodable.
            args.extend(["-map", "0:v:0", "-map", "0:a?"].map(String::from));
        }
    }

    args.extend(
        [
            "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p", "-c:a",
            "aac", "-b:a", "128k",
        ]
        .map(String::from),
    );
    args.push("-t".into());
    args.push(duration);
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(output_path.to_string_lossy().to_string());

    RenderCommand {
        ffmpeg_args: args,
        output_path,
    }
}
