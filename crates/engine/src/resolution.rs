use crate::error::{PipelineError, Result};

/// STFT hop length of the spectrogram model, in samples.
pub const HOP_LENGTH: u32 = 512;

/// Sample rate the spectrogram model is trained at.
pub const MODEL_SAMPLE_RATE: u32 = 44_100;

/// Generated widths are floored to this multiple.
pub const WIDTH_ALIGNMENT: u32 = 8;

/// Spectrogram images are always this tall.
pub const SPECTROGRAM_HEIGHT: u32 = 512;

/// Seconds of audio covered by one spectrogram column.
pub fn time_per_pixel() -> f64 {
    HOP_LENGTH as f64 / MODEL_SAMPLE_RATE as f64
}

/// Shortest clip that still maps to one aligned block of columns.
pub fn min_duration() -> f64 {
    WIDTH_ALIGNMENT as f64 * time_per_pixel()
}

/// Spectrogram width whose decoded audio lasts (at most) `duration` seconds.
///
/// The raw width is floored to a multiple of [`WIDTH_ALIGNMENT`]. Durations
/// that floor to zero columns are rejected instead of producing an empty image.
pub fn width_for_duration(duration: f64) -> Result<u32> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(PipelineError::invalid(format!(
            "clip duration must be positive, got {}",
            duration
        )));
    }

    let raw = (duration / time_per_pixel()).floor();
    let raw = if raw >= u32::MAX as f64 { u32::MAX } else { raw as u32 };
    let width = raw / WIDTH_ALIGNMENT * WIDTH_ALIGNMENT;

    if width == 0 {
        return Err(PipelineError::invalid(format!(
            "clip of {:.4}s is shorter than the minimum {:.4}s needed for audio generation",
            duration,
            min_duration()
        )));
    }
    Ok(width)
}
