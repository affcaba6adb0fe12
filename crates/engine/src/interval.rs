use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Half-open `[start, end)` time range of one clip, in seconds.
///
/// `index` is 0-based; user-facing numbering (file names, selection) is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipInterval {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl ClipInterval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Split `[0, total_duration]` into `count` contiguous equal-duration intervals.
///
/// Boundaries are computed once and shared between neighbours, so
/// `intervals[i].end == intervals[i + 1].start` holds bit-for-bit. The last
/// boundary is `total_duration` itself rather than `count * step`.
pub fn partition(total_duration: f64, count: usize) -> Result<Vec<ClipInterval>> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(PipelineError::invalid(format!(
            "total duration must be a positive number of seconds, got {}",
            total_duration
        )));
    }
    if count == 0 {
        return Err(PipelineError::invalid("clip count must be at least 1"));
    }

    let step = total_duration / count as f64;
    let boundaries: Vec<f64> = (0..=count)
        .map(|k| {
            if k == count {
                total_duration
            } else {
                k as f64 * step
            }
        })
        .collect();

    Ok(boundaries
        .windows(2)
        .enumerate()
        .map(|(index, pair)| ClipInterval {
            index,
            start: pair[0],
            end: pair[1],
        })
        .collect())
}
