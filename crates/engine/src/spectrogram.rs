use serde::{Deserialize, Serialize};

use crate::resolution::MODEL_SAMPLE_RATE;

/// How a spectrogram image is turned back into audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramParams {
    pub min_frequency: u32,
    pub max_frequency: u32,
    pub sample_rate: u32,
    pub stereo: bool,
}

impl SpectrogramParams {
    /// 0-10 kHz, mono.
    pub fn standard() -> Self {
        SpectrogramParams {
            min_frequency: 0,
            max_frequency: 10_000,
            sample_rate: MODEL_SAMPLE_RATE,
            stereo: false,
        }
    }

    /// 10 Hz-20 kHz, stereo.
    pub fn extended() -> Self {
        SpectrogramParams {
            min_frequency: 10,
            max_frequency: 20_000,
            sample_rate: MODEL_SAMPLE_RATE,
            stereo: true,
        }
    }

    pub fn for_range(extended: bool) -> Self {
        if extended {
            Self::extended()
        } else {
            Self::standard()
        }
    }
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self::standard()
    }
}
