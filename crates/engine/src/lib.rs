pub mod error;
pub mod interval;
pub mod naming;
pub mod render;
pub mod request;
pub mod resolution;
pub mod spectrogram;

pub use error::{PipelineError, Result};
pub use interval::{partition, ClipInterval};
pub use request::*;
pub use resolution::width_for_duration;
pub use spectrogram::SpectrogramParams;
