use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
///
/// `Display` is the reason surfaced verbatim to the caller; [`PipelineError::kind`]
/// is the stable tag used in API payloads and logs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad clip count, index, duration or generation parameter. Raised before
    /// any side effect.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The synthesizer failed or returned no audio.
    #[error("audio generation failed: {0}")]
    Generation(String),

    /// Decoding or encoding through the codec layer failed.
    #[error("codec failed: {0}")]
    Codec(String),

    /// The clip set was incomplete at archive time, or the archive could not be written.
    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PipelineError::InvalidArgument(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidArgument(_) => "invalid_argument",
            PipelineError::Io { .. } => "io_failure",
            PipelineError::Generation(_) => "generation_failure",
            PipelineError::Codec(_) => "codec_failure",
            PipelineError::Packaging(_) => "packaging_failure",
            PipelineError::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
