use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to spawn transcoder: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("opus encoder failed: {0}")]
    EncoderFailed(#[source] opus::Error),

    #[error("transcoder exited with code {code:?}: {last_stderr_line}")]
    TranscoderExited { code: Option<i32>, last_stderr_line: String },

    #[error("voice connection rejected a frame: {0}")]
    VoiceWriteFailed(String),

    #[error("stream URL was refused by the upstream host (expired)")]
    StreamExpired,

    #[error("pipeline is not in a state that allows this operation")]
    InvalidState,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
