#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no song at index {0}")]
    InvalidIndex(usize),

    #[error("volume must be between 0 and 100, got {0}")]
    InvalidVolume(u8),

    #[error("failed to connect to voice channel: {0}")]
    VoiceConnectFailed(String),

    #[error(transparent)]
    Pipeline(#[from] aural_audio::PipelineError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
