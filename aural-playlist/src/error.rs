#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("playlist not found: {0}")]
    NotFound(String),

    #[error("playlist already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid playlist name: {0}")]
    InvalidName(#[from] aural_util::FilenameError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("corrupt playlist file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlaylistError>;
