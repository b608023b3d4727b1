use crate::state::SongStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SongError {
    #[error("cannot transition song from {from:?} to {to:?}")]
    InvalidTransition { from: SongStatus, to: SongStatus },
}

pub type SongResult<T> = std::result::Result<T, SongError>;
