//! Transport-agnostic error kinds the router maps every internal error
//! into before it reaches a response builder. Mirrors the kind table
//! engines, resolvers, and playlist storage raise their own
//! `thiserror::Error` enums for, the way `pmosource::MusicSourceError`
//! carries its own enum while `pmoserver`'s HTTP layer maps errors to
//! status codes at the boundary.

use aural_engine::EngineError;
use aural_playlist::PlaylistError;
use aural_resolver::ResolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    NotFound,
    Transient,
    Resolver,
    Pipeline,
    Storage,
    Fatal,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RouterError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RouterError {
    pub fn user(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::User, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::NotFound, message: message.into() }
    }

    /// Whether this should ever be logged above INFO. Only the kinds
    /// that represent a genuine system fault warrant WARN/ERROR.
    pub fn is_user_facing_only(&self) -> bool {
        matches!(self.kind, ErrorKind::User | ErrorKind::NotFound)
    }
}

impl From<EngineError> for RouterError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::InvalidIndex(i) => {
                Self::user(format!("there is no song at position {i}"))
            }
            EngineError::InvalidVolume(v) => {
                Self::user(format!("volume must be between 0 and 100, got {v}"))
            }
            EngineError::VoiceConnectFailed(reason) => {
                Self { kind: ErrorKind::Pipeline, message: format!("could not join voice channel: {reason}") }
            }
            EngineError::Pipeline(source) => {
                Self { kind: ErrorKind::Pipeline, message: source.to_string() }
            }
        }
    }
}

impl From<PlaylistError> for RouterError {
    fn from(error: PlaylistError) -> Self {
        match error {
            PlaylistError::NotFound(name) => Self::not_found(format!("no playlist named '{name}'")),
            PlaylistError::AlreadyExists(name) => {
                Self::user(format!("a playlist named '{name}' already exists"))
            }
            PlaylistError::InvalidName(source) => Self::user(source.to_string()),
            PlaylistError::Storage(source) => {
                Self { kind: ErrorKind::Storage, message: source.to_string() }
            }
            PlaylistError::Corrupt(source) => {
                Self { kind: ErrorKind::Storage, message: format!("playlist file is corrupt: {source}") }
            }
        }
    }
}

impl From<ResolverError> for RouterError {
    fn from(error: ResolverError) -> Self {
        let kind = if error.is_retriable() { ErrorKind::Transient } else { ErrorKind::Resolver };
        Self { kind, message: error.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
