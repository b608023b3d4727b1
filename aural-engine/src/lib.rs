//! Per-tenant playback controller: wires a tracklist, the shared
//! resolution pool, an audio pipeline, and a voice connection into the
//! fetch -> resolve -> play -> advance loop, with an engine-per-tenant
//! registry sitting above it.

mod engine;
mod error;
mod registry;
mod voice;

pub use engine::{EngineConfig, GuildEngine, DEFAULT_READINESS_TIMEOUT, DEFAULT_STREAM_REFRESH_AFTER};
pub use error::{EngineError, Result};
pub use registry::{EngineRegistry, VoiceConnectionFactory};
pub use voice::VoiceConnection;
