//! Per-tenant named playlist persistence: crash-safe JSON files on disk,
//! plus a thin service layer turning saved entries back into playable
//! songs.

mod error;
mod model;
mod service;
mod store;

pub use error::{PlaylistError, Result};
pub use model::{Playlist, PlaylistEntry};
pub use service::PlaylistService;
pub use store::PlaylistStore;
