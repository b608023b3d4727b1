//! The command surface the router accepts, translated from a transport
//! interaction (opaque command name + typed arguments) before this
//! crate ever sees it. `aural-bot` owns that translation; this module
//! only defines the shape it must produce.

use aural_song::SourceKind;
use aural_tracklist::RepeatMode;

#[derive(Debug, Clone)]
pub enum Command {
    Play { query: String, source_kind: SourceKind },
    APlay { playlist_url: String },
    Pause,
    Resume,
    Skip { index: Option<usize> },
    Stop,
    Volume { level: u8 },
    Queue { page: usize },
    NowPlaying,
    Shuffle,
    Clear,
    Repeat { mode: RepeatMode },
    Playlists,
    Use { name: String, start_index: Option<usize> },
    Add { song: String, source_kind: SourceKind },
    Remove { name: String, indexes: String },
    Playlist(PlaylistCommand),
    Join,
    Leave,
    Stats,
    Help,
    /// A pagination follow-up: the raw `customID` from a prior page's
    /// navigation control.
    Paginate { custom_id: String },
}

#[derive(Debug, Clone)]
pub enum PlaylistCommand {
    Create { name: String },
    Delete { name: String },
    Show { name: String, page: usize },
    Add { name: String, song: String, source_kind: SourceKind },
    Rename { name: String, new_name: String },
}

impl Command {
    /// Whether this command requires the invoker to currently be in a
    /// voice channel.
    pub fn requires_voice(&self) -> bool {
        matches!(
            self,
            Command::Play { .. }
                | Command::APlay { .. }
                | Command::Pause
                | Command::Resume
                | Command::Skip { .. }
                | Command::Stop
                | Command::Volume { .. }
                | Command::Shuffle
                | Command::Clear
                | Command::Repeat { .. }
                | Command::Use { .. }
                | Command::Add { .. }
                | Command::Join
        )
    }

    /// Whether the transport should send an immediate ack and treat the
    /// result as a follow-up: anything that resolves, touches disk, or
    /// talks to the voice gateway can exceed the transport's short ack
    /// deadline.
    pub fn requires_deferred_response(&self) -> bool {
        matches!(
            self,
            Command::Play { .. }
                | Command::APlay { .. }
                | Command::Use { .. }
                | Command::Add { .. }
                | Command::Remove { .. }
                | Command::Join
                | Command::Playlist(_)
                | Command::Queue { .. }
        )
    }
}

/// Who is invoking a command, and from where.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant_id: String,
    pub invoker: String,
    pub invoker_voice_channel: Option<String>,
}
