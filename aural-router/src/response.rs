//! Response payloads the router hands back to the transport. These are
//! plain data, not wire-encoded: `aural-bot` turns them into whatever
//! embed/message shape the chat platform expects.

use crate::pagination::PageView;
use aural_tracklist::RepeatMode;

#[derive(Debug, Clone)]
pub struct NowPlayingView {
    pub title: String,
    pub requester: String,
    pub position: usize,
    pub size: usize,
    pub repeat_mode: RepeatMode,
}

#[derive(Debug, Clone)]
pub struct QueueEntryView {
    pub position: usize,
    pub title: String,
    pub requester: String,
}

#[derive(Debug, Clone)]
pub struct PlaylistEntryView {
    pub position: usize,
    pub title: String,
    pub original_input: String,
}

#[derive(Debug, Clone)]
pub struct StatsView {
    pub active_guilds: usize,
    pub connected_guilds: usize,
}

#[derive(Debug, Clone)]
pub struct CommandHelp {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub enum Response {
    Ack(String),
    NowPlaying(NowPlayingView),
    Queue(PageView<QueueEntryView>),
    PlaylistNames(Vec<String>),
    PlaylistShow(PageView<PlaylistEntryView>),
    Stats(StatsView),
    Help(Vec<CommandHelp>),
}

pub const COMMAND_HELP: &[CommandHelp] = &[
    CommandHelp { name: "play", usage: "play <query>", description: "resolve and enqueue a song, starting playback if idle" },
    CommandHelp { name: "aplay", usage: "aplay <playlist-url>", description: "expand an external playlist and enqueue every entry" },
    CommandHelp { name: "pause", usage: "pause", description: "pause the current song" },
    CommandHelp { name: "resume", usage: "resume", description: "resume a paused song" },
    CommandHelp { name: "skip", usage: "skip [index]", description: "jump to a position, or advance one" },
    CommandHelp { name: "stop", usage: "stop", description: "stop playback and clear the queue, keeping voice connected" },
    CommandHelp { name: "volume", usage: "volume <0-100>", description: "set playback volume" },
    CommandHelp { name: "queue", usage: "queue", description: "show the upcoming songs" },
    CommandHelp { name: "nowplaying", usage: "nowplaying", description: "show the current song" },
    CommandHelp { name: "shuffle", usage: "shuffle", description: "shuffle the upcoming songs" },
    CommandHelp { name: "clear", usage: "clear", description: "stop, clear the queue, and disconnect" },
    CommandHelp { name: "repeat", usage: "repeat <none|track|queue>", description: "set the repeat mode" },
    CommandHelp { name: "playlists", usage: "playlists", description: "list saved playlists" },
    CommandHelp { name: "use", usage: "use <name> [start_index]", description: "load a playlist into the queue and play" },
    CommandHelp { name: "add", usage: "add <song>", description: "resolve and enqueue a song, also saving to the active playlist if set" },
    CommandHelp { name: "remove", usage: "remove <name> <indexes>", description: "remove entries from a saved playlist" },
    CommandHelp { name: "playlist", usage: "playlist <create|delete|show|add|rename>", description: "manage saved playlists" },
    CommandHelp { name: "join", usage: "join", description: "connect to your voice channel" },
    CommandHelp { name: "leave", usage: "leave", description: "disconnect from voice" },
    CommandHelp { name: "stats", usage: "stats", description: "show service statistics" },
    CommandHelp { name: "help", usage: "help", description: "show this message" },
];
