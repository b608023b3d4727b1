//! The command-surface boundary: translates typed commands into engine
//! and playlist-service calls, enforces voice-membership and argument
//! rules, and builds paginated response payloads.

mod command;
mod error;
mod indexes;
mod pagination;
mod response;
mod router;

pub use command::{Command, PlaylistCommand, RequestContext};
pub use error::{ErrorKind, Result, RouterError};
pub use indexes::parse_indexes;
pub use pagination::{CustomId, NavAction, NavControl, PageView};
pub use response::{
    CommandHelp, NowPlayingView, PlaylistEntryView, QueueEntryView, Response, StatsView,
    COMMAND_HELP,
};
pub use router::CommandRouter;
