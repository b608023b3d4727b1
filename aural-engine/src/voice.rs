//! The engine's view of a voice connection: join/leave a channel and
//! hand back a sink the audio pipeline can push frames into. The
//! concrete gateway client lives outside this crate.

use async_trait::async_trait;
use aural_audio::VoiceSink;
use std::sync::Arc;

#[async_trait]
pub trait VoiceConnection: Send + Sync {
    async fn connect(&self, channel_id: &str) -> std::result::Result<(), String>;

    async fn disconnect(&self);

    /// The frame sink for the current connection. Only meaningful after
    /// a successful `connect`.
    fn sink(&self) -> Arc<dyn VoiceSink>;
}
