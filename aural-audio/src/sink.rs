//! The pipeline's view of a voice connection: just enough surface to
//! push frames and tear down. The concrete gateway client lives outside
//! this crate and implements this trait.

use async_trait::async_trait;

/// A destination for encoded audio frames. Implementations decide
/// whether they want DCA-framed or raw Opus payloads.
#[async_trait]
pub trait VoiceSink: Send + Sync {
    /// Whether frames handed to `send` must be DCA-framed (2-byte
    /// length prefix) rather than raw Opus payloads.
    fn requires_dca(&self) -> bool;

    /// Delivers one encoded frame. Errors are treated as fatal to the
    /// current playback.
    async fn send(&self, frame: Vec<u8>) -> Result<(), String>;

    async fn disconnect(&self);
}
