//! Default `VoiceConnectionFactory`: the real chat-gateway client (voice
//! WS handshake, encryption mode negotiation, UDP frame transport) is an
//! external collaborator this crate does not implement, and the voice
//! connection is designed to be substitutable. This module provides the
//! placeholder `aural-bot` wires in so the binary links and runs
//! end-to-end; swap `PlaceholderVoiceConnection` for a real gateway
//! client without touching `aural-engine` or `aural-router`.

use async_trait::async_trait;
use aural_audio::VoiceSink;
use aural_engine::VoiceConnection;
use aural_engine::VoiceConnectionFactory;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

struct PlaceholderSink {
    tenant_id: String,
}

#[async_trait]
impl VoiceSink for PlaceholderSink {
    fn requires_dca(&self) -> bool {
        false
    }

    async fn send(&self, frame: Vec<u8>) -> Result<(), String> {
        debug!(tenant_id = %self.tenant_id, bytes = frame.len(), "dropping frame: no gateway client wired in");
        Ok(())
    }

    async fn disconnect(&self) {}
}

pub struct PlaceholderVoiceConnection {
    tenant_id: String,
    connected: AtomicBool,
    sink: Arc<dyn VoiceSink>,
}

#[async_trait]
impl VoiceConnection for PlaceholderVoiceConnection {
    async fn connect(&self, channel_id: &str) -> Result<(), String> {
        warn!(
            tenant_id = %self.tenant_id,
            channel_id,
            "no chat-gateway client configured; voice connection is a no-op placeholder"
        );
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn sink(&self) -> Arc<dyn VoiceSink> {
        self.sink.clone()
    }
}

pub struct PlaceholderVoiceConnectionFactory;

#[async_trait]
impl VoiceConnectionFactory for PlaceholderVoiceConnectionFactory {
    async fn build(&self, tenant_id: &str) -> Arc<dyn VoiceConnection> {
        Arc::new(PlaceholderVoiceConnection {
            tenant_id: tenant_id.to_string(),
            connected: AtomicBool::new(false),
            sink: Arc::new(PlaceholderSink { tenant_id: tenant_id.to_string() }),
        })
    }
}
