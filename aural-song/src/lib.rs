//! `Song`, the unit of playable content shared across the tracklist, the
//! processor pool, and the audio pipeline.
//!
//! A `Song` carries its own lock (grounded on `pmoplaylist`'s
//! `Arc<RwLock<Inner>>` track model) so it can be held by several
//! containers at once without any of them owning it exclusively — the
//! tracklist holds it in order, the processor holds a reference while a
//! task resolves it, the pipeline holds it while it is playing.

mod error;
mod state;

pub use error::{SongError, SongResult};
pub use state::SongStatus;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Where a user's input came from, driving how the resolver canonicalizes
/// and expands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "youtube_playlist")]
    YouTubePlaylist,
    #[serde(rename = "spotify")]
    Spotify,
    #[serde(rename = "soundcloud")]
    SoundCloud,
    #[serde(rename = "search")]
    Search,
    #[serde(rename = "generic_url")]
    GenericUrl,
}

/// Metadata obtained once a song resolves successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMetadata {
    pub title: String,
    pub uploader: Option<String>,
    pub duration_seconds: Option<u32>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug)]
struct Inner {
    status: SongStatus,
    metadata: Option<SongMetadata>,
    stream_url: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

/// A unit of playable content. Cheaply cloneable (`Arc` inside); clones
/// observe the same underlying state.
#[derive(Debug, Clone)]
pub struct Song {
    id: Uuid,
    original_input: String,
    source_kind: SourceKind,
    requester: String,
    tenant_id: String,
    created_at: DateTime<Utc>,
    inner: Arc<RwLock<Inner>>,
}

impl Song {
    pub fn new(
        original_input: impl Into<String>,
        source_kind: SourceKind,
        requester: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_input: original_input.into(),
            source_kind,
            requester: requester.into(),
            tenant_id: tenant_id.into(),
            created_at: Utc::now(),
            inner: Arc::new(RwLock::new(Inner {
                status: SongStatus::Pending,
                metadata: None,
                stream_url: None,
                resolved_at: None,
                error_message: None,
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn original_input(&self) -> &str {
        &self.original_input
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn requester(&self) -> &str {
        &self.requester
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn status(&self) -> SongStatus {
        self.inner.read().await.status
    }

    pub async fn metadata(&self) -> Option<SongMetadata> {
        self.inner.read().await.metadata.clone()
    }

    pub async fn stream_url(&self) -> Option<String> {
        self.inner.read().await.stream_url.clone()
    }

    pub async fn error_message(&self) -> Option<String> {
        self.inner.read().await.error_message.clone()
    }

    /// `Ready ⇔ status == Ready ∧ metadata ≠ ∅ ∧ streamURL ≠ ∅`.
    pub async fn is_ready(&self) -> bool {
        let inner = self.inner.read().await;
        inner.status == SongStatus::Ready
            && inner.metadata.is_some()
            && inner.stream_url.is_some()
    }

    /// `Pending -> Processing`.
    pub async fn mark_processing(&self) -> SongResult<()> {
        let mut inner = self.inner.write().await;
        match inner.status {
            SongStatus::Pending => {
                inner.status = SongStatus::Processing;
                Ok(())
            }
            other => Err(SongError::InvalidTransition {
                from: other,
                to: SongStatus::Processing,
            }),
        }
    }

    /// `Processing -> Ready`, recording metadata, stream URL, and the
    /// resolution timestamp.
    pub async fn mark_ready(&self, metadata: SongMetadata, stream_url: String) -> SongResult<()> {
        let mut inner = self.inner.write().await;
        match inner.status {
            SongStatus::Pending | SongStatus::Processing => {
                inner.status = SongStatus::Ready;
                inner.metadata = Some(metadata);
                inner.stream_url = Some(stream_url);
                inner.resolved_at = Some(Utc::now());
                inner.error_message = None;
                Ok(())
            }
            other => Err(SongError::InvalidTransition {
                from: other,
                to: SongStatus::Ready,
            }),
        }
    }

    /// `{Pending, Processing} -> Failed`. Pending may fail directly if
    /// validation rejects the input before processing begins.
    pub async fn mark_failed(&self, message: impl Into<String>) -> SongResult<()> {
        let mut inner = self.inner.write().await;
        match inner.status {
            SongStatus::Pending | SongStatus::Processing => {
                inner.status = SongStatus::Failed;
                inner.error_message = Some(message.into());
                Ok(())
            }
            other => Err(SongError::InvalidTransition {
                from: other,
                to: SongStatus::Failed,
            }),
        }
    }

    /// `Ready -> Ready` self-loop: updates the stream URL and its
    /// resolution timestamp only, leaving metadata untouched.
    pub async fn refresh_stream_url(&self, new_url: String) -> SongResult<()> {
        let mut inner = self.inner.write().await;
        if inner.status != SongStatus::Ready {
            return Err(SongError::InvalidTransition {
                from: inner.status,
                to: SongStatus::Ready,
            });
        }
        inner.stream_url = Some(new_url);
        inner.resolved_at = Some(Utc::now());
        Ok(())
    }

    /// `now - resolvedAt > threshold`. A song that has never resolved is
    /// never considered expired.
    pub async fn is_stream_expired(&self, threshold: chrono::Duration) -> bool {
        match self.inner.read().await.resolved_at {
            Some(resolved_at) => Utc::now() - resolved_at > threshold,
            None => false,
        }
    }

    pub async fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.resolved_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Song {
        Song::new("https://example/watch?v=abc", SourceKind::YouTube, "alice", "guild-1")
    }

    fn meta() -> SongMetadata {
        SongMetadata {
            title: "Test Track".into(),
            uploader: Some("uploader".into()),
            duration_seconds: Some(180),
            thumbnail_url: None,
        }
    }

    #[tokio::test]
    async fn starts_pending() {
        let s = song();
        assert_eq!(s.status().await, SongStatus::Pending);
        assert!(!s.is_ready().await);
    }

    #[tokio::test]
    async fn happy_path_to_ready() {
        let s = song();
        s.mark_processing().await.unwrap();
        assert_eq!(s.status().await, SongStatus::Processing);
        s.mark_ready(meta(), "https://stream/1".into()).await.unwrap();
        assert!(s.is_ready().await);
    }

    #[tokio::test]
    async fn pending_can_fail_without_processing() {
        let s = song();
        s.mark_failed("invalid input").await.unwrap();
        assert_eq!(s.status().await, SongStatus::Failed);
    }

    #[tokio::test]
    async fn failed_is_terminal() {
        let s = song();
        s.mark_failed("boom").await.unwrap();
        assert!(s.mark_processing().await.is_err());
        assert!(s.mark_ready(meta(), "u".into()).await.is_err());
    }

    #[tokio::test]
    async fn refresh_requires_ready() {
        let s = song();
        assert!(s.refresh_stream_url("u".into()).await.is_err());
        s.mark_processing().await.unwrap();
        s.mark_ready(meta(), "https://stream/1".into()).await.unwrap();
        let first = s.resolved_at().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        s.refresh_stream_url("https://stream/2".into()).await.unwrap();
        let second = s.resolved_at().await.unwrap();
        assert!(second > first);
        assert_eq!(s.stream_url().await.unwrap(), "https://stream/2");
    }

    #[tokio::test]
    async fn stream_expiry_threshold() {
        let s = song();
        s.mark_processing().await.unwrap();
        s.mark_ready(meta(), "u".into()).await.unwrap();
        assert!(!s.is_stream_expired(chrono::Duration::hours(5)).await);
        assert!(s.is_stream_expired(chrono::Duration::seconds(-1)).await);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let s = song();
        let clone = s.clone();
        s.mark_processing().await.unwrap();
        assert_eq!(clone.status().await, SongStatus::Processing);
    }
}
