//! Thin orchestration over `PlaylistStore` and a resolver: playlist CRUD,
//! plus turning a saved playlist's entries back into playable `Song`s
//! when a tracklist adopts it.

use crate::error::{PlaylistError, Result};
use crate::model::{Playlist, PlaylistEntry};
use crate::store::PlaylistStore;
use aural_resolver::Resolve;
use aural_song::{Song, SourceKind};
use chrono::Utc;
use std::sync::Arc;

/// Playlist mutations and lookups for one tenant, backed by `PlaylistStore`.
pub struct PlaylistService<R: Resolve> {
    store: PlaylistStore,
    resolver: Arc<R>,
}

impl<R: Resolve> PlaylistService<R> {
    pub fn new(store: PlaylistStore, resolver: Arc<R>) -> Self {
        Self { store, resolver }
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<String>> {
        self.store.list(tenant_id).await
    }

    pub async fn exists(&self, tenant_id: &str, name: &str) -> Result<bool> {
        self.store.exists(tenant_id, name).await
    }

    pub async fn create(&self, tenant_id: &str, name: &str) -> Result<Playlist> {
        if self.store.exists(tenant_id, name).await? {
            return Err(PlaylistError::AlreadyExists(name.to_string()));
        }
        let playlist = Playlist::new(name);
        self.store.save(tenant_id, &playlist).await?;
        Ok(playlist)
    }

    pub async fn delete(&self, tenant_id: &str, name: &str) -> Result<()> {
        self.store.delete(tenant_id, name).await
    }

    pub async fn rename(&self, tenant_id: &str, old_name: &str, new_name: &str) -> Result<()> {
        self.store.rename(tenant_id, old_name, new_name).await
    }

    pub async fn show(&self, tenant_id: &str, name: &str) -> Result<Playlist> {
        self.store
            .load(tenant_id, name)
            .await?
            .ok_or_else(|| PlaylistError::NotFound(name.to_string()))
    }

    /// Resolves `original_input` far enough to record a title, appends it,
    /// and persists the playlist in one atomic save. A no-op if the
    /// playlist already holds this `original_input`.
    pub async fn add(
        &self,
        tenant_id: &str,
        name: &str,
        original_input: &str,
        source_kind: SourceKind,
    ) -> Result<Playlist> {
        let mut playlist = self
            .store
            .load(tenant_id, name)
            .await?
            .ok_or_else(|| PlaylistError::NotFound(name.to_string()))?;

        if playlist.entries.iter().any(|existing| existing.original_input == original_input) {
            return Ok(playlist);
        }

        let title = match self.resolver.resolve(original_input).await {
            Ok(resolution) => resolution.title,
            Err(_) => original_input.to_string(),
        };

        playlist.push(PlaylistEntry {
            original_input: original_input.to_string(),
            source_type: source_kind,
            title,
            added_at: Utc::now(),
        });
        self.store.save(tenant_id, &playlist).await?;
        Ok(playlist)
    }

    /// Removes entries at the given 1-based indexes (already parsed,
    /// deduplicated, and sorted descending) and persists the result.
    pub async fn remove(&self, tenant_id: &str, name: &str, indexes_descending: &[usize]) -> Result<Playlist> {
        let mut playlist = self
            .store
            .load(tenant_id, name)
            .await?
            .ok_or_else(|| PlaylistError::NotFound(name.to_string()))?;
        playlist.remove_indexes(indexes_descending);
        self.store.save(tenant_id, &playlist).await?;
        Ok(playlist)
    }

    /// Materializes a saved playlist's entries as fresh `Song`s, in
    /// playlist order, ready to hand to a `Tracklist`/`Processor`.
    pub async fn songs_for(&self, tenant_id: &str, name: &str, requester: &str) -> Result<Vec<Song>> {
        let playlist = self.show(tenant_id, name).await?;
        Ok(playlist
            .entries
            .into_iter()
            .map(|entry| Song::new(entry.original_input, entry.source_type, requester, tenant_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aural_resolver::{PlaylistEntryRef, Resolution, ResolverError};
    use async_trait::async_trait;

    struct StubResolver;

    #[async_trait]
    impl Resolve for StubResolver {
        async fn resolve(&self, original_input: &str) -> aural_resolver::Result<Resolution> {
            Ok(Resolution {
                title: format!("resolved {original_input}"),
                uploader: None,
                duration_seconds: None,
                thumbnail_url: None,
                stream_url: original_input.to_string(),
            })
        }

        async fn expand_playlist(&self, _url: &str) -> aural_resolver::Result<Vec<PlaylistEntryRef>> {
            Ok(vec![])
        }
    }

    struct FailingResolver;

    #[async_trait]
    impl Resolve for FailingResolver {
        async fn resolve(&self, _original_input: &str) -> aural_resolver::Result<Resolution> {
            Err(ResolverError::NotFound)
        }

        async fn expand_playlist(&self, _url: &str) -> aural_resolver::Result<Vec<PlaylistEntryRef>> {
            Ok(vec![])
        }
    }

    fn service(dir: &std::path::Path) -> PlaylistService<StubResolver> {
        PlaylistService::new(PlaylistStore::new(dir), Arc::new(StubResolver))
    }

    #[tokio::test]
    async fn create_then_show_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.create("guild-1", "mix").await.unwrap();
        let playlist = svc.show("guild-1", "mix").await.unwrap();
        assert_eq!(playlist.name, "mix");
        assert!(playlist.entries.is_empty());
    }

    #[tokio::test]
    async fn create_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.create("guild-1", "mix").await.unwrap();
        assert!(matches!(svc.create("guild-1", "mix").await, Err(PlaylistError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn add_resolves_a_title() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.create("guild-1", "mix").await.unwrap();
        let playlist = svc.add("guild-1", "mix", "https://example/watch?v=x", SourceKind::YouTube).await.unwrap();
        assert_eq!(playlist.entries[0].title, "resolved https://example/watch?v=x");
    }

    #[tokio::test]
    async fn add_falls_back_to_the_raw_input_when_resolution_fails() {
        let dir = tempfile::tempdir().unwrap();
        let svc = PlaylistService::new(PlaylistStore::new(dir.path()), Arc::new(FailingResolver));
        svc.create("guild-1", "mix").await.unwrap();
        let playlist = svc.add("guild-1", "mix", "https://example/watch?v=y", SourceKind::YouTube).await.unwrap();
        assert_eq!(playlist.entries[0].title, "https://example/watch?v=y");
    }

    #[tokio::test]
    async fn add_duplicate_original_input_is_a_silent_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.create("guild-1", "mix").await.unwrap();
        svc.add("guild-1", "mix", "https://example/watch?v=x", SourceKind::YouTube).await.unwrap();
        let playlist = svc.add("guild-1", "mix", "https://example/watch?v=x", SourceKind::YouTube).await.unwrap();
        assert_eq!(playlist.entries.len(), 1);
    }

    #[tokio::test]
    async fn remove_then_persists() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.create("guild-1", "mix").await.unwrap();
        svc.add("guild-1", "mix", "a", SourceKind::GenericUrl).await.unwrap();
        svc.add("guild-1", "mix", "b", SourceKind::GenericUrl).await.unwrap();
        svc.remove("guild-1", "mix", &[1]).await.unwrap();
        let playlist = svc.show("guild-1", "mix").await.unwrap();
        assert_eq!(playlist.entries.len(), 1);
        assert_eq!(playlist.entries[0].original_input, "b");
    }

    #[tokio::test]
    async fn songs_for_preserves_order_and_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        svc.create("guild-1", "mix").await.unwrap();
        svc.add("guild-1", "mix", "a", SourceKind::GenericUrl).await.unwrap();
        svc.add("guild-1", "mix", "b", SourceKind::GenericUrl).await.unwrap();

        let songs = svc.songs_for("guild-1", "mix", "alice").await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].original_input(), "a");
        assert_eq!(songs[1].original_input(), "b");
        assert_eq!(songs[0].tenant_id(), "guild-1");
    }

    #[tokio::test]
    async fn show_missing_playlist_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        assert!(matches!(svc.show("guild-1", "missing").await, Err(PlaylistError::NotFound(_))));
    }
}
