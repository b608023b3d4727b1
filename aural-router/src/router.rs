//! `CommandRouter`: translates the command surface into engine and
//! playlist-service operations and builds response payloads, enforcing
//! voice-membership and argument-range rules at the boundary. Grounded
//! on `pmosource::api`'s handler shape (match on a lookup, map
//! failure to a typed response) generalized from HTTP handlers to an
//! in-process command dispatch with no wire format of its own.

use crate::command::{Command, PlaylistCommand, RequestContext};
use crate::error::{Result, RouterError};
use crate::indexes::parse_indexes;
use crate::pagination::{clamp_page, paginate, resolve_action, CustomId, NavAction};
use crate::response::{
    NowPlayingView, PlaylistEntryView, QueueEntryView, Response, StatsView, COMMAND_HELP,
};
use aural_engine::EngineRegistry;
use aural_playlist::PlaylistService;
use aural_resolver::Resolve;
use aural_song::{SongMetadata, Song};
use aural_tracklist::Tracklist;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct CommandRouter<R: Resolve + 'static> {
    registry: Arc<EngineRegistry<R>>,
    playlists: Arc<PlaylistService<R>>,
    resolver: Arc<R>,
    /// Playlist currently bound to each tenant via `use`, so `add`
    /// knows whether to also persist the new entry.
    active_playlist: RwLock<HashMap<String, String>>,
}

impl<R: Resolve + 'static> CommandRouter<R> {
    pub fn new(
        registry: Arc<EngineRegistry<R>>,
        playlists: Arc<PlaylistService<R>>,
        resolver: Arc<R>,
    ) -> Self {
        Self { registry, playlists, resolver, active_playlist: RwLock::new(HashMap::new()) }
    }

    pub async fn handle(&self, ctx: &RequestContext, command: Command) -> Result<Response> {
        if command.requires_voice() && ctx.invoker_voice_channel.is_none() {
            return Err(RouterError::user("you must be in a voice channel to use this command"));
        }

        match command {
            Command::Play { query, source_kind } => self.play(ctx, query, source_kind).await,
            Command::APlay { playlist_url } => self.aplay(ctx, playlist_url).await,
            Command::Pause => {
                self.engine(ctx).await?.pause()?;
                Ok(Response::Ack("paused".to_string()))
            }
            Command::Resume => {
                self.engine(ctx).await?.resume()?;
                Ok(Response::Ack("resumed".to_string()))
            }
            Command::Skip { index } => self.skip(ctx, index).await,
            Command::Stop => {
                let engine = self.engine(ctx).await?;
                engine.stop().await;
                engine.tracklist().clear().await;
                Ok(Response::Ack("stopped and cleared the queue".to_string()))
            }
            Command::Volume { level } => {
                self.engine(ctx).await?.set_volume(level)?;
                Ok(Response::Ack(format!("volume set to {level}")))
            }
            Command::Queue { page } => self.queue(ctx, page).await,
            Command::NowPlaying => self.now_playing(ctx).await,
            Command::Shuffle => {
                self.engine(ctx).await?.tracklist().shuffle().await;
                Ok(Response::Ack("shuffled the queue".to_string()))
            }
            Command::Clear => {
                let engine = self.engine(ctx).await?;
                engine.stop().await;
                engine.tracklist().clear().await;
                engine.disconnect().await;
                Ok(Response::Ack("cleared the queue and disconnected".to_string()))
            }
            Command::Repeat { mode } => {
                self.engine(ctx).await?.tracklist().set_repeat_mode(mode).await;
                Ok(Response::Ack("repeat mode updated".to_string()))
            }
            Command::Playlists => {
                let names = self.playlists.list(&ctx.tenant_id).await?;
                Ok(Response::PlaylistNames(names))
            }
            Command::Use { name, start_index } => self.use_playlist(ctx, name, start_index).await,
            Command::Add { song, source_kind } => self.add(ctx, song, source_kind).await,
            Command::Remove { name, indexes } => self.remove(ctx, name, indexes).await,
            Command::Playlist(sub) => self.playlist(ctx, sub).await,
            Command::Join => {
                let channel = ctx
                    .invoker_voice_channel
                    .as_deref()
                    .expect("requires_voice checked above");
                let engine = self.registry.get_or_create(&ctx.tenant_id).await;
                engine.play(channel).await?;
                Ok(Response::Ack("joined".to_string()))
            }
            Command::Leave => {
                self.engine(ctx).await?.disconnect().await;
                Ok(Response::Ack("left the voice channel".to_string()))
            }
            Command::Stats => self.stats().await,
            Command::Help => Ok(Response::Help(COMMAND_HELP.to_vec())),
            Command::Paginate { custom_id } => self.paginate(custom_id).await,
        }
    }

    async fn engine(&self, ctx: &RequestContext) -> Result<Arc<aural_engine::GuildEngine<R>>> {
        match self.registry.get(&ctx.tenant_id).await {
            Some(engine) => Ok(engine),
            None => Err(RouterError::user("nothing is playing here")),
        }
    }

    async fn play(&self, ctx: &RequestContext, query: String, source_kind: aural_song::SourceKind) -> Result<Response> {
        let channel = ctx.invoker_voice_channel.as_deref().expect("requires_voice checked above");
        let engine = self.registry.get_or_create(&ctx.tenant_id).await;
        let song = Song::new(query, source_kind, ctx.invoker.clone(), ctx.tenant_id.clone());
        let position = engine.enqueue(song).await;
        engine.play(channel).await?;
        Ok(Response::Ack(format!("queued at position {position}")))
    }

    async fn aplay(&self, ctx: &RequestContext, playlist_url: String) -> Result<Response> {
        let channel = ctx.invoker_voice_channel.as_deref().expect("requires_voice checked above");
        let entries = self.resolver.expand_playlist(&playlist_url).await?;
        if entries.is_empty() {
            return Err(RouterError::user("that playlist has no entries"));
        }
        let engine = self.registry.get_or_create(&ctx.tenant_id).await;
        let count = entries.len();
        for entry in entries {
            let song = Song::new(entry.id, aural_song::SourceKind::YouTube, ctx.invoker.clone(), ctx.tenant_id.clone());
            engine.enqueue(song).await;
        }
        engine.play(channel).await?;
        Ok(Response::Ack(format!("queued {count} songs")))
    }

    async fn skip(&self, ctx: &RequestContext, index: Option<usize>) -> Result<Response> {
        let engine = self.engine(ctx).await?;
        match index {
            Some(position) => {
                engine.jump_to(position).await?;
                Ok(Response::Ack(format!("jumped to position {position}")))
            }
            None => {
                engine.skip().await?;
                Ok(Response::Ack("skipped".to_string()))
            }
        }
    }

    async fn use_playlist(&self, ctx: &RequestContext, name: String, start_index: Option<usize>) -> Result<Response> {
        let channel = ctx.invoker_voice_channel.as_deref().expect("requires_voice checked above");
        let songs = self.playlists.songs_for(&ctx.tenant_id, &name, &ctx.invoker).await?;
        if songs.is_empty() {
            return Err(RouterError::user(format!("playlist '{name}' is empty")));
        }
        let engine = self.registry.get_or_create(&ctx.tenant_id).await;
        engine.tracklist().clear().await;
        let count = songs.len();
        for song in songs {
            engine.enqueue(song).await;
        }
        if let Some(start) = start_index {
            engine.jump_to(start).await?;
        }
        engine.play(channel).await?;
        self.active_playlist.write().await.insert(ctx.tenant_id.clone(), name.clone());
        Ok(Response::Ack(format!("loaded {count} songs from '{name}'")))
    }

    async fn add(&self, ctx: &RequestContext, song: String, source_kind: aural_song::SourceKind) -> Result<Response> {
        let channel = ctx.invoker_voice_channel.as_deref().expect("requires_voice checked above");
        let engine = self.registry.get_or_create(&ctx.tenant_id).await;
        let position = engine.enqueue(Song::new(song.clone(), source_kind, ctx.invoker.clone(), ctx.tenant_id.clone())).await;
        engine.play(channel).await?;

        let active = self.active_playlist.read().await.get(&ctx.tenant_id).cloned();
        if let Some(name) = active {
            self.playlists.add(&ctx.tenant_id, &name, &song, source_kind).await?;
        }
        Ok(Response::Ack(format!("queued at position {position}")))
    }

    async fn remove(&self, ctx: &RequestContext, name: String, indexes: String) -> Result<Response> {
        let positions = parse_indexes(&indexes)?;
        self.playlists.remove(&ctx.tenant_id, &name, &positions).await?;
        Ok(Response::Ack(format!("removed {} entries from '{name}'", positions.len())))
    }

    async fn playlist(&self, ctx: &RequestContext, sub: PlaylistCommand) -> Result<Response> {
        match sub {
            PlaylistCommand::Create { name } => {
                self.playlists.create(&ctx.tenant_id, &name).await?;
                Ok(Response::Ack(format!("created playlist '{name}'")))
            }
            PlaylistCommand::Delete { name } => {
                self.playlists.delete(&ctx.tenant_id, &name).await?;
                Ok(Response::Ack(format!("deleted playlist '{name}'")))
            }
            PlaylistCommand::Show { name, page } => self.playlist_show(&ctx.tenant_id, &name, page).await,
            PlaylistCommand::Add { name, song, source_kind } => {
                self.playlists.add(&ctx.tenant_id, &name, &song, source_kind).await?;
                Ok(Response::Ack(format!("added to '{name}'")))
            }
            PlaylistCommand::Rename { name, new_name } => {
                self.playlists.rename(&ctx.tenant_id, &name, &new_name).await?;
                Ok(Response::Ack(format!("renamed '{name}' to '{new_name}'")))
            }
        }
    }

    async fn playlist_show(&self, tenant_id: &str, name: &str, page: usize) -> Result<Response> {
        let playlist = self.playlists.show(tenant_id, name).await?;
        let entries: Vec<PlaylistEntryView> = playlist
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| PlaylistEntryView {
                position: i + 1,
                title: e.title.clone(),
                original_input: e.original_input.clone(),
            })
            .collect();
        let page = clamp_page(entries.len(), page);
        let args = format!("{tenant_id}:{name}:{page}");
        Ok(Response::PlaylistShow(paginate(&entries, page, "playlist_show", &args)))
    }

    async fn queue(&self, ctx: &RequestContext, page: usize) -> Result<Response> {
        let engine = self.engine(ctx).await?;
        let entries = queue_entries(engine.tracklist()).await;
        let page = clamp_page(entries.len(), page);
        let args = format!("{}:{page}", ctx.tenant_id);
        Ok(Response::Queue(paginate(&entries, page, "queue", &args)))
    }

    async fn now_playing(&self, ctx: &RequestContext) -> Result<Response> {
        let engine = self.engine(ctx).await?;
        let tracklist = engine.tracklist();
        let song = tracklist
            .current_song()
            .await
            .ok_or_else(|| RouterError::not_found("nothing is playing"))?;
        Ok(Response::NowPlaying(NowPlayingView {
            title: song_title(&song).await,
            requester: song.requester().to_string(),
            position: tracklist.position().await,
            size: tracklist.size().await,
            repeat_mode: tracklist.repeat_mode().await,
        }))
    }

    async fn stats(&self) -> Result<Response> {
        let tenant_ids = self.registry.tenant_ids().await;
        let mut connected = 0;
        for tenant_id in &tenant_ids {
            if let Some(engine) = self.registry.get(tenant_id).await {
                if engine.is_connected() {
                    connected += 1;
                }
            }
        }
        Ok(Response::Stats(StatsView {
            active_guilds: tenant_ids.len(),
            connected_guilds: connected,
        }))
    }

    async fn paginate(&self, custom_id: String) -> Result<Response> {
        let parsed = CustomId::parse(&custom_id)?;
        match parsed.view.as_str() {
            "queue" => {
                let (tenant_id, current) = split_last(&parsed.args)?;
                let engine = self
                    .registry
                    .get(&tenant_id)
                    .await
                    .ok_or_else(|| RouterError::not_found("this queue is no longer active"))?;
                let entries = queue_entries(engine.tracklist()).await;
                let next = resolve_action(current, crate::pagination::page_count(entries.len()), parsed.action);
                let args = format!("{tenant_id}:{next}");
                Ok(Response::Queue(paginate(&entries, next, "queue", &args)))
            }
            "playlist_show" => {
                let (rest, current) = split_last(&parsed.args)?;
                let (tenant_id, name) = rest
                    .split_once(':')
                    .ok_or_else(|| RouterError::user("malformed playlist pagination args"))?;
                let playlist = self.playlists.show(tenant_id, name).await?;
                let entries: Vec<PlaylistEntryView> = playlist
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| PlaylistEntryView {
                        position: i + 1,
                        title: e.title.clone(),
                        original_input: e.original_input.clone(),
                    })
                    .collect();
                let next = resolve_action(current, crate::pagination::page_count(entries.len()), parsed.action);
                let args = format!("{tenant_id}:{name}:{next}");
                Ok(Response::PlaylistShow(paginate(&entries, next, "playlist_show", &args)))
            }
            other => Err(RouterError::user(format!("unknown pagination view '{other}'"))),
        }
    }
}

/// Splits `"<prefix>:<page>"` into its prefix and the trailing page
/// number, tolerating a prefix that itself contains colons.
fn split_last(args: &str) -> Result<(String, usize)> {
    let (prefix, page) = args
        .rsplit_once(':')
        .ok_or_else(|| RouterError::user("malformed pagination args"))?;
    let page: usize = page.parse().map_err(|_| RouterError::user("malformed pagination page number"))?;
    Ok((prefix.to_string(), page))
}

async fn song_title(song: &Song) -> String {
    match song.metadata().await {
        Some(SongMetadata { title, .. }) => title,
        None => song.original_input().to_string(),
    }
}

async fn queue_entries(tracklist: &Tracklist) -> Vec<QueueEntryView> {
    let mut entries = Vec::new();
    let current_position = tracklist.position().await;
    if let Some(song) = tracklist.current_song().await {
        entries.push(QueueEntryView {
            position: current_position,
            title: song_title(&song).await,
            requester: song.requester().to_string(),
        });
    }
    for (offset, song) in tracklist.get_upcoming(usize::MAX).await.into_iter().enumerate() {
        entries.push(QueueEntryView {
            position: current_position + offset + 1,
            title: song_title(&song).await,
            requester: song.requester().to_string(),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aural_audio::{PipelineConfig, TranscoderConfig, VoiceSink};
    use aural_cache::{Cache, CacheConfig};
    use aural_engine::{EngineConfig, VoiceConnection};
    use aural_playlist::PlaylistStore;
    use aural_processor::Processor;
    use aural_resolver::{PlaylistEntryRef, Resolution};
    use aural_song::SourceKind;

    struct FakeResolver;

    #[async_trait]
    impl Resolve for FakeResolver {
        async fn resolve(&self, original_input: &str) -> aural_resolver::Result<Resolution> {
            Ok(Resolution {
                title: format!("resolved {original_input}"),
                uploader: None,
                duration_seconds: Some(1),
                thumbnail_url: None,
                stream_url: original_input.to_string(),
            })
        }

        async fn expand_playlist(&self, _url: &str) -> aural_resolver::Result<Vec<PlaylistEntryRef>> {
            Ok(vec![
                PlaylistEntryRef { id: "child-1".to_string(), title: "Child One".to_string() },
                PlaylistEntryRef { id: "child-2".to_string(), title: "Child Two".to_string() },
            ])
        }
    }

    struct FakeSink;

    #[async_trait]
    impl VoiceSink for FakeSink {
        fn requires_dca(&self) -> bool {
            false
        }

        async fn send(&self, _frame: Vec<u8>) -> std::result::Result<(), String> {
            Ok(())
        }

        async fn disconnect(&self) {}
    }

    struct FakeVoice;

    #[async_trait]
    impl VoiceConnection for FakeVoice {
        async fn connect(&self, _channel_id: &str) -> std::result::Result<(), String> {
            Ok(())
        }

        async fn disconnect(&self) {}

        fn sink(&self) -> Arc<dyn VoiceSink> {
            Arc::new(FakeSink)
        }
    }

    struct FakeVoiceFactory;

    #[async_trait]
    impl aural_engine::VoiceConnectionFactory for FakeVoiceFactory {
        async fn build(&self, _tenant_id: &str) -> Arc<dyn VoiceConnection> {
            Arc::new(FakeVoice)
        }
    }

    fn test_router(dir: &std::path::Path) -> CommandRouter<FakeResolver> {
        let resolver = Arc::new(FakeResolver);
        let cache = Cache::new(resolver.clone(), CacheConfig::default());
        let processor = Processor::spawn(cache.clone(), 1, 10);
        let pipeline_config = PipelineConfig {
            transcoder: TranscoderConfig { binary_path: "cat".to_string() },
            ..PipelineConfig::default()
        };
        let registry = Arc::new(EngineRegistry::new(
            processor,
            cache,
            pipeline_config,
            EngineConfig::default(),
            Arc::new(FakeVoiceFactory),
        ));
        let playlists = Arc::new(PlaylistService::new(PlaylistStore::new(dir), resolver.clone()));
        CommandRouter::new(registry, playlists, resolver)
    }

    fn ctx() -> RequestContext {
        RequestContext {
            tenant_id: "guild-1".to_string(),
            invoker: "alice".to_string(),
            invoker_voice_channel: Some("voice-1".to_string()),
        }
    }

    fn ctx_no_voice() -> RequestContext {
        RequestContext { invoker_voice_channel: None, ..ctx() }
    }

    #[tokio::test]
    async fn play_without_voice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        let result = router
            .handle(&ctx_no_voice(), Command::Play { query: "x".to_string(), source_kind: SourceKind::GenericUrl })
            .await;
        assert!(matches!(result, Err(RouterError { kind: ErrorKind::User, .. })));
    }

    #[tokio::test]
    async fn play_then_now_playing() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        router
            .handle(&ctx(), Command::Play { query: "https://x/1".to_string(), source_kind: SourceKind::GenericUrl })
            .await
            .unwrap();

        let response = router.handle(&ctx(), Command::NowPlaying).await.unwrap();
        assert!(matches!(response, Response::NowPlaying(_)));
    }

    #[tokio::test]
    async fn now_playing_with_nothing_queued_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        let result = router.handle(&ctx(), Command::NowPlaying).await;
        assert!(matches!(result, Err(RouterError { kind: ErrorKind::User, .. })));
    }

    #[tokio::test]
    async fn volume_out_of_range_surfaces_as_user_error() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        router
            .handle(&ctx(), Command::Play { query: "https://x/1".to_string(), source_kind: SourceKind::GenericUrl })
            .await
            .unwrap();
        let result = router.handle(&ctx(), Command::Volume { level: 255 }).await;
        assert!(matches!(result, Err(RouterError { kind: ErrorKind::User, .. })));
    }

    #[tokio::test]
    async fn playlist_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        router
            .handle(&ctx(), Command::Playlist(PlaylistCommand::Create { name: "mix".to_string() }))
            .await
            .unwrap();
        router
            .handle(
                &ctx(),
                Command::Playlist(PlaylistCommand::Add {
                    name: "mix".to_string(),
                    song: "https://x/1".to_string(),
                    source_kind: SourceKind::GenericUrl,
                }),
            )
            .await
            .unwrap();

        let response = router
            .handle(&ctx(), Command::Playlist(PlaylistCommand::Show { name: "mix".to_string(), page: 0 }))
            .await
            .unwrap();
        match response {
            Response::PlaylistShow(view) => assert_eq!(view.items.len(), 1),
            other => panic!("expected PlaylistShow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_rejects_a_malformed_index_list() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        router
            .handle(&ctx(), Command::Playlist(PlaylistCommand::Create { name: "mix".to_string() }))
            .await
            .unwrap();
        let result = router
            .handle(&ctx(), Command::Remove { name: "mix".to_string(), indexes: "abc".to_string() })
            .await;
        assert!(matches!(result, Err(RouterError { kind: ErrorKind::User, .. })));
    }

    #[tokio::test]
    async fn aplay_expands_and_queues_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        let response = router
            .handle(&ctx(), Command::APlay { playlist_url: "https://playlist/1".to_string() })
            .await
            .unwrap();
        assert!(matches!(response, Response::Ack(_)));
    }

    #[tokio::test]
    async fn stats_reports_active_guilds() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        router
            .handle(&ctx(), Command::Play { query: "https://x/1".to_string(), source_kind: SourceKind::GenericUrl })
            .await
            .unwrap();
        let response = router.handle(&ctx(), Command::Stats).await.unwrap();
        match response {
            Response::Stats(stats) => assert_eq!(stats.active_guilds, 1),
            other => panic!("expected Stats, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn help_lists_every_command() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        let response = router.handle(&ctx(), Command::Help).await.unwrap();
        match response {
            Response::Help(entries) => assert_eq!(entries.len(), COMMAND_HELP.len()),
            other => panic!("expected Help, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pagination_round_trip_through_a_click() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(dir.path());
        router
            .handle(&ctx(), Command::Playlist(PlaylistCommand::Create { name: "mix".to_string() }))
            .await
            .unwrap();
        for i in 0..15 {
            router
                .handle(
                    &ctx(),
                    Command::Playlist(PlaylistCommand::Add {
                        name: "mix".to_string(),
                        song: format!("https://x/{i}"),
                        source_kind: SourceKind::GenericUrl,
                    }),
                )
                .await
                .unwrap();
        }

        let first_page = router
            .handle(&ctx(), Command::Playlist(PlaylistCommand::Show { name: "mix".to_string(), page: 0 }))
            .await
            .unwrap();
        let next_id = match first_page {
            Response::PlaylistShow(view) => view.controls[3].custom_id.clone().unwrap(),
            other => panic!("expected PlaylistShow, got {other:?}"),
        };

        let second_page = router.handle(&ctx(), Command::Paginate { custom_id: next_id }).await.unwrap();
        match second_page {
            Response::PlaylistShow(view) => {
                assert_eq!(view.page_index, 1);
                assert_eq!(view.items.len(), 5);
            }
            other => panic!("expected PlaylistShow, got {other:?}"),
        }
    }
}
