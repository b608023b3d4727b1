//! `GuildEngine`: per-tenant controller wiring a `Tracklist`, the shared
//! `Processor` pool, an `AudioPipeline`, and a voice connection into the
//! fetch -> resolve -> play -> advance loop described in the system
//! overview.
//!
//! Grounded on `pmoplaylist::manager::PlaylistManager`'s per-key
//! lock-and-registry shape, generalized from one global singleton to one
//! engine per tenant, each owning its own lock rather than sharing a
//! single global one.

use crate::error::{EngineError, Result};
use crate::voice::VoiceConnection;
use aural_audio::{AudioPipeline, PipelineConfig, PipelineError, PipelineOutcome, PipelineState};
use aural_cache::Cache;
use aural_processor::{Priority, Processor, ProcessingTask};
use aural_resolver::Resolve;
use aural_song::{Song, SongStatus};
use aural_tracklist::Tracklist;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Default wait for a song to resolve before the loop gives up on it and
/// advances past it.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(30);
/// Default interval after which a playing song's stream URL is
/// refreshed, well inside a typical extractor URL's real lifetime.
pub const DEFAULT_STREAM_REFRESH_AFTER: Duration = Duration::from_secs(18_000);
const DEFAULT_PRE_RESOLVE_COUNT: usize = 2;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub readiness_timeout: Duration,
    pub stream_refresh_after: Duration,
    pub pre_resolve_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            stream_refresh_after: DEFAULT_STREAM_REFRESH_AFTER,
            pre_resolve_count: DEFAULT_PRE_RESOLVE_COUNT,
        }
    }
}

/// Per-tenant playback controller. All state-changing operations take
/// `transition_lock` first, so cross-guild operations on other engines
/// never block on this one.
pub struct GuildEngine<R: Resolve + 'static> {
    tenant_id: String,
    tracklist: Tracklist,
    processor: Arc<Processor<R>>,
    cache: Arc<Cache<R>>,
    pipeline: Arc<AudioPipeline>,
    voice: Arc<dyn VoiceConnection>,
    config: EngineConfig,
    transition_lock: AsyncMutex<()>,
    connected: AtomicBool,
    voice_channel_id: StdMutex<Option<String>>,
    loop_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl<R: Resolve + 'static> GuildEngine<R> {
    pub fn new(
        tenant_id: impl Into<String>,
        processor: Arc<Processor<R>>,
        cache: Arc<Cache<R>>,
        voice: Arc<dyn VoiceConnection>,
        pipeline_config: PipelineConfig,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            tenant_id: tenant_id.into(),
            tracklist: Tracklist::new(),
            processor,
            cache,
            pipeline: AudioPipeline::new(pipeline_config),
            voice,
            config,
            transition_lock: AsyncMutex::new(()),
            connected: AtomicBool::new(false),
            voice_channel_id: StdMutex::new(None),
            loop_handle: StdMutex::new(None),
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn tracklist(&self) -> &Tracklist {
        &self.tracklist
    }

    pub fn pipeline(&self) -> &Arc<AudioPipeline> {
        &self.pipeline
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn voice_channel_id(&self) -> Option<String> {
        self.voice_channel_id.lock().unwrap().clone()
    }

    /// Adds `song` to the tracklist and queues it for resolution. The
    /// first song of an otherwise-empty tracklist resolves at `High`
    /// priority since playback is waiting on it directly.
    pub async fn enqueue(&self, song: Song) -> usize {
        let position = self.tracklist.add(song.clone()).await;
        let priority = if position == 1 { Priority::High } else { Priority::Normal };
        let task = ProcessingTask::new(song, priority);
        let _ = self.processor.queue(task).await;
        position
    }

    /// Connects to `channel_id` if not already connected, and starts the
    /// playback loop if it isn't already running.
    pub async fn play(self: &Arc<Self>, channel_id: &str) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        if !self.connected.load(Ordering::SeqCst) {
            self.voice.connect(channel_id).await.map_err(EngineError::VoiceConnectFailed)?;
            self.connected.store(true, Ordering::SeqCst);
            *self.voice_channel_id.lock().unwrap() = Some(channel_id.to_string());
        }
        self.ensure_loop_running();
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.pipeline.pause().map_err(EngineError::from)
    }

    pub fn resume(&self) -> Result<()> {
        self.pipeline.resume().map_err(EngineError::from)
    }

    pub fn set_volume(&self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(EngineError::InvalidVolume(percent));
        }
        self.pipeline.set_volume(percent as f32 / 100.0);
        Ok(())
    }

    /// Stops the current song without advancing. The loop iteration
    /// that is awaiting this pipeline run exits without starting the
    /// next song; a later `play` restarts it from wherever the
    /// tracklist's current position ends up.
    pub async fn stop(&self) {
        if self.pipeline.state() != PipelineState::Idle {
            self.pipeline.stop(false).await;
        }
    }

    /// Advances to the next song and restarts the loop if one exists.
    pub async fn skip(self: &Arc<Self>) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        self.stop_current_if_playing().await;
        if self.tracklist.next_song().await.is_some() {
            self.ensure_loop_running();
        }
        Ok(())
    }

    /// Jumps directly to a 1-based position and restarts the loop there.
    pub async fn jump_to(self: &Arc<Self>, position: usize) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        self.stop_current_if_playing().await;
        if self.tracklist.skip_to_position(position).await.is_none() {
            return Err(EngineError::InvalidIndex(position));
        }
        self.ensure_loop_running();
        Ok(())
    }

    async fn stop_current_if_playing(&self) {
        if !matches!(self.pipeline.state(), PipelineState::Idle | PipelineState::Stopped) {
            self.pipeline.stop(false).await;
        }
    }

    /// Tears the engine down: stops playback, leaves voice, and aborts
    /// the loop task. A later `play` reconnects from scratch.
    pub async fn disconnect(self: &Arc<Self>) {
        let _guard = self.transition_lock.lock().await;
        self.stop_current_if_playing().await;
        self.voice.disconnect().await;
        self.connected.store(false, Ordering::SeqCst);
        *self.voice_channel_id.lock().unwrap() = None;
        if let Some(handle) = self.loop_handle.lock().unwrap().take() {
            handle.abort();
        }
    }

    fn ensure_loop_running(self: &Arc<Self>) {
        let mut handle = self.loop_handle.lock().unwrap();
        let needs_restart = match handle.as_ref() {
            Some(h) => h.is_finished(),
            None => true,
        };
        if needs_restart {
            let engine = self.clone();
            *handle = Some(tokio::spawn(async move { engine.run_loop().await }));
        }
    }

    /// Drives the tracklist forward: resolve the current song if needed,
    /// pre-resolve upcoming ones, play it, and either advance on a
    /// natural end of stream or stop the loop otherwise.
    async fn run_loop(self: Arc<Self>) {
        let mut retry_song_id: Option<uuid::Uuid> = None;
        let mut retries_on_current: u32 = 0;

        loop {
            if !self.connected.load(Ordering::SeqCst) {
                return;
            }

            let Some(song) = self.tracklist.current_song().await else {
                return;
            };

            if retry_song_id != Some(song.id()) {
                retry_song_id = Some(song.id());
                retries_on_current = 0;
            }

            if !song.is_ready().await {
                match song.status().await {
                    SongStatus::Failed => {
                        if self.tracklist.next_song().await.is_none() {
                            return;
                        }
                        continue;
                    }
                    SongStatus::Pending => {
                        let task = ProcessingTask::new(song.clone(), Priority::High);
                        let _ = self.processor.queue(task).await;
                    }
                    _ => {}
                }

                if !self.wait_until_resolved(&song).await {
                    info!(tenant = %self.tenant_id, song_id = %song.id(), "song did not resolve in time, skipping");
                    if self.tracklist.next_song().await.is_none() {
                        return;
                    }
                    continue;
                }
            }

            self.pre_resolve_upcoming().await;

            let Some(stream_url) = song.stream_url().await else {
                if self.tracklist.next_song().await.is_none() {
                    return;
                }
                continue;
            };

            let outcome = self.play_one(&song, stream_url).await;
            if let Some(error) = &outcome.error {
                warn!(tenant = %self.tenant_id, %error, "pipeline run ended with an error");
            }

            if outcome.auto_advance {
                retries_on_current = 0;
                if self.tracklist.next_song().await.is_none() {
                    return;
                }
                continue;
            }

            let Some(error) = outcome.error else {
                return;
            };

            retries_on_current += 1;
            if retries_on_current < 2 {
                if matches!(error, PipelineError::StreamExpired) {
                    match self.cache.get_or_resolve(song.original_input()).await {
                        Ok(resolution) => {
                            let _ = song.refresh_stream_url(resolution.stream_url).await;
                        }
                        Err(refresh_error) => {
                            warn!(tenant = %self.tenant_id, %refresh_error, "stream refresh before retry failed, retrying with the stale URL");
                        }
                    }
                }
                info!(tenant = %self.tenant_id, song_id = %song.id(), attempt = retries_on_current, "retrying the same song after a pipeline error");
                continue;
            }

            warn!(tenant = %self.tenant_id, song_id = %song.id(), "song failed twice in a row, advancing");
            retries_on_current = 0;
            if self.tracklist.next_song().await.is_none() {
                return;
            }
            continue;
        }
    }

    async fn play_one(self: &Arc<Self>, song: &Song, stream_url: String) -> PipelineOutcome {
        let sink = self.voice.sink();
        match self.pipeline.play(stream_url, sink).await {
            Ok(receiver) => {
                let refresh_handle = self.spawn_refresh(song.clone());
                let outcome = receiver
                    .await
                    .unwrap_or(PipelineOutcome { auto_advance: false, error: None });
                refresh_handle.abort();
                outcome
            }
            Err(error) => PipelineOutcome { auto_advance: false, error: Some(error) },
        }
    }

    async fn wait_until_resolved(&self, song: &Song) -> bool {
        let resolved = tokio::time::timeout(self.config.readiness_timeout, async {
            loop {
                match song.status().await {
                    SongStatus::Ready => return true,
                    SongStatus::Failed => return false,
                    _ => tokio::time::sleep(Duration::from_millis(50)).await,
                }
            }
        })
        .await;
        resolved.unwrap_or(false)
    }

    async fn pre_resolve_upcoming(&self) {
        let upcoming = self.tracklist.get_upcoming(self.config.pre_resolve_count).await;
        for song in upcoming {
            if song.status().await == SongStatus::Pending {
                let task = ProcessingTask::new(song, Priority::Normal);
                let _ = self.processor.queue(task).await;
            }
        }
    }

    /// Periodically re-resolves `song`'s stream URL so a long-lived play
    /// never outlives the extractor URL's real expiry. Cancelled once
    /// the pipeline run for this song ends.
    fn spawn_refresh(self: &Arc<Self>, song: Song) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(engine.config.stream_refresh_after).await;
                if song.status().await != SongStatus::Ready {
                    return;
                }
                match engine.cache.get_or_resolve(song.original_input()).await {
                    Ok(resolution) => {
                        if song.refresh_stream_url(resolution.stream_url).await.is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(tenant = %engine.tenant_id, %error, "stream refresh failed, keeping the stale URL");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aural_audio::{TranscoderConfig, VoiceSink};
    use aural_cache::CacheConfig;
    use aural_resolver::{PlaylistEntryRef, Resolution};
    use aural_song::SourceKind;
    use std::sync::atomic::AtomicBool as StdAtomicBool;
    use tokio::sync::Mutex as TokioMutex;

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
            Ok(vec![])
        }
    }

    struct FakeSink {
        frames: TokioMutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl VoiceSink for FakeSink {
        fn requires_dca(&self) -> bool {
            false
        }

        async fn send(&self, frame: Vec<u8>) -> std::result::Result<(), String> {
            self.frames.lock().await.push(frame);
            Ok(())
        }

        async fn disconnect(&self) {}
    }

    struct FakeVoice {
        connected: StdAtomicBool,
        sink: Arc<FakeSink>,
    }

    impl FakeVoice {
        fn new() -> Self {
            Self {
                connected: StdAtomicBool::new(false),
                sink: Arc::new(FakeSink { frames: TokioMutex::new(Vec::new()) }),
            }
        }
    }

    #[async_trait]
    impl VoiceConnection for FakeVoice {
        async fn connect(&self, _channel_id: &str) -> std::result::Result<(), String> {
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

    /// `cat` closes stdout as soon as its (null) stdin hits EOF, giving
    /// the pipeline an immediate, deterministic natural end of stream
    /// without needing a real transcoder binary on the test machine.
    fn test_engine() -> Arc<GuildEngine<FakeResolver>> {
        test_engine_with_binary("cat")
    }

    /// `binary_path` lets tests pick a stand-in transcoder: `cat` closes
    /// stdout as soon as its (null) stdin hits EOF, giving a clean
    /// natural end of stream, while `false` exits non-zero immediately,
    /// giving a deterministic pipeline error.
    fn test_engine_with_binary(binary_path: &str) -> Arc<GuildEngine<FakeResolver>> {
        let cache = Cache::new(Arc::new(FakeResolver), CacheConfig::default());
        let processor = Processor::spawn(cache.clone(), 1, 10);
        let voice = Arc::new(FakeVoice::new());
        let pipeline_config = PipelineConfig {
            transcoder: TranscoderConfig { binary_path: binary_path.to_string() },
            ..PipelineConfig::default()
        };
        GuildEngine::new("guild-1", processor, cache, voice, pipeline_config, EngineConfig::default())
    }

    fn song(label: &str) -> Song {
        Song::new(label, SourceKind::GenericUrl, "tester", "guild-1")
    }

    #[tokio::test]
    async fn enqueue_adds_to_tracklist() {
        let engine = test_engine();
        let position = engine.enqueue(song("a")).await;
        assert_eq!(position, 1);
        assert_eq!(engine.tracklist().size().await, 1);
    }

    #[tokio::test]
    async fn volume_out_of_range_is_rejected() {
        let engine = test_engine();
        assert!(matches!(engine.set_volume(101), Err(EngineError::InvalidVolume(101))));
        assert!(engine.set_volume(50).is_ok());
    }

    #[tokio::test]
    async fn pause_before_playing_is_rejected() {
        let engine = test_engine();
        assert!(engine.pause().is_err());
    }

    #[tokio::test]
    async fn jump_to_invalid_index_is_rejected() {
        let engine = test_engine();
        engine.enqueue(song("a")).await;
        assert!(matches!(engine.jump_to(5).await, Err(EngineError::InvalidIndex(5))));
    }

    #[tokio::test]
    async fn play_connects_and_runs_to_completion() {
        let engine = test_engine();
        engine.enqueue(song("a")).await;
        engine.play("voice-channel-1").await.unwrap();
        assert!(engine.is_connected());
        assert_eq!(engine.voice_channel_id(), Some("voice-channel-1".to_string()));

        for _ in 0..50 {
            if matches!(engine.pipeline().state(), PipelineState::Idle | PipelineState::Stopped) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(engine.tracklist().size().await, 1);
    }

    #[tokio::test]
    async fn pipeline_error_retries_once_then_advances_to_next_song() {
        let engine = test_engine_with_binary("false");
        engine.enqueue(song("a")).await;
        engine.enqueue(song("b")).await;
        engine.play("voice-channel-1").await.unwrap();

        let mut reached_second = false;
        for _ in 0..200 {
            if engine.tracklist().position().await == 2 {
                reached_second = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(reached_second, "a failing song should be retried once before the engine advances");
    }

    #[tokio::test]
    async fn disconnect_leaves_voice_and_resets_state() {
        let engine = test_engine();
        engine.enqueue(song("a")).await;
        engine.play("voice-channel-1").await.unwrap();
        engine.disconnect().await;
        assert!(!engine.is_connected());
        assert!(engine.voice_channel_id().is_none());
    }
}
