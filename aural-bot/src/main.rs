//! Wires every crate into a running process: loads configuration,
//! installs logging, constructs the cache/resolver/processor/engine
//! stack and the command router above it, then waits for a shutdown
//! signal. Phased startup logging and the Ctrl+C wait mirror
//! `PMOMusic/src/main.rs`'s shape, generalized to this service's own
//! collaborators.

mod logging;
mod voice;

use aural_audio::PipelineConfig;
use aural_cache::{Cache, CacheConfig};
use aural_config::Config;
use aural_engine::{EngineConfig, EngineRegistry};
use aural_playlist::{PlaylistService, PlaylistStore};
use aural_processor::Processor;
use aural_resolver::{ExternalExtractorResolver, ExtractorConfig};
use aural_router::CommandRouter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use voice::PlaceholderVoiceConnectionFactory;

/// Bound on how long graceful shutdown is allowed to take before the
/// process exits anyway.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("fatal: invalid configuration: {error}");
            std::process::exit(1);
        }
    };

    logging::init(&config)?;
    info!(?config, "starting aural-bot");

    // ========== Resolution stack: resolver -> cache -> processor ==========
    let resolver = Arc::new(ExternalExtractorResolver::new(ExtractorConfig::default()));

    let cache = Cache::new(
        resolver.clone(),
        CacheConfig {
            max_entries: config.cache_max_entries(),
            ttl: chrono::Duration::from_std(config.cache_ttl()).unwrap_or(chrono::Duration::hours(2)),
            ..CacheConfig::default()
        },
    );

    let processor = Processor::spawn(cache.clone(), config.worker_count(), config.max_queue_size());
    info!(worker_count = config.worker_count(), "resolution pool running");

    // ========== Playlists ==========
    std::fs::create_dir_all(config.playlist_dir())?;
    let store = PlaylistStore::new(config.playlist_dir());
    let playlists = Arc::new(PlaylistService::new(store, resolver.clone()));

    // ========== Per-guild playback engines ==========
    let engine_config = EngineConfig {
        stream_refresh_after: config.stream_refresh_after(),
        ..EngineConfig::default()
    };
    let registry = Arc::new(EngineRegistry::new(
        processor.clone(),
        cache.clone(),
        PipelineConfig::default(),
        engine_config,
        Arc::new(PlaceholderVoiceConnectionFactory),
    ));

    // ========== Command surface ==========
    // The chat-gateway client that would feed parsed `Command`s into this
    // router and register `voice::PlaceholderVoiceConnectionFactory`'s
    // real counterpart lives outside this crate; constructing it here
    // only proves the wiring compiles end to end.
    let _router = Arc::new(CommandRouter::new(registry.clone(), playlists.clone(), resolver.clone()));

    info!("aural-bot is ready");
    info!("press Ctrl+C to stop");

    wait_for_shutdown_signal().await;

    info!("shutdown signal received, stopping within {:?}", SHUTDOWN_DEADLINE);
    let shutdown = async {
        registry.disconnect_all().await;
        processor.shutdown().await;
    };

    if tokio::time::timeout(SHUTDOWN_DEADLINE, shutdown).await.is_err() {
        error!("graceful shutdown exceeded its deadline, forcing exit");
    }

    info!("aural-bot stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
