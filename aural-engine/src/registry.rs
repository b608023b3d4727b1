//! Per-tenant engine registry. Grounded on
//! `pmoplaylist::manager::PlaylistManager`'s `get_write_handle`
//! lazy-create-under-lock pattern, generalized from one global singleton
//! keyed by playlist id to one keyed by tenant id, with no process-wide
//! singleton: `aural-bot` owns the registry instance.

use crate::engine::{EngineConfig, GuildEngine};
use aural_audio::PipelineConfig;
use aural_cache::Cache;
use aural_processor::Processor;
use aural_resolver::Resolve;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::voice::VoiceConnection;

/// Builds the per-guild collaborators a new `GuildEngine` needs. Kept as
/// a trait rather than a closure so `EngineRegistry` can be `Send` and
/// `Clone`d across tasks without boxing per-call state.
#[async_trait::async_trait]
pub trait VoiceConnectionFactory: Send + Sync {
    async fn build(&self, tenant_id: &str) -> Arc<dyn VoiceConnection>;
}

pub struct EngineRegistry<R: Resolve + 'static> {
    processor: Arc<Processor<R>>,
    cache: Arc<Cache<R>>,
    pipeline_config: PipelineConfig,
    engine_config: EngineConfig,
    voice_factory: Arc<dyn VoiceConnectionFactory>,
    engines: RwLock<HashMap<String, Arc<GuildEngine<R>>>>,
}

impl<R: Resolve + 'static> EngineRegistry<R> {
    pub fn new(
        processor: Arc<Processor<R>>,
        cache: Arc<Cache<R>>,
        pipeline_config: PipelineConfig,
        engine_config: EngineConfig,
        voice_factory: Arc<dyn VoiceConnectionFactory>,
    ) -> Self {
        Self {
            processor,
            cache,
            pipeline_config,
            engine_config,
            voice_factory,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the engine for `tenant_id`, creating one on first use.
    pub async fn get_or_create(&self, tenant_id: &str) -> Arc<GuildEngine<R>> {
        if let Some(engine) = self.engines.read().await.get(tenant_id) {
            return engine.clone();
        }

        let mut engines = self.engines.write().await;
        if let Some(engine) = engines.get(tenant_id) {
            return engine.clone();
        }

        let voice = self.voice_factory.build(tenant_id).await;
        let engine = GuildEngine::new(
            tenant_id,
            self.processor.clone(),
            self.cache.clone(),
            voice,
            self.pipeline_config.clone(),
            self.engine_config.clone(),
        );
        engines.insert(tenant_id.to_string(), engine.clone());
        engine
    }

    pub async fn get(&self, tenant_id: &str) -> Option<Arc<GuildEngine<R>>> {
        self.engines.read().await.get(tenant_id).cloned()
    }

    pub async fn tenant_ids(&self) -> Vec<String> {
        self.engines.read().await.keys().cloned().collect()
    }

    /// Disconnects and drops every engine, for graceful shutdown.
    pub async fn disconnect_all(&self) {
        let engines: Vec<_> = self.engines.read().await.values().cloned().collect();
        for engine in engines {
            engine.disconnect().await;
        }
    }
}
