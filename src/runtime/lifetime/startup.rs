use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cache::{CacheFactory, MappingCache};
use crate::config::StaticConfig;
use crate::engine::{EngineSettings, HitRecorder, HitSink, ResolutionEngine};
use crate::keys::KeyGenerator;
use crate::storage::{SeaOrmStorage, StorageFactory};
use crate::workers::{
    CleanupSettings, CleanupWorker, PopulationSettings, PopulationWorker,
};

/// 启动后共享的组件
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub cache: Arc<dyn MappingCache>,
    pub engine: Arc<ResolutionEngine>,
    pub hit_recorder: Option<HitRecorder>,
    pub population: Arc<PopulationWorker>,
    pub cleanup: Arc<CleanupWorker>,
}

fn install_crypto_provider() {
    // 多次安装只会返回 Err，忽略即可
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// 组装存储、缓存、解析引擎和后台任务（不启动任务）
pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    install_crypto_provider();

    let storage = StorageFactory::create(&config.database)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let cache = CacheFactory::create(&config.cache)
        .await
        .context("Failed to create resolution cache")?;

    let generator =
        KeyGenerator::from_config(&config.keys).context("Invalid key generator settings")?;

    let population = Arc::new(PopulationWorker::new(
        storage.clone(),
        generator.clone(),
        PopulationSettings::from_config(config),
    ));

    let mut engine = ResolutionEngine::new(
        storage.clone(),
        storage.clone(),
        cache.clone(),
        generator,
        EngineSettings::from_config(config),
    )
    .with_replenish_signal(population.replenish_signal());

    let hit_recorder = if config.workers.enable_hit_tracking {
        let sink: Arc<dyn HitSink> = storage.clone();
        let recorder = HitRecorder::new(
            sink,
            Duration::from_secs(config.workers.hit_flush_interval_secs),
            config.workers.hit_max_entries as u64,
        );
        engine = engine.with_hit_recorder(recorder.clone());
        debug!(
            "Hit tracking enabled (flush every {}s or {} hits)",
            config.workers.hit_flush_interval_secs, config.workers.hit_max_entries
        );
        Some(recorder)
    } else {
        info!("Hit tracking disabled");
        None
    };

    let cleanup = Arc::new(CleanupWorker::new(
        storage.clone(),
        cache.clone(),
        CleanupSettings::from_config(config),
    ));

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        cache,
        engine: Arc::new(engine),
        hit_recorder,
        population,
        cleanup,
    })
}
