//! skipmark-ia - Intro Analysis Service
//!
//! Batch-analyzes a TV library for recurring intro segments via audio
//! fingerprinting and writes EDL skip markers next to the media files.
//! Analysis runs are triggered on demand over HTTP and once daily by the
//! built-in schedule.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use skipmark_common::config;
use skipmark_common::events::EventBus;
use skipmark_ia::runner::RunCoordinator;
use skipmark_ia::scheduler::AnalysisScheduler;
use skipmark_ia::services::{
    EpisodeQueue, IntroFingerprintService, MediaLibrary, SegmentCache,
};
use skipmark_ia::AppState;

const DEFAULT_BIND: &str = "127.0.0.1:5741";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting skipmark-ia (Intro Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve configuration
    let config_file = config::load_config_file()?;
    let data_dir = config::resolve_data_dir(&config_file);
    let db_path = config::ensure_data_dir(&data_dir)?;
    info!("Database: {}", db_path.display());

    let library_root = match config::resolve_library_root(&config_file) {
        Some(root) => {
            info!("Library root: {}", root.display());
            root
        }
        None => {
            warn!(
                "No library root configured ({} or config.toml); \
                 analysis runs will fail until one is set",
                config::LIBRARY_ROOT_ENV
            );
            std::path::PathBuf::new()
        }
    };

    // Step 2: Open or create database
    let db_pool = skipmark_ia::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 3: Warm the segment cache from persisted detections
    let cache = SegmentCache::new();
    let persisted = skipmark_ia::db::segments::load_all_segments(&db_pool).await?;
    info!("Loaded {} persisted detections", persisted.len());
    cache.load(persisted);

    // Step 4: Wire the analysis pipeline
    let event_bus = EventBus::new(100);
    let library = Arc::new(MediaLibrary::new(library_root));
    let queue = Arc::new(EpisodeQueue::new(library.clone()));
    let service = Arc::new(IntroFingerprintService::new(cache.clone(), db_pool.clone()));
    let scheduler = Arc::new(AnalysisScheduler::new(
        library,
        queue,
        cache,
        service,
        db_pool.clone(),
        event_bus.clone(),
    ));
    let coordinator = Arc::new(RunCoordinator::new(scheduler, event_bus.clone()));

    // Step 5: Daily schedule
    skipmark_ia::schedule::spawn_daily_analysis(coordinator.clone());

    // Step 6: HTTP server
    let state = AppState::new(db_pool, event_bus, coordinator);
    let app = skipmark_ia::build_router(state);

    let bind = config_file.bind.as_deref().unwrap_or(DEFAULT_BIND);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
