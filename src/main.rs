use std::sync::Arc;

use anyhow::Result;

use logkeep::config::Config;
use logkeep::diagnostics;
use logkeep::logger::{LogCategory, Logger};
use logkeep::store::JsonFileBackend;
use logkeep::{log_info, log_warning};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.ensure_directories()?;

    // Initialize diagnostics BEFORE any tracing calls
    let (diagnostics_info, _guard) = diagnostics::init_diagnostics(&config.diagnostics_dir)?;

    if let Ok(count) = diagnostics::cleanup_old_diagnostics(&config.diagnostics_dir) {
        if count > 0 {
            tracing::info!("Cleaned up {} old diagnostic files", count);
        }
    }
    match diagnostics::cleanup_old_archives(&config.archive_dir, config.archive_retention_days) {
        Ok(count) if count > 0 => tracing::info!("Cleaned up {} old archives", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("Archive cleanup failed: {}", e),
    }

    tracing::info!("Diagnostics at: {}", diagnostics_info.path.display());

    let backend = Arc::new(JsonFileBackend::new(&config.store_path));
    let logger = Logger::builder(config.logger.clone(), backend, &config.archive_dir)
        .rotation_check_interval(config.rotation_check_interval())
        .start();

    log_info!(
        logger,
        LogCategory::system(),
        "Session {} started with {} restored entries",
        logger.session_id(),
        logger.len()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        log_warning!(logger, LogCategory::system(), "Signal handler failed: {}", e);
    }

    log_info!(logger, LogCategory::system(), "Shutdown requested");
    logger.shutdown().await?;
    Ok(())
}
