pub mod audit;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod storage;
pub mod worker;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServiceConfig};
use crate::db::{DatabaseError, SqliteStore};
use crate::pipeline::extraction::{ExtractionError, OcrExtractor, VisionOcrClient};
use crate::pipeline::VerificationPipeline;
use crate::publish::JsonLinesPublisher;
use crate::storage::{LocalFileStorage, StorageError};
use crate::worker::WorkerError;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("OCR client error: {0}")]
    Ocr(#[from] ExtractionError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Wire the pipeline from configuration.
///
/// Must run outside the async runtime: the OCR client is a blocking reqwest
/// client, which owns its own runtime internally.
pub fn build_pipeline(config: &ServiceConfig) -> Result<VerificationPipeline, StartupError> {
    let store = Arc::new(SqliteStore::open(&config.db_path)?);
    let storage = Arc::new(LocalFileStorage::new(&config.storage_dir)?);

    let extractor = match &config.ocr_endpoint {
        Some(endpoint) => {
            let client = VisionOcrClient::new(endpoint, config.ocr_api_key.clone(), config.ocr_timeout)?;
            tracing::info!(endpoint = %client.endpoint(), "OCR service configured");
            OcrExtractor::new(Arc::new(client))
        }
        None => {
            tracing::warn!("No OCR endpoint configured, extraction will use sample text");
            OcrExtractor::unavailable()
        }
    };

    let publisher = Arc::new(JsonLinesPublisher::with_topics(
        std::io::stdout(),
        &config.completed_topic,
        &config.error_topic,
    ));

    Ok(VerificationPipeline::new(
        store.clone(),
        storage,
        extractor,
        publisher,
        store,
    ))
}

pub fn run() -> Result<(), StartupError> {
    // stdout carries published events; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        storage_dir = %config.storage_dir.display(),
        max_concurrent = config.max_concurrent_requests,
        "Configuration loaded"
    );

    let pipeline = Arc::new(build_pipeline(&config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let summary = runtime.block_on(async move {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
        };
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        worker::serve(pipeline, stdin, config.max_concurrent_requests, shutdown).await
    })?;

    tracing::info!(handled = summary.received, "{} stopped", config::APP_NAME);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_pipeline_from_config_without_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            db_path: dir.path().join("db/docverify.db"),
            storage_dir: dir.path().join("documents"),
            ..ServiceConfig::default()
        };

        build_pipeline(&config).unwrap();

        assert!(config.db_path.is_file());
        assert!(config.storage_dir.is_dir());
    }

    #[test]
    fn builds_pipeline_with_ocr_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            db_path: dir.path().join("docverify.db"),
            storage_dir: dir.path().join("documents"),
            ocr_endpoint: Some("http://127.0.0.1:9/v1/images:annotate".into()),
            ..ServiceConfig::default()
        };

        assert!(build_pipeline(&config).is_ok());
    }
}
