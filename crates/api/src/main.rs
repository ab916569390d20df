mod cache;
mod config;
mod error;
mod metrics;
mod retry;
mod routes;

use anyhow::Context;
use centrality::CentralityScorer;
use classifier::RelationshipClassifier;
use enrich::EnrichmentPipeline;
use extract::{LoreExtractor, OllamaClient};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::cache::EnrichmentCache;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::retry::RetryPolicy;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config);

    let pipeline = EnrichmentPipeline::new(
        CentralityScorer::new(config.scoring.scope),
        config.size_policy()?,
    );

    // A missing or broken model only disables prediction endpoints.
    let classifier = Arc::new(RelationshipClassifier::new(&config.model.artifact_path));
    let classifier_for_load = Arc::clone(&classifier);
    tokio::task::spawn_blocking(move || classifier_for_load.load())
        .await
        .context("Model loading task panicked")?;

    let extractor = if config.extractor.enabled {
        let client = OllamaClient::new(
            config.extractor.base_url.clone(),
            config.extractor.model.clone(),
            Duration::from_secs(config.extractor.timeout_secs),
        )?;
        Some(Arc::new(LoreExtractor::new(client, config.extractor.max_input_chars)))
    } else {
        tracing::info!("Extraction disabled, /analyze will answer 503");
        None
    };

    let cache = config
        .cache
        .enabled
        .then(|| EnrichmentCache::new(config.cache.max_entries));

    let state = Arc::new(AppState {
        pipeline,
        classifier,
        extractor,
        cache,
        metrics: Metrics::new(),
        retry: RetryPolicy::from_config(&config.retry),
    });

    let app = routes::app(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        scope = ?config.scoring.scope,
        base_offset = config.scoring.base_offset,
        "Server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
