use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use classifier::{FeatureVector, LoadResult, ModelStatus, PredictionResult, RelationshipClassifier};
use enrich::{EnrichedGraph, EnrichmentPipeline, LinkPrediction, MergedGraph, merge_analyses};
use extract::{ExtractionResult, LoreExtractor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::cache::{CacheStats, EnrichmentCache};
use crate::error::{ApiError, ApiResult};
use crate::metrics::{Metrics, MetricsSnapshot, TimedOperation};
use crate::retry::RetryPolicy;

pub struct AppState {
    pub pipeline: EnrichmentPipeline,
    pub classifier: Arc<RelationshipClassifier>,
    /// `None` when extraction is disabled; `/analyze` then answers 503.
    pub extractor: Option<Arc<LoreExtractor>>,
    pub cache: Option<EnrichmentCache>,
    pub metrics: Arc<Metrics>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    ml_model_loaded: bool,
    extractor_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    text: String,
    /// Label for characters the extractor did not assign to a work.
    #[serde(default)]
    work: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    ml_model_loaded: bool,
    predictions: Vec<LinkPrediction>,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    #[serde(default)]
    previous: MergedGraph,
    incoming: EnrichedGraph,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<CacheStats>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze))
        .route("/enrich", post(enrich_graph))
        .route("/classify", post(classify_links))
        .route("/predict/relationship-type", post(predict_relationship))
        .route("/predict/health", get(model_health))
        .route("/predict/reload", post(reload_model))
        .route("/merge", post(merge))
        .route("/stats", get(get_stats))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    state.metrics.record_request(response.status().is_success());
    response
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ml_model_loaded: state.classifier.is_loaded(),
        extractor_enabled: state.extractor.is_some(),
    })
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<EnrichedGraph>> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".to_string()));
    }
    let extractor: &LoreExtractor = state
        .extractor
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable("extraction is disabled".to_string()))?;

    let timer = TimedOperation::start();
    let text = req.text.as_str();
    let mut extraction = state
        .retry
        .retry("extract", move || extractor.extract_from_text(text))
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;
    state.metrics.record_extract(timer.elapsed());

    if let Some(work) = req.work.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
        extraction.stamp_work(work);
    }

    Ok(Json(enrich_cached(&state, &extraction).as_ref().clone()))
}

async fn enrich_graph(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ExtractionResult>,
) -> Json<EnrichedGraph> {
    Json(enrich_cached(&state, &input).as_ref().clone())
}

fn enrich_cached(state: &AppState, input: &ExtractionResult) -> Arc<EnrichedGraph> {
    let key = state
        .cache
        .as_ref()
        .and_then(|_| EnrichmentCache::key_for(input));

    if let (Some(cache), Some(key)) = (&state.cache, &key) {
        if let Some(hit) = cache.get(key) {
            return hit;
        }
    }

    let timer = TimedOperation::start();
    let (graph, report) = state.pipeline.enrich_with_report(&input.nodes, &input.edges);
    state.metrics.record_enrich(timer.elapsed(), graph.nodes.len());

    if report.nodes_dropped() > 0 || report.edges_dropped() > 0 {
        info!(
            nodes_dropped = report.nodes_dropped(),
            edges_dropped = report.edges_dropped(),
            "Skipped unusable input records"
        );
    }

    let graph = Arc::new(graph);
    if let (Some(cache), Some(key)) = (&state.cache, key) {
        cache.insert(key, Arc::clone(&graph));
    }
    graph
}

async fn classify_links(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ExtractionResult>,
) -> Json<ClassifyResponse> {
    let predictions = state
        .pipeline
        .classify_links(&state.classifier, &input.nodes, &input.edges);

    for link in &predictions {
        state.metrics.record_prediction(!link.prediction.is_ok());
    }

    Json(ClassifyResponse {
        ml_model_loaded: state.classifier.is_loaded(),
        predictions,
    })
}

async fn predict_relationship(
    State(state): State<Arc<AppState>>,
    Json(features): Json<FeatureVector>,
) -> ApiResult<Json<PredictionResult>> {
    let result = state.classifier.predict(&features);
    state.metrics.record_prediction(!result.is_ok());

    match result.error {
        Some(detail) => Err(ApiError::Unavailable(detail)),
        None => Ok(Json(result)),
    }
}

async fn model_health(State(state): State<Arc<AppState>>) -> Json<ModelStatus> {
    Json(state.classifier.status())
}

async fn reload_model(State(state): State<Arc<AppState>>) -> ApiResult<Json<LoadResult>> {
    let classifier = Arc::clone(&state.classifier);
    let result = tokio::task::spawn_blocking(move || classifier.load())
        .await
        .map_err(|e| ApiError::Unavailable(format!("reload aborted: {e}")))?;

    if let LoadResult::Unavailable { reason } = &result {
        warn!(reason = %reason, "Model reload left predictions disabled");
    }
    Ok(Json(result))
}

async fn merge(Json(req): Json<MergeRequest>) -> Json<MergedGraph> {
    Json(merge_analyses(&req.previous, &req.incoming))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        metrics: state.metrics.snapshot(),
        cache: state.cache.as_ref().map(EnrichmentCache::stats),
    })
}
