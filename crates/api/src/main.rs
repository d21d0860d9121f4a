use anyhow::Context;
use api::cache::CacheStats;
use api::{AppConfig, Metrics, MetricsSnapshot, Pipeline, PipelineReport, RunOptions};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use merge::{MergedOntology, PartialExtraction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use visualize::GraphSummary;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    metrics: Arc<Metrics>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    llm: String,
}

#[derive(Deserialize)]
struct IngestRequest {
    path: String,
}

#[derive(Serialize)]
struct IngestResponse {
    chunks_created: usize,
    doc_ids: Vec<String>,
}

#[derive(Deserialize)]
struct ExtractRequest {
    /// Optional: extract from specific chunk file
    chunk_file: Option<String>,
}

#[derive(Serialize)]
struct ExtractResponse {
    chunks_processed: usize,
    failed_chunks: Vec<usize>,
    entities_extracted: usize,
    relationships_extracted: usize,
}

#[derive(Deserialize)]
struct MergeRequest {
    /// Partials in chunk order. When absent the saved partials are merged.
    partials: Option<Vec<PartialExtraction>>,
}

#[derive(Deserialize)]
struct OntologyRequest {
    path: String,
    #[serde(flatten)]
    options: RunOptions,
}

#[derive(Deserialize)]
struct VisualizeRequest {
    turtle_path: String,
    dot_path: Option<String>,
}

#[derive(Serialize)]
struct StatsResponse {
    metrics: MetricsSnapshot,
    cache: Option<CacheStats>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    api::init_tracing();

    let config_path = std::env::var("ONTOGEN_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    let bind = config.output.bind.clone();

    let metrics = Metrics::new();
    let pipeline = Pipeline::new(config, metrics.clone())?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        metrics,
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Server listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check).post(health_check))
        .route("/ingest", post(ingest_document))
        .route("/extract", post(extract_chunks))
        .route("/merge", post(merge_partials))
        .route("/ontology", post(build_ontology))
        .route("/visualize", post(visualize_ontology))
        .route("/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Log and count a failed request.
fn internal_error(state: &AppState, operation: &str, e: anyhow::Error) -> StatusCode {
    error!(operation, error = %format!("{:#}", e), "Request failed");
    state.metrics.record_request(false);
    StatusCode::INTERNAL_SERVER_ERROR
}

fn ok<T>(state: &AppState, value: T) -> Result<Json<T>, StatusCode> {
    state.metrics.record_request(true);
    Ok(Json(value))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let url = format!("{}/api/tags", state.pipeline.config().llm.base_url);
    let llm = match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => "ok".to_string(),
        Ok(resp) => format!("error: status {}", resp.status()),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        llm,
    })
}

async fn ingest_document(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, StatusCode> {
    let path = PathBuf::from(&req.path);
    if !path.exists() {
        state.metrics.record_request(false);
        return Err(StatusCode::NOT_FOUND);
    }

    let chunks = state
        .pipeline
        .ingest(&path)
        .await
        .map_err(|e| internal_error(&state, "ingest", e))?;

    // Save chunks to disk (<data>/chunks/)
    let chunks_dir = chunks_dir(&state);
    let mut doc_ids = BTreeSet::new();
    for chunk in &chunks {
        doc_ids.insert(chunk.doc_id.clone());
        let chunk_file = chunks_dir.join(format!("{}.json", chunk.chunk_id));
        ontology::store::write_json(&chunk_file, chunk)
            .await
            .map_err(|e| internal_error(&state, "ingest", e))?;
    }

    ok(
        &state,
        IngestResponse {
            chunks_created: chunks.len(),
            doc_ids: doc_ids.into_iter().collect(),
        },
    )
}

async fn extract_chunks(
    State(state): State<AppState>,
    req: Option<Json<ExtractRequest>>,
) -> Result<Json<ExtractResponse>, StatusCode> {
    let chunks_dir = chunks_dir(&state);
    let chunk_file = req.and_then(|Json(req)| req.chunk_file);

    let chunk_files = read_chunk_files(&chunks_dir)
        .await
        .map_err(|e| internal_error(&state, "extract", e))?;

    let mut chunks = Vec::with_capacity(chunk_files.len());
    for path in &chunk_files {
        let chunk = read_chunk(path)
            .await
            .map_err(|e| internal_error(&state, "extract", e))?;
        chunks.push(chunk);
    }
    number_chunks(&mut chunks);

    let chunks = match chunk_file {
        Some(file) => {
            let wanted = chunks_dir.join(&file);
            let Some(pos) = chunk_files.iter().position(|p| *p == wanted) else {
                state.metrics.record_request(false);
                return Err(StatusCode::NOT_FOUND);
            };
            let chunk_id = chunk_files[pos]
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            chunks.into_iter().filter(|c| c.chunk_id == chunk_id).collect()
        }
        None => {
            state
                .pipeline
                .store()
                .clear_partials()
                .await
                .map_err(|e| internal_error(&state, "extract", e))?;
            chunks
        }
    };

    let extracted = state.pipeline.extract_chunks(chunks).await;

    let response = ExtractResponse {
        chunks_processed: extracted.len(),
        failed_chunks: extracted
            .iter()
            .filter(|c| c.extraction.is_error())
            .map(|c| c.index)
            .collect(),
        entities_extracted: extracted.iter().map(|c| c.extraction.entities.len()).sum(),
        relationships_extracted: extracted
            .iter()
            .map(|c| c.extraction.relationships.len())
            .sum(),
    };
    ok(&state, response)
}

async fn merge_partials(
    State(state): State<AppState>,
    req: Option<Json<MergeRequest>>,
) -> Result<Json<MergedOntology>, StatusCode> {
    let store = state.pipeline.store();

    let merged = match req.and_then(|Json(req)| req.partials) {
        Some(partials) => merge::aggregate(&partials).map_err(|e| {
            error!(error = %e, "Merge rejected partials");
            state.metrics.record_request(false);
            StatusCode::UNPROCESSABLE_ENTITY
        })?,
        None => {
            let partials = store
                .load_partials()
                .await
                .map_err(|e| internal_error(&state, "merge", e))?;
            let merged = state
                .pipeline
                .merge(&partials)
                .map_err(|e| internal_error(&state, "merge", e))?;
            store
                .save_merged(&merged)
                .await
                .map_err(|e| internal_error(&state, "merge", e))?;
            merged
        }
    };

    ok(&state, merged)
}

async fn build_ontology(
    State(state): State<AppState>,
    Json(req): Json<OntologyRequest>,
) -> Result<Json<PipelineReport>, StatusCode> {
    let path = PathBuf::from(&req.path);
    if !path.exists() {
        state.metrics.record_request(false);
        return Err(StatusCode::NOT_FOUND);
    }

    let report = state
        .pipeline
        .run_with(&path, &req.options)
        .await
        .map_err(|e| internal_error(&state, "ontology", e))?;

    ok(&state, report)
}

async fn visualize_ontology(
    State(state): State<AppState>,
    Json(req): Json<VisualizeRequest>,
) -> Result<Json<GraphSummary>, StatusCode> {
    let turtle_path = PathBuf::from(&req.turtle_path);
    if !turtle_path.is_file() {
        state.metrics.record_request(false);
        return Err(StatusCode::NOT_FOUND);
    }

    let dot_path = req.dot_path.map(PathBuf::from);
    let summary = state
        .pipeline
        .visualize_existing(&turtle_path, dot_path.as_deref())
        .await
        .map_err(|e| internal_error(&state, "visualize", e))?;

    ok(&state, summary)
}

async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        metrics: state.metrics.snapshot(),
        cache: state.pipeline.cache_stats(),
    })
}

/// Give chunks saved by separate `/ingest` calls one global numbering:
/// ordered by source, then by position within the source.
fn number_chunks(chunks: &mut [ingest::Chunk]) {
    chunks.sort_by(|a, b| {
        (a.source.as_str(), a.offset.0, a.index).cmp(&(b.source.as_str(), b.offset.0, b.index))
    });
    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.index = index;
    }
}

fn chunks_dir(state: &AppState) -> PathBuf {
    state.pipeline.store().root().join("chunks")
}

async fn read_chunk(path: &Path) -> anyhow::Result<ingest::Chunk> {
    let json = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read chunk: {:?}", path))?;
    serde_json::from_str(&json).context(format!("Failed to parse chunk: {:?}", path))
}

// Helper function to read chunk files from directory, in file-name order
async fn read_chunk_files(chunks_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(chunks_dir)
        .await
        .context(format!("Failed to read directory: {:?}", chunks_dir))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
