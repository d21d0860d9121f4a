//! End-to-end run: document → chunks → partial extractions → merged
//! ontology → Turtle → DOT.

use anyhow::{Context, Result};
use extract::{ExtractedChunk, Extractor, LlmClient};
use ingest::Chunk;
use merge::{MergedOntology, PartialExtraction};
use ontology::{OntologyStore, TurtleMode, TurtleSynthesizer, TurtleWriter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use visualize::GraphSummary;

use crate::cache::{Cache, CacheStats};
use crate::config::AppConfig;
use crate::metrics::{Metrics, TimedOperation};
use crate::retry::RetryPolicy;

/// Where to write the Turtle and DOT outputs. Unset paths fall back to the
/// store layout under the data directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOptions {
    pub turtle_path: Option<PathBuf>,
    pub dot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub source: PathBuf,
    pub chunks: usize,
    pub failed_chunks: Vec<usize>,
    pub entities: usize,
    pub relationships: usize,
    pub relationship_types: usize,
    pub skipped_relationships: usize,
    pub dropped_relationships: usize,
    pub turtle_mode: TurtleMode,
    pub merged_path: PathBuf,
    pub turtle_path: PathBuf,
    pub dot_path: PathBuf,
    pub graph: GraphSummary,
}

/// Extracts one chunk: cache first, then the model with retries.
#[derive(Clone)]
struct ChunkWorker {
    extractor: Extractor,
    cache: Option<Cache>,
    retry: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl ChunkWorker {
    async fn extract(&self, chunk: &Chunk) -> ExtractedChunk {
        let extraction = match self.cache.as_ref().and_then(|c| c.get_extraction(&chunk.text)) {
            Some(cached) => {
                debug!(chunk = chunk.index, "Extraction cache hit");
                self.metrics.record_cache_hit();
                cached
            }
            None => self.extract_fresh(chunk).await,
        };

        ExtractedChunk {
            chunk_id: chunk.chunk_id.clone(),
            doc_id: chunk.doc_id.clone(),
            index: chunk.index,
            extraction,
        }
    }

    async fn extract_fresh(&self, chunk: &Chunk) -> PartialExtraction {
        let timer = TimedOperation::start();

        let extraction = match self
            .retry
            .retry("extract_chunk", || self.extractor.try_extract(&chunk.text))
            .await
        {
            Ok(partial) => partial,
            Err(e) => PartialExtraction::failed(format!("LLM request failed: {:#}", e)),
        };

        if extraction.is_error() {
            warn!(
                chunk = chunk.index,
                error = extraction.error.as_deref().unwrap_or_default(),
                "Chunk extraction failed"
            );
        } else {
            info!(
                chunk = chunk.index,
                entities = extraction.entities.len(),
                relationships = extraction.relationships.len(),
                "Extracted chunk"
            );
        }

        self.metrics.record_extract(timer.elapsed(), extraction.is_error());
        if let Some(cache) = &self.cache {
            cache.set_extraction(&chunk.text, &extraction);
        }
        extraction
    }
}

pub struct Pipeline {
    config: AppConfig,
    worker: ChunkWorker,
    synthesizer: TurtleSynthesizer,
    store: OntologyStore,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(config: AppConfig, metrics: Arc<Metrics>) -> Result<Self> {
        let llm = LlmClient::with_timeout(
            config.llm.base_url.clone(),
            config.llm.extraction_model.clone(),
            Duration::from_secs(config.concurrency.request_timeout_secs),
        )?;

        let writer = TurtleWriter::new(config.output.base_iri.clone());
        let synthesizer = match config.output.turtle_mode {
            TurtleMode::Template => TurtleSynthesizer::template(writer),
            TurtleMode::Llm => {
                TurtleSynthesizer::with_llm(llm.for_model(config.llm.synthesis_model.clone()), writer)
            }
        };

        let worker = ChunkWorker {
            extractor: Extractor::new(llm).with_max_repairs(config.llm.max_repairs),
            cache: config
                .cache
                .enabled
                .then(|| Cache::new(config.cache.max_entries)),
            retry: RetryPolicy::from_config(&config.retry),
            metrics: metrics.clone(),
        };

        Ok(Self {
            store: OntologyStore::new(config.output.data_dir.clone()),
            config,
            worker,
            synthesizer,
            metrics,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &OntologyStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.worker.cache.as_ref()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache().map(Cache::stats)
    }

    /// Read and chunk a file or directory.
    pub async fn ingest(&self, path: &Path) -> Result<Vec<Chunk>> {
        let timer = TimedOperation::start();
        let chunks = ingest::ingest_path(path, &self.config.chunking).await?;
        self.metrics.record_ingest(timer.elapsed(), chunks.len());
        Ok(chunks)
    }

    /// Extract every chunk with at most `max_concurrent_extractions` in
    /// flight, saving each partial as it completes. Results come back in
    /// chunk order; a failing chunk yields an error-marked partial.
    pub async fn extract_chunks(&self, chunks: Vec<Chunk>) -> Vec<ExtractedChunk> {
        let semaphore = Arc::new(Semaphore::new(
            self.config.concurrency.max_concurrent_extractions.max(1),
        ));

        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let semaphore = semaphore.clone();
            let worker = self.worker.clone();
            let store = self.store.clone();
            let meta = (chunk.chunk_id.clone(), chunk.doc_id.clone(), chunk.index);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let extracted = worker.extract(&chunk).await;
                if let Err(e) = store.save_partial(&extracted).await {
                    warn!(chunk = extracted.index, error = %e, "Failed to save partial");
                }
                extracted
            });
            handles.push((meta, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for ((chunk_id, doc_id, index), handle) in handles {
            let extracted = handle.await.unwrap_or_else(|e| {
                warn!(chunk = index, error = %e, "Extraction task aborted");
                ExtractedChunk {
                    chunk_id,
                    doc_id,
                    index,
                    extraction: PartialExtraction::failed(format!("Extraction task aborted: {}", e)),
                }
            });
            results.push(extracted);
        }

        results.sort_by_key(|c| c.index);
        results
    }

    /// Merge extracted chunks in chunk order.
    pub fn merge(&self, extracted: &[ExtractedChunk]) -> Result<MergedOntology> {
        let timer = TimedOperation::start();

        let mut ordered: Vec<&ExtractedChunk> = extracted.iter().collect();
        ordered.sort_by_key(|c| c.index);

        let merged = merge::aggregate_indexed(ordered.into_iter().map(|c| (c.index, &c.extraction)))?;

        self.metrics.record_merge(
            timer.elapsed(),
            merged.stats().total_entities,
            merged.stats().total_relationships,
            merged.diagnostics().dropped_relationships.len(),
        );
        Ok(merged)
    }

    pub async fn synthesize(&self, merged: &MergedOntology) -> String {
        let timer = TimedOperation::start();
        let ttl = self.synthesizer.synthesize(merged).await;
        self.metrics.record_synthesis(timer.elapsed());
        ttl
    }

    pub async fn run(&self, path: &Path) -> Result<PipelineReport> {
        self.run_with(path, &RunOptions::default()).await
    }

    pub async fn run_with(&self, path: &Path, options: &RunOptions) -> Result<PipelineReport> {
        info!(source = ?path, mode = ?self.config.mode, "Starting ontology pipeline");

        let chunks = self.ingest(path).await?;
        let chunk_count = chunks.len();

        self.store.clear_partials().await?;
        let extracted = self.extract_chunks(chunks).await;

        let merged = self.merge(&extracted)?;
        let merged_path = self.store.save_merged(&merged).await?;

        let name = ontology_name(path);
        let ttl = self.synthesize(&merged).await;
        let turtle_path = match &options.turtle_path {
            Some(custom) => {
                ontology::store::write_text(custom, &ttl).await?;
                custom.clone()
            }
            None => self.store.save_turtle(&name, &ttl).await?,
        };

        let dot_path = options
            .dot_path
            .clone()
            .unwrap_or_else(|| self.store.dot_path(&name));
        let (dot, graph) = visualize::visualize_turtle(&ttl)
            .context("Generated Turtle could not be visualized")?;
        ontology::store::write_text(&dot_path, &dot).await?;

        let stats = merged.stats();
        let diagnostics = merged.diagnostics();
        let report = PipelineReport {
            source: path.to_path_buf(),
            chunks: chunk_count,
            failed_chunks: diagnostics.failed_chunks.clone(),
            entities: stats.total_entities,
            relationships: stats.total_relationships,
            relationship_types: stats.unique_relationship_types,
            skipped_relationships: diagnostics.skipped_relationships,
            dropped_relationships: diagnostics.dropped_relationships.len(),
            turtle_mode: self.synthesizer.mode(),
            merged_path,
            turtle_path,
            dot_path,
            graph,
        };

        info!(
            chunks = report.chunks,
            failed = report.failed_chunks.len(),
            entities = report.entities,
            relationships = report.relationships,
            turtle = ?report.turtle_path,
            "Pipeline complete"
        );
        Ok(report)
    }

    /// Render an existing Turtle file as DOT.
    pub async fn visualize_existing(&self, turtle_file: &Path, output_dot: Option<&Path>) -> Result<GraphSummary> {
        let dot_path = match output_dot {
            Some(path) => path.to_path_buf(),
            None => self.store.dot_path(&ontology_name(turtle_file)),
        };
        visualize::visualize_file(turtle_file, &dot_path).await
    }
}

/// Output base name: the file stem, minus a trailing `_ontology`.
pub fn ontology_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "ontology".to_string());

    match stem.strip_suffix("_ontology") {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merge::{RawEntity, RawRelationship};

    const DOC: &str = "Aspirin is a drug. Aspirin treats headache.";

    fn test_pipeline(data_dir: &Path) -> Pipeline {
        let mut config = AppConfig::default();
        config.output.data_dir = data_dir.to_path_buf();
        config.retry.max_retries = 0;
        Pipeline::new(config, Metrics::new()).unwrap()
    }

    fn cached_partial() -> PartialExtraction {
        PartialExtraction::new(
            vec![
                RawEntity::named("Aspirin").with_description("A drug."),
                RawEntity::named("Headache"),
            ],
            vec![
                RawRelationship::new("Aspirin", "treats", "Headache"),
                RawRelationship::new("Aspirin", "causes", "Ulcer"),
            ],
        )
    }

    fn extracted(index: usize, name: &str) -> ExtractedChunk {
        ExtractedChunk {
            chunk_id: format!("c{}", index),
            doc_id: "doc".to_string(),
            index,
            extraction: PartialExtraction::new(vec![RawEntity::named(name)], Vec::new()),
        }
    }

    #[test]
    fn test_ontology_name() {
        assert_eq!(ontology_name(Path::new("docs/pharma.pdf")), "pharma");
        assert_eq!(ontology_name(Path::new("out/pharma_ontology.ttl")), "pharma");
        assert_eq!(ontology_name(Path::new("_ontology.ttl")), "_ontology");
    }

    #[test]
    fn test_merge_orders_by_chunk_index() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path());

        let merged = pipeline
            .merge(&[extracted(1, "Second"), extracted(0, "First")])
            .unwrap();

        let names: Vec<_> = merged.entities().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(merged.entity("second").unwrap().source_chunks, vec![1]);
        assert_eq!(pipeline.metrics().snapshot().pipeline_runs, 1);
    }

    #[test]
    fn test_merge_keeps_chunk_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = test_pipeline(dir.path());

        let merged = pipeline.merge(&[extracted(5, "Lone")]).unwrap();

        assert_eq!(merged.entity("lone").unwrap().source_chunks, vec![5]);
    }

    #[tokio::test]
    async fn test_run_from_cached_extractions() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("pharma.txt");
        std::fs::write(&doc, DOC).unwrap();

        let pipeline = test_pipeline(&dir.path().join("data"));
        pipeline
            .cache()
            .unwrap()
            .set_extraction(DOC, &cached_partial());

        let report = pipeline.run(&doc).await.unwrap();

        assert_eq!(report.chunks, 1);
        assert!(report.failed_chunks.is_empty());
        assert_eq!(report.entities, 2);
        assert_eq!(report.relationships, 1);
        assert_eq!(report.dropped_relationships, 1);
        assert_eq!(report.turtle_mode, TurtleMode::Template);

        assert!(pipeline.store().partials_dir().join("partial_0.json").exists());
        assert!(report.merged_path.exists());
        assert!(report.turtle_path.ends_with("ontologies/pharma_ontology.ttl"));
        let dot = std::fs::read_to_string(&report.dot_path).unwrap();
        assert!(dot.starts_with("strict digraph"));
        assert!(report.graph.nodes >= 2);

        let snap = pipeline.metrics().snapshot();
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.total_chunks_processed, 1);
    }

    #[tokio::test]
    async fn test_custom_output_paths() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("pharma.md");
        std::fs::write(&doc, DOC).unwrap();

        let pipeline = test_pipeline(&dir.path().join("data"));
        pipeline
            .cache()
            .unwrap()
            .set_extraction(DOC, &cached_partial());

        let options = RunOptions {
            turtle_path: Some(dir.path().join("out.ttl")),
            dot_path: Some(dir.path().join("out.dot")),
        };
        let report = pipeline.run_with(&doc, &options).await.unwrap();

        assert_eq!(report.turtle_path, dir.path().join("out.ttl"));
        assert!(dir.path().join("out.ttl").exists());
        assert!(dir.path().join("out.dot").exists());
    }

    #[tokio::test]
    async fn test_visualize_existing_uses_store_layout() {
        let dir = tempfile::tempdir().unwrap();
        let ttl = dir.path().join("zoo_ontology.ttl");
        std::fs::write(
            &ttl,
            "@prefix : <http://example.org/zoo#> .\n\
             @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             :Dog a owl:Class .\n",
        )
        .unwrap();

        let pipeline = test_pipeline(&dir.path().join("data"));
        let summary = pipeline.visualize_existing(&ttl, None).await.unwrap();

        assert_eq!(summary.nodes, 1);
        assert!(pipeline.store().dot_path("zoo").exists());
    }
}
