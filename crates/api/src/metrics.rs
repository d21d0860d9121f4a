use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    pipeline_runs: AtomicUsize,

    // Timing (in microseconds)
    total_ingest_time_us: AtomicU64,
    total_extract_time_us: AtomicU64,
    total_merge_time_us: AtomicU64,
    total_synthesis_time_us: AtomicU64,

    // Counts
    total_chunks_processed: AtomicUsize,
    failed_extractions: AtomicUsize,
    cache_hits: AtomicUsize,
    total_entities_merged: AtomicUsize,
    total_relationships_merged: AtomicUsize,
    total_relationships_dropped: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_ingest(&self, duration: Duration, chunks: usize) {
        add_micros(&self.total_ingest_time_us, duration);
        self.total_chunks_processed.fetch_add(chunks, Ordering::Relaxed);
    }

    pub fn record_extract(&self, duration: Duration, failed: bool) {
        add_micros(&self.total_extract_time_us, duration);
        if failed {
            self.failed_extractions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merge(&self, duration: Duration, entities: usize, relationships: usize, dropped: usize) {
        add_micros(&self.total_merge_time_us, duration);
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);
        self.total_entities_merged.fetch_add(entities, Ordering::Relaxed);
        self.total_relationships_merged.fetch_add(relationships, Ordering::Relaxed);
        self.total_relationships_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub fn record_synthesis(&self, duration: Duration) {
        add_micros(&self.total_synthesis_time_us, duration);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let chunks = self.total_chunks_processed.load(Ordering::Relaxed);
        let runs = self.pipeline_runs.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            pipeline_runs: runs,
            avg_ingest_time_ms: avg_time_ms(&self.total_ingest_time_us, runs),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, chunks),
            avg_merge_time_ms: avg_time_ms(&self.total_merge_time_us, runs),
            avg_synthesis_time_ms: avg_time_ms(&self.total_synthesis_time_us, runs),
            total_chunks_processed: chunks,
            failed_extractions: self.failed_extractions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            total_entities_merged: self.total_entities_merged.load(Ordering::Relaxed),
            total_relationships_merged: self.total_relationships_merged.load(Ordering::Relaxed),
            total_relationships_dropped: self.total_relationships_dropped.load(Ordering::Relaxed),
        }
    }
}

fn add_micros(total: &AtomicU64, duration: Duration) {
    total.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    if count > 0 {
        total / count as f64 / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub pipeline_runs: usize,
    pub avg_ingest_time_ms: f64,
    pub avg_extract_time_ms: f64,
    pub avg_merge_time_ms: f64,
    pub avg_synthesis_time_ms: f64,
    pub total_chunks_processed: usize,
    pub failed_extractions: usize,
    pub cache_hits: usize,
    pub total_entities_merged: usize,
    pub total_relationships_merged: usize,
    pub total_relationships_dropped: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
