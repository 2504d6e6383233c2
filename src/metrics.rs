use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    queries_answered: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingested document and the number of chunks indexed for it.
    pub fn record_ingest(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a completed query.
    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested since startup.
    pub documents_ingested: u64,
    /// Total chunk count indexed across all documents.
    pub chunks_indexed: u64,
    /// Number of queries answered since startup.
    pub queries_answered: u64,
}
