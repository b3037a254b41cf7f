//! Result batches and the metadata carried through every component

use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-partition execution metrics. All fields are additive; counters
/// saturate at `u64::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryMetrics {
    /// Documents read by the partition
    pub retrieved_document_count: u64,
    /// Bytes of documents read by the partition
    pub retrieved_document_size: u64,
    /// Documents emitted by the partition
    pub output_document_count: u64,
    /// Documents served from the index
    pub index_hit_document_count: u64,
    /// Server-side execution time in milliseconds
    pub total_execution_time_ms: f64,
}

impl AddAssign<&QueryMetrics> for QueryMetrics {
    fn add_assign(&mut self, other: &QueryMetrics) {
        self.retrieved_document_count = self
            .retrieved_document_count
            .saturating_add(other.retrieved_document_count);
        self.retrieved_document_size = self
            .retrieved_document_size
            .saturating_add(other.retrieved_document_size);
        self.output_document_count = self
            .output_document_count
            .saturating_add(other.output_document_count);
        self.index_hit_document_count = self
            .index_hit_document_count
            .saturating_add(other.index_hit_document_count);
        self.total_execution_time_ms += other.total_execution_time_ms;
    }
}

/// Add every partition's metrics from `from` into `into`
pub fn merge_query_metrics(
    into: &mut BTreeMap<String, QueryMetrics>,
    from: &BTreeMap<String, QueryMetrics>,
) {
    for (partition_id, metrics) in from {
        *into.entry(partition_id.clone()).or_default() += metrics;
    }
}

/// One batch of results with its response metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBatch {
    /// Items in result order
    pub items: Vec<Value>,
    /// Accumulated request charge
    #[serde(default)]
    pub request_charge: f64,
    /// Accumulated response size in bytes
    #[serde(default)]
    pub response_length_bytes: u64,
    /// Metrics keyed by partition id
    #[serde(default)]
    pub query_metrics: BTreeMap<String, QueryMetrics>,
    /// Replicas contacted while producing the batch
    #[serde(default)]
    pub contacted_replicas: BTreeSet<String>,
    /// Continuation to resume after this batch; `None` once the query is done
    #[serde(default)]
    pub continuation: Option<String>,
    /// The continuation was deliberately withheld and must not be replaced
    #[serde(default)]
    pub disallow_continuation: bool,
}

impl ResultBatch {
    /// A batch with `items` and no metadata
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// A batch with no items and no metadata
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fold `other`'s charge, size, metrics and replicas into this batch.
    /// Items and continuation are left alone.
    pub fn absorb_metadata(&mut self, other: &ResultBatch) {
        self.request_charge += other.request_charge;
        self.response_length_bytes = self
            .response_length_bytes
            .saturating_add(other.response_length_bytes);
        merge_query_metrics(&mut self.query_metrics, &other.query_metrics);
        self.contacted_replicas
            .extend(other.contacted_replicas.iter().cloned());
    }
}
