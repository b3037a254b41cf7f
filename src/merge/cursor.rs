//! Per-partition cursors as seen by the order-by merge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key-space interval owned by one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyRange {
    /// Partition id
    pub id: String,
    /// Inclusive lower bound; orders partitions left to right
    pub min_inclusive: String,
    /// Exclusive upper bound
    pub max_exclusive: String,
}

impl PartitionKeyRange {
    pub fn new(
        id: impl Into<String>,
        min_inclusive: impl Into<String>,
        max_exclusive: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            min_inclusive: min_inclusive.into(),
            max_exclusive: max_exclusive.into(),
        }
    }
}

/// A result row with its projected sort-column values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByResult {
    /// One value per sort column, in ORDER BY order
    pub order_by_items: Vec<Value>,
    /// The projected document
    #[serde(default)]
    pub payload: Value,
}

impl OrderByResult {
    pub fn new(order_by_items: Vec<Value>, payload: Value) -> Self {
        Self {
            order_by_items,
            payload,
        }
    }
}

/// Cursor over one partition's ordered results
pub trait PartitionCursor {
    /// The cursor has a current result
    fn has_more_results(&self) -> bool;

    /// The current result; `Some` whenever `has_more_results` is true
    fn current(&self) -> Option<&OrderByResult>;

    /// The partition the cursor reads from
    fn partition_range(&self) -> &PartitionKeyRange;
}

/// Cursor over results already fetched from one partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedCursor {
    range: PartitionKeyRange,
    results: Vec<OrderByResult>,
    #[serde(skip)]
    position: usize,
}

impl RecordedCursor {
    pub fn new(range: PartitionKeyRange, results: Vec<OrderByResult>) -> Self {
        Self {
            range,
            results,
            position: 0,
        }
    }

    /// Move to the next result. Returns false once exhausted.
    pub fn advance(&mut self) -> bool {
        if self.position < self.results.len() {
            self.position += 1;
        }
        self.has_more_results()
    }
}

impl PartitionCursor for RecordedCursor {
    fn has_more_results(&self) -> bool {
        self.position < self.results.len()
    }

    fn current(&self) -> Option<&OrderByResult> {
        self.results.get(self.position)
    }

    fn partition_range(&self) -> &PartitionKeyRange {
        &self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recorded_cursor_walks_results() {
        let mut cursor = RecordedCursor::new(
            PartitionKeyRange::new("0", "", "FF"),
            vec![
                OrderByResult::new(vec![json!(1)], json!({"id": "a"})),
                OrderByResult::new(vec![json!(2)], json!({"id": "b"})),
            ],
        );

        assert!(cursor.has_more_results());
        assert_eq!(cursor.current().unwrap().payload["id"], "a");
        assert!(cursor.advance());
        assert_eq!(cursor.current().unwrap().payload["id"], "b");
        assert!(!cursor.advance());
        assert!(cursor.current().is_none());
        assert!(!cursor.advance());
    }

    #[test]
    fn test_deserialize_cursor() {
        let cursor: RecordedCursor = serde_json::from_value(json!({
            "range": {"id": "1", "min_inclusive": "80", "max_exclusive": "FF"},
            "results": [{"order_by_items": ["x"]}]
        }))
        .unwrap();
        assert_eq!(cursor.partition_range().id, "1");
        assert_eq!(cursor.current().unwrap().payload, json!(null));
    }
}
