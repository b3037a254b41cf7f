//! Cross-partition aggregation.
//!
//! The component drains its source to completion, folding every row into one
//! aggregator per operator, and then emits a single batch holding the final
//! results. It cannot return before the whole upstream sequence is consumed.
//!
//! Each upstream row is a JSON array aligned with the operators:
//!
//! ```text
//! [{"item": 12}, {"item": {"sum": 40, "count": 5}}, {}]
//! ```
//!
//! An element without `item` is an undefined contribution.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::aggregate::{create_aggregator, AggregateOperator, Aggregator, LocalAggregate};
use crate::errors::{QueryError, QueryResult};
use crate::observability::ObservationScope;

use super::batch::{QueryMetrics, ResultBatch};
use super::cancellation::CancellationToken;
use super::component::{BoxedComponent, DrainFuture, QueryComponent};

/// Page size requested from the source while aggregating.
pub const DEFAULT_AGGREGATE_PAGE_SIZE: usize = i32::MAX as usize;

const ROW_ITEM_FIELD: &str = "item";
const PROJECTED_FIELD: &str = "$1";

/// How aggregate results are shaped in the output batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateProjection {
    /// `SELECT VALUE COUNT(1)`: each result is emitted as-is
    Value,
    /// `SELECT COUNT(1)`: the result is bound to `$1` in an object
    Row,
}

impl AggregateProjection {
    fn project(&self, value: Value) -> Value {
        match self {
            AggregateProjection::Value => value,
            AggregateProjection::Row => {
                let mut row = Map::new();
                row.insert(PROJECTED_FIELD.to_string(), value);
                Value::Object(row)
            }
        }
    }
}

/// Folds the whole upstream sequence into aggregate results.
pub struct AggregateComponent {
    source: BoxedComponent,
    operators: Vec<AggregateOperator>,
    aggregators: Vec<Box<dyn Aggregator>>,
    projection: AggregateProjection,
    page_size: usize,
    emitted: bool,
}

impl AggregateComponent {
    /// One aggregator is created per operator, in order.
    ///
    /// A row projection can hold only one aggregate.
    pub fn new(
        operators: Vec<AggregateOperator>,
        projection: AggregateProjection,
        source: BoxedComponent,
    ) -> QueryResult<Self> {
        if operators.is_empty() {
            return Err(QueryError::bad_request(
                "aggregate component needs at least one aggregate operator",
            ));
        }
        if projection == AggregateProjection::Row && operators.len() > 1 {
            return Err(QueryError::unsupported(
                "only one aggregate function may be bound to a projection",
            ));
        }

        let aggregators = operators.iter().map(|op| create_aggregator(*op)).collect();
        Ok(Self {
            source,
            operators,
            aggregators,
            projection,
            page_size: DEFAULT_AGGREGATE_PAGE_SIZE,
            emitted: false,
        })
    }

    /// Override the page size requested from the source
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn accumulate_row(&mut self, row: &Value) -> QueryResult<()> {
        let partials = match row {
            Value::Array(partials) if partials.len() == self.operators.len() => partials,
            _ => {
                return Err(QueryError::invalid_response(format!(
                    "expected an array of {} aggregate partials, got {}",
                    self.operators.len(),
                    row
                )))
            }
        };

        for ((operator, aggregator), partial) in self
            .operators
            .iter()
            .zip(self.aggregators.iter_mut())
            .zip(partials)
        {
            let raw = match partial {
                Value::Object(map) => map.get(ROW_ITEM_FIELD),
                other => {
                    return Err(QueryError::invalid_response(format!(
                        "aggregate partial must be an object, got {}",
                        other
                    )))
                }
            };
            aggregator.aggregate(LocalAggregate::decode(*operator, raw)?);
        }
        Ok(())
    }

    /// Drain the source until it is done. Returns the metadata of every
    /// drained page and the number of pages and rows seen.
    async fn consume_source(
        &mut self,
        cancellation: &CancellationToken,
    ) -> QueryResult<(ResultBatch, u64, u64)> {
        let mut totals = ResultBatch::empty();
        let mut pages = 0u64;
        let mut rows = 0u64;

        while !self.source.is_done() {
            cancellation.check()?;
            let batch = self.source.drain(self.page_size, cancellation).await?;
            pages += 1;
            for row in &batch.items {
                self.accumulate_row(row)?;
                rows += 1;
            }
            totals.absorb_metadata(&batch);
        }
        Ok((totals, pages, rows))
    }
}

impl QueryComponent for AggregateComponent {
    fn is_done(&self) -> bool {
        self.emitted
    }

    /// The requested size is ignored: the result is always a single batch.
    fn drain<'a>(
        &'a mut self,
        _max_elements: usize,
        cancellation: &'a CancellationToken,
    ) -> DrainFuture<'a> {
        Box::pin(async move {
            cancellation.check()?;
            if self.emitted {
                return Ok(ResultBatch::empty());
            }

            let scope = ObservationScope::with_fields(
                "AGGREGATE_DRAIN",
                vec![("operators", self.operators.len().to_string())],
            );
            let (mut output, pages, rows) = match self.consume_source(cancellation).await {
                Ok(consumed) => consumed,
                Err(e) => {
                    scope.fail(e.message());
                    return Err(e);
                }
            };

            output.items = self
                .aggregators
                .iter()
                .filter_map(|aggregator| aggregator.result().into_option())
                .map(|value| self.projection.project(value))
                .collect();
            output.continuation = None;
            self.emitted = true;

            let pages = pages.to_string();
            let results = output.items.len().to_string();
            let rows = rows.to_string();
            scope.complete(&[
                ("pages", pages.as_str()),
                ("results", results.as_str()),
                ("rows", rows.as_str()),
            ]);
            Ok(output)
        })
    }

    fn stop(&mut self) {
        self.source.stop();
    }

    fn query_metrics(&self) -> BTreeMap<String, QueryMetrics> {
        self.source.query_metrics()
    }

    fn dispose(&mut self) {
        self.source.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorCode;
    use crate::pipeline::replay::ReplaySource;
    use serde_json::json;

    fn source(pages: Vec<Vec<Value>>) -> BoxedComponent {
        Box::new(ReplaySource::new(pages.into_iter().map(ResultBatch::new).collect()))
    }

    #[tokio::test]
    async fn test_count_across_pages() {
        let cancel = CancellationToken::new();
        let rows = vec![
            vec![json!([{"item": 3}]), json!([{"item": 4}])],
            vec![json!([{"item": 5}])],
        ];
        let mut agg =
            AggregateComponent::new(vec![AggregateOperator::Count], AggregateProjection::Value, source(rows))
                .unwrap();

        assert!(!agg.is_done());
        let batch = agg.drain(1, &cancel).await.unwrap();
        assert_eq!(batch.items, vec![json!(12)]);
        assert_eq!(batch.continuation, None);
        assert!(agg.is_done());
    }

    #[tokio::test]
    async fn test_undefined_results_are_dropped() {
        let cancel = CancellationToken::new();
        let rows = vec![vec![json!([{"item": 2}, {}])]];
        let mut agg = AggregateComponent::new(
            vec![AggregateOperator::Count, AggregateOperator::Sum],
            AggregateProjection::Value,
            source(rows),
        )
        .unwrap();

        let batch = agg.drain(10, &cancel).await.unwrap();
        assert_eq!(batch.items, vec![json!(2)]);
    }

    #[tokio::test]
    async fn test_row_projection() {
        let cancel = CancellationToken::new();
        let rows = vec![vec![json!([{"item": {"sum": 9, "count": 3}}])]];
        let mut agg =
            AggregateComponent::new(vec![AggregateOperator::Average], AggregateProjection::Row, source(rows))
                .unwrap();
        let batch = agg.drain(10, &cancel).await.unwrap();
        assert_eq!(batch.items, vec![json!({"$1": 3.0})]);
    }

    #[test]
    fn test_multiple_aggregates_in_row_projection_unsupported() {
        let err = AggregateComponent::new(
            vec![AggregateOperator::Min, AggregateOperator::Max],
            AggregateProjection::Row,
            source(vec![]),
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), QueryErrorCode::Unsupported);
        assert!(err.message().contains("only one aggregate function"));
    }

    #[tokio::test]
    async fn test_malformed_row_is_invalid_response() {
        let cancel = CancellationToken::new();
        let rows = vec![vec![json!({"item": 1})]];
        let mut agg =
            AggregateComponent::new(vec![AggregateOperator::Count], AggregateProjection::Value, source(rows))
                .unwrap();
        let err = agg.drain(10, &cancel).await.unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::InvalidResponse);
        assert!(!agg.is_done());
    }

    #[tokio::test]
    async fn test_cancellation_yields_no_partial_result() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut agg = AggregateComponent::new(
            vec![AggregateOperator::Count],
            AggregateProjection::Value,
            source(vec![vec![json!([{"item": 1}])]]),
        )
        .unwrap();
        let err = agg.drain(10, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!agg.is_done());
    }

    #[tokio::test]
    async fn test_metadata_accumulates() {
        let cancel = CancellationToken::new();
        let mut first = ResultBatch::new(vec![json!([{"item": 1}])]);
        first.request_charge = 2.0;
        first.contacted_replicas.insert("r1".into());
        let mut second = ResultBatch::new(vec![json!([{"item": 1}])]);
        second.request_charge = 3.0;
        second.response_length_bytes = 64;
        second.contacted_replicas.insert("r2".into());

        let mut agg = AggregateComponent::new(
            vec![AggregateOperator::Count],
            AggregateProjection::Value,
            Box::new(ReplaySource::new(vec![first, second])),
        )
        .unwrap();
        let batch = agg.drain(10, &cancel).await.unwrap();
        assert_eq!(batch.request_charge, 5.0);
        assert_eq!(batch.response_length_bytes, 64);
        assert_eq!(batch.contacted_replicas.len(), 2);
    }
}
