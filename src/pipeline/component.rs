//! The contract shared by every pipeline component and its source.

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;

use crate::errors::QueryResult;

use super::batch::{QueryMetrics, ResultBatch};
use super::cancellation::CancellationToken;

/// Future returned by [`QueryComponent::drain`]
pub type DrainFuture<'a> = BoxFuture<'a, QueryResult<ResultBatch>>;

/// A stage of the query pipeline.
///
/// Components wrap another component (their source) and forward `stop`,
/// `dispose` and `query_metrics` to it, so stages stack in any order.
/// A component is driven by one caller at a time.
pub trait QueryComponent: Send {
    /// No further batches will be produced
    fn is_done(&self) -> bool;

    /// Produce the next batch. Cancellation is checked before any work.
    fn drain<'a>(
        &'a mut self,
        max_elements: usize,
        cancellation: &'a CancellationToken,
    ) -> DrainFuture<'a>;

    /// Stop producing results
    fn stop(&mut self);

    /// Metrics gathered so far, keyed by partition id
    fn query_metrics(&self) -> BTreeMap<String, QueryMetrics>;

    /// Release resources held by the component and its sources
    fn dispose(&mut self);
}

/// An owned, type-erased component
pub type BoxedComponent = Box<dyn QueryComponent>;
