//! OFFSET: discards a bounded number of leading items across batches.

use std::collections::BTreeMap;
use std::future::Future;

use crate::errors::QueryResult;
use crate::observability::{log_event_with_fields, Event, Logger};

use super::batch::QueryMetrics;
use super::cancellation::CancellationToken;
use super::component::{BoxedComponent, DrainFuture, QueryComponent};
use super::continuation::{ContinuationToken, TokenField};

/// Skips the first `offset` items of its source.
pub struct SkipComponent {
    source: BoxedComponent,
    skip_count: u64,
}

impl SkipComponent {
    /// Build the component, resuming from `continuation` if given.
    ///
    /// `source_factory` receives the source's own continuation extracted from
    /// the token. A token that does not decode or whose remaining count
    /// exceeds `offset_count` fails with a bad request before the source is
    /// created.
    pub async fn create<F, Fut>(
        offset_count: u64,
        continuation: Option<&str>,
        source_factory: F,
    ) -> QueryResult<Self>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = QueryResult<BoxedComponent>>,
    {
        let token = ContinuationToken::resume(continuation, TokenField::Offset, offset_count)?;
        let source = source_factory(token.source_token).await?;
        Ok(Self {
            source,
            skip_count: token.remaining,
        })
    }

    /// Items still to be skipped
    pub fn remaining(&self) -> u64 {
        self.skip_count
    }
}

impl QueryComponent for SkipComponent {
    fn is_done(&self) -> bool {
        self.source.is_done()
    }

    fn drain<'a>(
        &'a mut self,
        max_elements: usize,
        cancellation: &'a CancellationToken,
    ) -> DrainFuture<'a> {
        Box::pin(async move {
            cancellation.check()?;
            let mut batch = self.source.drain(max_elements, cancellation).await?;

            let skipped = batch.items.len().min(self.skip_count as usize);
            batch.items.drain(..skipped);
            self.skip_count -= skipped as u64;

            if !batch.disallow_continuation {
                batch.continuation = if self.source.is_done() {
                    None
                } else {
                    let token = ContinuationToken::new(self.skip_count, batch.continuation.take());
                    Some(token.encode(TokenField::Offset))
                };
            }

            if Logger::enabled(Event::BatchDrained.severity()) {
                let remaining = self.skip_count.to_string();
                let skipped = skipped.to_string();
                log_event_with_fields(
                    Event::BatchDrained,
                    &[
                        ("component", "offset"),
                        ("remaining", remaining.as_str()),
                        ("skipped", skipped.as_str()),
                    ],
                );
            }
            Ok(batch)
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
