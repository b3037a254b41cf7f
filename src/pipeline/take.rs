//! TOP / LIMIT: caps the total number of items returned across batches.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event_with_fields, Event, Logger};

use super::batch::{QueryMetrics, ResultBatch};
use super::cancellation::CancellationToken;
use super::component::{BoxedComponent, DrainFuture, QueryComponent};
use super::continuation::{ContinuationToken, TokenField};

/// Which clause produced the cap. Only the token field name differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitFlavor {
    /// `LIMIT n`
    Limit,
    /// `TOP n`
    Top,
}

impl LimitFlavor {
    fn token_field(&self) -> TokenField {
        match self {
            LimitFlavor::Limit => TokenField::Limit,
            LimitFlavor::Top => TokenField::Top,
        }
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        self.token_field().as_str()
    }
}

impl fmt::Display for LimitFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LimitFlavor {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "limit" => Ok(LimitFlavor::Limit),
            "top" => Ok(LimitFlavor::Top),
            _ => Err(QueryError::invariant_violation(format!(
                "unknown limit flavor '{}'",
                s
            ))),
        }
    }
}

/// Returns at most `count` items of its source.
pub struct TakeComponent {
    source: BoxedComponent,
    flavor: LimitFlavor,
    take_count: u64,
}

impl TakeComponent {
    /// Build the component, resuming from `continuation` if given.
    ///
    /// Validation matches [`SkipComponent::create`](super::SkipComponent::create):
    /// the token must decode and its remaining count may not exceed `count`.
    pub async fn create<F, Fut>(
        flavor: LimitFlavor,
        count: u64,
        continuation: Option<&str>,
        source_factory: F,
    ) -> QueryResult<Self>
    where
        F: FnOnce(Option<String>) -> Fut,
        Fut: Future<Output = QueryResult<BoxedComponent>>,
    {
        let token = ContinuationToken::resume(continuation, flavor.token_field(), count)?;
        let source = source_factory(token.source_token).await?;
        Ok(Self {
            source,
            flavor,
            take_count: token.remaining,
        })
    }

    /// Items still allowed
    pub fn remaining(&self) -> u64 {
        self.take_count
    }

    pub fn flavor(&self) -> LimitFlavor {
        self.flavor
    }
}

impl QueryComponent for TakeComponent {
    fn is_done(&self) -> bool {
        self.take_count == 0 || self.source.is_done()
    }

    fn drain<'a>(
        &'a mut self,
        max_elements: usize,
        cancellation: &'a CancellationToken,
    ) -> DrainFuture<'a> {
        Box::pin(async move {
            cancellation.check()?;
            if self.take_count == 0 {
                return Ok(ResultBatch::empty());
            }

            let mut batch = self.source.drain(max_elements, cancellation).await?;

            let kept = batch.items.len().min(self.take_count as usize);
            batch.items.truncate(kept);
            self.take_count -= kept as u64;

            if !batch.disallow_continuation {
                batch.continuation = if self.is_done() {
                    None
                } else {
                    let token = ContinuationToken::new(self.take_count, batch.continuation.take());
                    Some(token.encode(self.flavor.token_field()))
                };
            }

            if Logger::enabled(Event::BatchDrained.severity()) {
                let remaining = self.take_count.to_string();
                let kept = kept.to_string();
                log_event_with_fields(
                    Event::BatchDrained,
                    &[
                        ("component", self.flavor.as_str()),
                        ("kept", kept.as_str()),
                        ("remaining", remaining.as_str()),
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
