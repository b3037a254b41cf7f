//! In-memory source that replays recorded result pages.
//!
//! Page `i`'s continuation is `"page:{i + 1}"` while pages remain, so a
//! replay can be resumed from any continuation it issued.

use std::collections::BTreeMap;

use crate::errors::{QueryError, QueryResult};

use super::batch::{merge_query_metrics, QueryMetrics, ResultBatch};
use super::cancellation::CancellationToken;
use super::component::{DrainFuture, QueryComponent};

const PAGE_TOKEN_PREFIX: &str = "page:";

/// Replays recorded pages in order. Pages are returned whole; the requested
/// size is not used to re-split them.
#[derive(Debug)]
pub struct ReplaySource {
    pages: Vec<ResultBatch>,
    next_page: usize,
    metrics: BTreeMap<String, QueryMetrics>,
    stopped: bool,
}

impl ReplaySource {
    /// Replay from the first page
    pub fn new(pages: Vec<ResultBatch>) -> Self {
        Self {
            pages,
            next_page: 0,
            metrics: BTreeMap::new(),
            stopped: false,
        }
    }

    /// Replay from the page named by `continuation`
    pub fn resume(pages: Vec<ResultBatch>, continuation: Option<&str>) -> QueryResult<Self> {
        let mut source = Self::new(pages);
        if let Some(token) = continuation {
            source.next_page = Self::parse_page_token(token)
                .filter(|page| *page <= source.pages.len())
                .ok_or_else(|| {
                    QueryError::bad_request(format!("invalid replay continuation '{}'", token))
                })?;
        }
        Ok(source)
    }

    /// Continuation that resumes at page `index`
    pub fn page_token(index: usize) -> String {
        format!("{}{}", PAGE_TOKEN_PREFIX, index)
    }

    fn parse_page_token(token: &str) -> Option<usize> {
        token.strip_prefix(PAGE_TOKEN_PREFIX)?.parse().ok()
    }

    /// Pages not yet drained
    pub fn pages_remaining(&self) -> usize {
        self.pages.len() - self.next_page
    }
}

impl QueryComponent for ReplaySource {
    fn is_done(&self) -> bool {
        self.stopped || self.next_page >= self.pages.len()
    }

    fn drain<'a>(
        &'a mut self,
        _max_elements: usize,
        cancellation: &'a CancellationToken,
    ) -> DrainFuture<'a> {
        Box::pin(async move {
            cancellation.check()?;
            if self.is_done() {
                return Ok(ResultBatch::empty());
            }

            let mut batch = self.pages[self.next_page].clone();
            self.next_page += 1;
            merge_query_metrics(&mut self.metrics, &batch.query_metrics);

            if !batch.disallow_continuation {
                batch.continuation = if self.is_done() {
                    None
                } else {
                    Some(Self::page_token(self.next_page))
                };
            }
            Ok(batch)
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
    }

    fn query_metrics(&self) -> BTreeMap<String, QueryMetrics> {
        self.metrics.clone()
    }

    fn dispose(&mut self) {
        self.pages.clear();
        self.next_page = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorded() -> Vec<ResultBatch> {
        vec![
            ResultBatch::new(vec![json!("a")]),
            ResultBatch::new(vec![json!("b")]),
        ]
    }

    #[tokio::test]
    async fn test_replays_in_order_with_page_tokens() {
        let cancel = CancellationToken::new();
        let mut source = ReplaySource::new(recorded());

        let first = source.drain(100, &cancel).await.unwrap();
        assert_eq!(first.items, vec![json!("a")]);
        assert_eq!(first.continuation.as_deref(), Some("page:1"));

        let second = source.drain(100, &cancel).await.unwrap();
        assert_eq!(second.items, vec![json!("b")]);
        assert_eq!(second.continuation, None);
        assert!(source.is_done());
    }

    #[test]
    fn test_resume_validation() {
        let source = ReplaySource::resume(recorded(), Some("page:1")).unwrap();
        assert_eq!(source.pages_remaining(), 1);

        assert!(ReplaySource::resume(recorded(), Some("page:3")).is_err());
        assert!(ReplaySource::resume(recorded(), Some("offset:1")).is_err());
    }

    #[tokio::test]
    async fn test_metrics_accumulate() {
        let cancel = CancellationToken::new();
        let mut pages = recorded();
        for page in &mut pages {
            page.query_metrics.insert(
                "p0".into(),
                QueryMetrics {
                    retrieved_document_count: 2,
                    ..QueryMetrics::default()
                },
            );
        }
        let mut source = ReplaySource::new(pages);
        source.drain(1, &cancel).await.unwrap();
        source.drain(1, &cancel).await.unwrap();
        assert_eq!(source.query_metrics()["p0"].retrieved_document_count, 4);
    }

    #[test]
    fn test_stop_marks_done() {
        let mut source = ReplaySource::new(recorded());
        assert!(!source.is_done());
        source.stop();
        assert!(source.is_done());
    }
}
