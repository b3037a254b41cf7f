//! Cross-partition query execution pipeline
//!
//! Components are decorators over an upstream [`QueryComponent`]. A plan
//! builder stacks them in whatever order the query needs, for example:
//!
//! ```text
//! TakeComponent -> SkipComponent -> AggregateComponent -> merged partitions
//! ```
//!
//! # Continuations
//!
//! Offset and limit carry their remaining count in the continuation they
//! emit, wrapping the continuation of their source. A resumed component
//! rejects a token whose count exceeds the count of the current query.
//!
//! # Cancellation
//!
//! Every drain checks the shared [`CancellationToken`] before doing any work
//! and passes it to its source, so a single cancel reaches every stage.

mod aggregate;
mod batch;
mod cancellation;
mod component;
mod continuation;
mod replay;
mod skip;
mod take;

pub use aggregate::{AggregateComponent, AggregateProjection, DEFAULT_AGGREGATE_PAGE_SIZE};
pub use batch::{merge_query_metrics, QueryMetrics, ResultBatch};
pub use cancellation::CancellationToken;
pub use component::{BoxedComponent, DrainFuture, QueryComponent};
pub use continuation::{ContinuationToken, TokenDecodeError, TokenField};
pub use replay::ReplaySource;
pub use skip::SkipComponent;
pub use take::{LimitFlavor, TakeComponent};
