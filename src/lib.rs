//! aeroquery - cross-partition query result pipeline
//!
//! Merges per-partition query results into one logical answer stream:
//! aggregation across continuations, OFFSET and LIMIT/TOP with resumable
//! continuation tokens, and the cursor ordering used by ORDER BY merges.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod errors;
pub mod merge;
pub mod observability;
pub mod pipeline;
pub mod value;

pub use config::{ConfigError, PipelineConfig};
pub use errors::{QueryError, QueryErrorCode, QueryResult};
