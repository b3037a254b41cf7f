//! Cross-partition ORDER BY support
//!
//! A merge driver keeps one cursor per partition and repeatedly emits the
//! smallest cursor's current result. [`OrderByComparator`] decides which
//! cursor is smallest; it never advances cursors itself.

mod comparator;
mod cursor;

pub use comparator::{OrderByComparator, SortOrder};
pub use cursor::{OrderByResult, PartitionCursor, PartitionKeyRange, RecordedCursor};
