//! Total order over partition cursors for the cross-partition ORDER BY merge.
//!
//! Ordering rules, in priority:
//! 1. A cursor is equal to itself
//! 2. Exhausted cursors sort after cursors that still have results
//! 3. Two exhausted cursors order by partition lower bound
//! 4. Current sort keys, column by column, each in its own direction
//! 5. Ties order by partition lower bound, so the leftmost partition wins

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event_with_fields, Event};
use crate::value::{compare_values, ValueCategory};

use super::cursor::{OrderByResult, PartitionCursor};

/// Sort direction of one ORDER BY column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(alias = "asc", alias = "ASC")]
    Ascending,
    #[serde(alias = "desc", alias = "DESC")]
    Descending,
}

impl SortOrder {
    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Compares partition cursors by their current ORDER BY keys.
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone)]
pub struct OrderByComparator {
    sort_orders: Vec<SortOrder>,
    type_guard: bool,
}

impl OrderByComparator {
    /// `sort_orders` must name at least one column.
    ///
    /// With `type_guard` on, comparing keys of different categories in the
    /// same column is rejected instead of ordered.
    pub fn new(sort_orders: Vec<SortOrder>, type_guard: bool) -> QueryResult<Self> {
        if sort_orders.is_empty() {
            return Err(QueryError::bad_request(
                "order-by comparator needs at least one sort order",
            ));
        }
        Ok(Self {
            sort_orders,
            type_guard,
        })
    }

    /// Comparator with the type guard taken from `config`
    pub fn from_config(sort_orders: Vec<SortOrder>, config: &PipelineConfig) -> QueryResult<Self> {
        Self::new(sort_orders, config.order_by_type_guard)
    }

    /// Order two cursors for the merge. `Less` means `a` is emitted first.
    pub fn compare<C>(&self, a: &C, b: &C) -> QueryResult<Ordering>
    where
        C: PartitionCursor + ?Sized,
    {
        if std::ptr::eq(a, b) {
            return Ok(Ordering::Equal);
        }

        match (a.has_more_results(), b.has_more_results()) {
            (true, false) => return Ok(Ordering::Less),
            (false, true) => return Ok(Ordering::Greater),
            (false, false) => return Ok(Self::compare_ranges(a, b)),
            (true, true) => {}
        }

        let a_keys = self.current_keys(a)?;
        let b_keys = self.current_keys(b)?;

        if self.type_guard {
            Self::check_type_homogeneity(a_keys, b_keys)?;
        }

        for ((order, a_key), b_key) in self.sort_orders.iter().zip(a_keys).zip(b_keys) {
            let ordering = compare_values(a_key, b_key);
            if ordering != Ordering::Equal {
                return Ok(order.apply(ordering));
            }
        }

        Ok(Self::compare_ranges(a, b))
    }

    fn compare_ranges<C>(a: &C, b: &C) -> Ordering
    where
        C: PartitionCursor + ?Sized,
    {
        a.partition_range()
            .min_inclusive
            .cmp(&b.partition_range().min_inclusive)
    }

    fn current_keys<'c, C>(&self, cursor: &'c C) -> QueryResult<&'c [Value]>
    where
        C: PartitionCursor + ?Sized,
    {
        let current: &OrderByResult = cursor.current().ok_or_else(|| {
            QueryError::invariant_violation(format!(
                "partition {} reports more results but has no current result",
                cursor.partition_range().id
            ))
        })?;

        if current.order_by_items.len() != self.sort_orders.len() {
            return Err(QueryError::invalid_response(format!(
                "partition {} returned {} order-by values for {} sort columns",
                cursor.partition_range().id,
                current.order_by_items.len(),
                self.sort_orders.len()
            )));
        }
        Ok(current.order_by_items.as_slice())
    }

    /// Cross-partition merges over mixed primitive types cannot be ordered
    /// correctly, so each column must hold the same category on both sides.
    fn check_type_homogeneity(a_keys: &[Value], b_keys: &[Value]) -> QueryResult<()> {
        for (a_key, b_key) in a_keys.iter().zip(b_keys) {
            let expected = ValueCategory::of(a_key);
            let actual = ValueCategory::of(b_key);
            if expected != actual {
                let rendered = b_key.to_string();
                log_event_with_fields(
                    Event::OrderByTypeMismatch,
                    &[
                        ("actual", actual.as_str()),
                        ("expected", expected.as_str()),
                        ("value", rendered.as_str()),
                    ],
                );
                return Err(QueryError::unsupported(format!(
                    "cross-partition order-by over mixed types is not supported: \
                     expected {}, found {} for value {}",
                    expected, actual, rendered
                )));
            }
        }
        Ok(())
    }
}
