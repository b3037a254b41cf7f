//! AVG as a weighted average, so partial averages over batches of different
//! sizes combine exactly.

use serde_json::Value;

use crate::errors::{QueryError, QueryResult};

use super::local::LocalAggregate;
use super::{number_value, AggregateValue, Aggregator};

/// Running `{sum, count}` pair.
///
/// Counts always add. Once either side's sum is undefined the combined sum
/// stays undefined, while the count keeps accumulating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedAverage {
    sum: Option<f64>,
    count: u64,
}

impl WeightedAverage {
    /// Creates a state from its parts
    pub fn new(sum: Option<f64>, count: u64) -> Self {
        Self { sum, count }
    }

    /// The `{sum: 0, count: 0}` starting state
    pub fn zero() -> Self {
        Self::new(Some(0.0), 0)
    }

    /// Decode the `{"sum": n?, "count": c}` wire shape. A missing or
    /// non-numeric `sum` is undefined; `count` is required.
    pub fn from_value(value: &Value) -> QueryResult<Self> {
        let map = value.as_object().ok_or_else(|| {
            QueryError::invalid_response(format!("partial average must be an object, got {}", value))
        })?;
        let count = map.get("count").and_then(Value::as_u64).ok_or_else(|| {
            QueryError::invalid_response(format!(
                "partial average needs a non-negative integer count, got {}",
                value
            ))
        })?;
        let sum = map.get("sum").and_then(Value::as_f64);
        Ok(Self::new(sum, count))
    }

    /// Fold `other` into this state. A count that overflows leaves the sum
    /// undefined.
    pub fn combine(&mut self, other: WeightedAverage) {
        let count = self.count.checked_add(other.count);
        self.count = count.unwrap_or(u64::MAX);
        self.sum = match (self.sum, other.sum, count) {
            (Some(a), Some(b), Some(_)) => Some(a + b),
            _ => None,
        };
    }

    /// Running sum, `None` once undefined
    pub fn sum(&self) -> Option<f64> {
        self.sum
    }

    /// Running count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// `sum / count`, or `None` if the sum is undefined or nothing was counted
    pub fn average(&self) -> Option<f64> {
        match self.sum {
            Some(sum) if self.count > 0 => Some(sum / self.count as f64),
            _ => None,
        }
    }
}

/// AVG aggregator
#[derive(Debug)]
pub struct AverageAggregator {
    state: WeightedAverage,
}

impl AverageAggregator {
    pub fn new() -> Self {
        Self {
            state: WeightedAverage::zero(),
        }
    }
}

impl Default for AverageAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator for AverageAggregator {
    fn aggregate(&mut self, local: LocalAggregate) {
        let partial = match local {
            LocalAggregate::PartialAverage(partial) => partial,
            LocalAggregate::Undefined
            | LocalAggregate::Scalar(_)
            | LocalAggregate::PartialMinMax { .. } => WeightedAverage::new(None, 0),
        };
        self.state.combine(partial);
    }

    fn result(&self) -> AggregateValue {
        match self.state.average() {
            Some(avg) => number_value(avg),
            None => AggregateValue::Undefined,
        }
    }
}
