//! COUNT: sums the per-partition counts.

use serde_json::Value;

use super::local::LocalAggregate;
use super::{AggregateValue, Aggregator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountState {
    Running(u64),
    /// The total no longer fits in a `u64`
    Overflowed,
}

/// COUNT aggregator. Undefined only once the total overflows.
#[derive(Debug)]
pub struct CountAggregator {
    state: CountState,
}

impl CountAggregator {
    pub fn new() -> Self {
        Self {
            state: CountState::Running(0),
        }
    }
}

impl Default for CountAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator for CountAggregator {
    fn aggregate(&mut self, local: LocalAggregate) {
        let total = match self.state {
            CountState::Running(total) => total,
            CountState::Overflowed => return,
        };

        // Partitions that matched nothing may omit the value entirely.
        if let LocalAggregate::Scalar(value) = local {
            if let Some(count) = value.as_u64() {
                self.state = match total.checked_add(count) {
                    Some(total) => CountState::Running(total),
                    None => CountState::Overflowed,
                };
            }
        }
    }

    fn result(&self) -> AggregateValue {
        match self.state {
            CountState::Running(total) => AggregateValue::Defined(Value::from(total)),
            CountState::Overflowed => AggregateValue::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_count_sums_partials() {
        let mut agg = CountAggregator::new();
        agg.aggregate(LocalAggregate::Scalar(json!(3)));
        agg.aggregate(LocalAggregate::Undefined);
        agg.aggregate(LocalAggregate::Scalar(json!(4)));
        assert_eq!(agg.result(), AggregateValue::Defined(json!(7)));
    }

    #[test]
    fn test_empty_count_is_zero() {
        assert_eq!(CountAggregator::new().result(), AggregateValue::Defined(json!(0)));
    }

    #[test]
    fn test_overflowing_total_is_undefined() {
        let mut agg = CountAggregator::new();
        agg.aggregate(LocalAggregate::Scalar(json!(u64::MAX)));
        agg.aggregate(LocalAggregate::Scalar(json!(1)));
        assert!(agg.result().is_undefined());

        agg.aggregate(LocalAggregate::Scalar(json!(0)));
        assert!(agg.result().is_undefined());
    }
}
