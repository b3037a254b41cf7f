//! SUM with sticky poisoning.

use super::local::LocalAggregate;
use super::{number_value, AggregateValue, Aggregator};

#[derive(Debug, Clone, Copy, PartialEq)]
enum SumState {
    Running(f64),
    Poisoned,
}

/// SUM aggregator. Any undefined or non-numeric contribution makes the
/// result undefined for good.
#[derive(Debug)]
pub struct SumAggregator {
    state: SumState,
}

impl SumAggregator {
    pub fn new() -> Self {
        Self {
            state: SumState::Running(0.0),
        }
    }
}

impl Default for SumAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator for SumAggregator {
    fn aggregate(&mut self, local: LocalAggregate) {
        let running = match self.state {
            SumState::Running(running) => running,
            SumState::Poisoned => return,
        };

        self.state = match local {
            LocalAggregate::Scalar(value) => match value.as_f64() {
                Some(n) => SumState::Running(running + n),
                None => SumState::Poisoned,
            },
            LocalAggregate::Undefined
            | LocalAggregate::PartialAverage(_)
            | LocalAggregate::PartialMinMax { .. } => SumState::Poisoned,
        };
    }

    fn result(&self) -> AggregateValue {
        match self.state {
            SumState::Running(sum) => number_value(sum),
            SumState::Poisoned => AggregateValue::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sum_of_numbers() {
        let mut agg = SumAggregator::new();
        for n in [json!(1), json!(2.5), json!(-0.5)] {
            agg.aggregate(LocalAggregate::Scalar(n));
        }
        assert_eq!(agg.result(), AggregateValue::Defined(json!(3.0)));
    }

    #[test]
    fn test_empty_sum_is_zero() {
        assert_eq!(SumAggregator::new().result(), AggregateValue::Defined(json!(0.0)));
    }

    #[test]
    fn test_poison_never_clears() {
        let mut agg = SumAggregator::new();
        agg.aggregate(LocalAggregate::Scalar(json!(5)));
        agg.aggregate(LocalAggregate::Undefined);
        assert!(agg.result().is_undefined());

        agg.aggregate(LocalAggregate::Scalar(json!(10)));
        assert!(agg.result().is_undefined());
    }

    #[test]
    fn test_non_numeric_poisons() {
        let mut agg = SumAggregator::new();
        agg.aggregate(LocalAggregate::Scalar(json!("12")));
        assert!(agg.result().is_undefined());
    }
}
