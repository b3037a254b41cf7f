//! Aggregator family for cross-partition aggregation
//!
//! Each aggregator folds a stream of per-partition partial values into one
//! running value. Partials arrive in arbitrary batches and order; every
//! aggregator is associative over them.
//!
//! # Undefined
//!
//! An aggregate with no defined result reports [`AggregateValue::Undefined`],
//! which is distinct from JSON `null`. Once Sum, Min/Max or the Average sum
//! become undefined they stay undefined.

mod average;
mod count;
mod local;
mod min_max;
mod operator;
mod sum;

pub use average::{AverageAggregator, WeightedAverage};
pub use count::CountAggregator;
pub use local::LocalAggregate;
pub use min_max::{Extreme, MinMaxAggregator};
pub use operator::AggregateOperator;
pub use sum::SumAggregator;

use serde_json::Value;

/// Result of an aggregator
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    /// A defined result
    Defined(Value),
    /// No defined result
    Undefined,
}

impl AggregateValue {
    /// Returns true if there is no defined result
    pub fn is_undefined(&self) -> bool {
        matches!(self, AggregateValue::Undefined)
    }

    /// The defined value, if any
    pub fn into_option(self) -> Option<Value> {
        match self {
            AggregateValue::Defined(value) => Some(value),
            AggregateValue::Undefined => None,
        }
    }
}

/// Folds partial values into a running aggregate
pub trait Aggregator: Send + std::fmt::Debug {
    /// Fold one partition's contribution
    fn aggregate(&mut self, local: LocalAggregate);

    /// Current result
    fn result(&self) -> AggregateValue;
}

/// Instantiate the aggregator for `operator`
pub fn create_aggregator(operator: AggregateOperator) -> Box<dyn Aggregator> {
    match operator {
        AggregateOperator::Average => Box::new(AverageAggregator::new()),
        AggregateOperator::Count => Box::new(CountAggregator::new()),
        AggregateOperator::Max => Box::new(MinMaxAggregator::max()),
        AggregateOperator::Min => Box::new(MinMaxAggregator::min()),
        AggregateOperator::Sum => Box::new(SumAggregator::new()),
    }
}

/// Non-finite floats have no JSON form and are reported as undefined.
pub(crate) fn number_value(n: f64) -> AggregateValue {
    match serde_json::Number::from_f64(n) {
        Some(number) => AggregateValue::Defined(Value::Number(number)),
        None => AggregateValue::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_aggregator_per_operator() {
        let mut count = create_aggregator(AggregateOperator::Count);
        count.aggregate(LocalAggregate::Scalar(json!(2)));
        assert_eq!(count.result(), AggregateValue::Defined(json!(2)));

        let mut max = create_aggregator(AggregateOperator::Max);
        max.aggregate(LocalAggregate::Scalar(json!("b")));
        max.aggregate(LocalAggregate::Scalar(json!("a")));
        assert_eq!(max.result(), AggregateValue::Defined(json!("b")));

        let mut min = create_aggregator(AggregateOperator::Min);
        min.aggregate(LocalAggregate::Scalar(json!("b")));
        min.aggregate(LocalAggregate::Scalar(json!("a")));
        assert_eq!(min.result(), AggregateValue::Defined(json!("a")));
    }

    #[test]
    fn test_non_finite_is_undefined() {
        assert!(number_value(f64::INFINITY).is_undefined());
        assert_eq!(number_value(1.5), AggregateValue::Defined(json!(1.5)));
    }

    #[test]
    fn test_into_option() {
        assert_eq!(AggregateValue::Defined(json!(1)).into_option(), Some(json!(1)));
        assert_eq!(AggregateValue::Undefined.into_option(), None);
    }
}
