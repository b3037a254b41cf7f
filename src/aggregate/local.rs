//! Decoding of per-partition partial aggregate values.
//!
//! Upstream rows carry one partial value per aggregate operator. The shape
//! depends on the operator:
//!
//! - Count, Sum: a raw number
//! - Average: `{"sum": n?, "count": c}`
//! - Min / Max: a raw primitive, or `{"min"|"max": v?, "count": c}`
//!
//! Values are decoded once here so aggregators can match exhaustively.

use serde_json::Value;

use crate::errors::{QueryError, QueryResult};

use super::average::WeightedAverage;
use super::operator::AggregateOperator;

/// One partition's contribution to an aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAggregate {
    /// A raw value: a count, a sum, or a Min/Max candidate
    Scalar(Value),
    /// A partial average
    PartialAverage(WeightedAverage),
    /// A partial Min/Max over `count` documents; `value` is absent when the
    /// partition's extremum was undefined
    PartialMinMax { value: Option<Value>, count: u64 },
    /// The partition produced no defined value
    Undefined,
}

impl LocalAggregate {
    /// Decode the raw partial for `operator`. `None` means the upstream row
    /// omitted the value, which is an Undefined contribution.
    pub fn decode(operator: AggregateOperator, raw: Option<&Value>) -> QueryResult<Self> {
        let raw = match raw {
            Some(raw) => raw,
            None => return Ok(LocalAggregate::Undefined),
        };

        match operator {
            AggregateOperator::Count => match raw.as_u64() {
                Some(_) => Ok(LocalAggregate::Scalar(raw.clone())),
                None => Err(QueryError::invalid_response(format!(
                    "partial count must be a non-negative integer, got {}",
                    raw
                ))),
            },
            AggregateOperator::Sum => Ok(LocalAggregate::Scalar(raw.clone())),
            AggregateOperator::Average => {
                WeightedAverage::from_value(raw).map(LocalAggregate::PartialAverage)
            }
            AggregateOperator::Min => Ok(decode_min_max(raw, "min")),
            AggregateOperator::Max => Ok(decode_min_max(raw, "max")),
        }
    }
}

fn decode_min_max(raw: &Value, field: &str) -> LocalAggregate {
    if let Value::Object(map) = raw {
        if let Some(count) = map.get("count").and_then(Value::as_u64) {
            return LocalAggregate::PartialMinMax {
                value: map.get(field).cloned(),
                count,
            };
        }
    }
    LocalAggregate::Scalar(raw.clone())
}
