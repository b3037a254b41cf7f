//! Aggregate operator names

use std::fmt;
use std::str::FromStr;

use crate::errors::QueryError;

/// Aggregate function applied to a projected column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOperator {
    /// AVG
    Average,
    /// COUNT
    Count,
    /// MAX
    Max,
    /// MIN
    Min,
    /// SUM
    Sum,
}

impl AggregateOperator {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOperator::Average => "Average",
            AggregateOperator::Count => "Count",
            AggregateOperator::Max => "Max",
            AggregateOperator::Min => "Min",
            AggregateOperator::Sum => "Sum",
        }
    }
}

impl fmt::Display for AggregateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AggregateOperator {
    type Err = QueryError;

    /// Operator names come from the query plan, so an unknown one means the
    /// plan and this client disagree.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average" | "avg" => Ok(AggregateOperator::Average),
            "count" => Ok(AggregateOperator::Count),
            "max" => Ok(AggregateOperator::Max),
            "min" => Ok(AggregateOperator::Min),
            "sum" => Ok(AggregateOperator::Sum),
            _ => Err(QueryError::invariant_violation(format!(
                "unexpected aggregate operator '{}'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operator_names() {
        assert_eq!("Average".parse::<AggregateOperator>().unwrap(), AggregateOperator::Average);
        assert_eq!("avg".parse::<AggregateOperator>().unwrap(), AggregateOperator::Average);
        assert_eq!("COUNT".parse::<AggregateOperator>().unwrap(), AggregateOperator::Count);
        assert_eq!("min".parse::<AggregateOperator>().unwrap(), AggregateOperator::Min);
    }

    #[test]
    fn test_unknown_operator_is_fatal() {
        let err = "Median".parse::<AggregateOperator>().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_display_round_trips() {
        for op in [
            AggregateOperator::Average,
            AggregateOperator::Count,
            AggregateOperator::Max,
            AggregateOperator::Min,
            AggregateOperator::Sum,
        ] {
            assert_eq!(op.to_string().parse::<AggregateOperator>().unwrap(), op);
        }
    }
}
