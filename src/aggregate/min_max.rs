//! MIN / MAX over primitive values.

use std::cmp::Ordering;

use serde_json::Value;

use crate::value::{compare_values, is_primitive};

use super::local::LocalAggregate;
use super::{AggregateValue, Aggregator};

/// Which extremum to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
enum Extremum {
    /// Nothing seen yet; loses against every real value
    Unset,
    Value(Value),
    Poisoned,
}

/// MIN / MAX aggregator.
///
/// Undefined contributions and non-primitive values poison the result.
/// Empty partial ranges (`count == 0`) are skipped.
#[derive(Debug)]
pub struct MinMaxAggregator {
    extreme: Extreme,
    state: Extremum,
}

impl MinMaxAggregator {
    pub fn new(extreme: Extreme) -> Self {
        Self {
            extreme,
            state: Extremum::Unset,
        }
    }

    pub fn min() -> Self {
        Self::new(Extreme::Min)
    }

    pub fn max() -> Self {
        Self::new(Extreme::Max)
    }

    fn wins(&self, ordering: Ordering) -> bool {
        match self.extreme {
            Extreme::Min => ordering == Ordering::Less,
            Extreme::Max => ordering == Ordering::Greater,
        }
    }

    fn replaces(&self, current: &Value, incoming: &Value) -> bool {
        match compare_values(incoming, current) {
            Ordering::Equal => self.wins_tie(current, incoming),
            ordering => self.wins(ordering),
        }
    }

    /// Equal numbers may differ in encoding (`3` and `3.0`, `0.0` and `-0.0`).
    /// The integer encoding wins, then the float total order, so the result
    /// does not depend on arrival order.
    fn wins_tie(&self, current: &Value, incoming: &Value) -> bool {
        match (is_integer(incoming), is_integer(current)) {
            (true, false) => true,
            (false, true) | (true, true) => false,
            (false, false) => match (incoming.as_f64(), current.as_f64()) {
                (Some(a), Some(b)) => self.wins(a.total_cmp(&b)),
                _ => false,
            },
        }
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

impl Aggregator for MinMaxAggregator {
    fn aggregate(&mut self, local: LocalAggregate) {
        if matches!(self.state, Extremum::Poisoned) {
            return;
        }

        let incoming = match local {
            LocalAggregate::Scalar(value) => Some(value),
            LocalAggregate::PartialMinMax { count: 0, .. } => return,
            LocalAggregate::PartialMinMax { value, .. } => value,
            LocalAggregate::Undefined | LocalAggregate::PartialAverage(_) => None,
        };

        let incoming = match incoming {
            Some(value) if is_primitive(&value) => value,
            _ => {
                self.state = Extremum::Poisoned;
                return;
            }
        };

        let replace = match &self.state {
            Extremum::Unset => true,
            Extremum::Value(current) => self.replaces(current, &incoming),
            Extremum::Poisoned => false,
        };
        if replace {
            self.state = Extremum::Value(incoming);
        }
    }

    fn result(&self) -> AggregateValue {
        match &self.state {
            Extremum::Value(value) => AggregateValue::Defined(value.clone()),
            Extremum::Unset | Extremum::Poisoned => AggregateValue::Undefined,
        }
    }
}
