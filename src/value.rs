//! Total order over JSON values shared by Min/Max aggregation and the
//! cross-partition order-by comparator.
//!
//! Ordering rules:
//! - null < bool < number < string
//! - numbers compare numerically, strings lexically (byte order)
//! - arrays and objects sort after strings and are not compared further

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

/// Type category of a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueCategory {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// Any JSON number
    Number,
    /// Any JSON string
    String,
    /// JSON array (not a primitive)
    Array,
    /// JSON object (not a primitive)
    Object,
}

impl ValueCategory {
    /// Category of `value`
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueCategory::Null,
            Value::Bool(_) => ValueCategory::Boolean,
            Value::Number(_) => ValueCategory::Number,
            Value::String(_) => ValueCategory::String,
            Value::Array(_) => ValueCategory::Array,
            Value::Object(_) => ValueCategory::Object,
        }
    }

    /// Null, boolean, number and string are primitives
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ValueCategory::Null
                | ValueCategory::Boolean
                | ValueCategory::Number
                | ValueCategory::String
        )
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueCategory::Null => "Null",
            ValueCategory::Boolean => "Boolean",
            ValueCategory::Number => "Number",
            ValueCategory::String => "String",
            ValueCategory::Array => "Array",
            ValueCategory::Object => "Object",
        }
    }
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns true if `value` is a comparable primitive
pub fn is_primitive(value: &Value) -> bool {
    ValueCategory::of(value).is_primitive()
}

/// Compares two JSON values by category first, then by value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let a_category = ValueCategory::of(a);
    let b_category = ValueCategory::of(b);
    if a_category != b_category {
        return a_category.cmp(&b_category);
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Ordering {
    // Exact integer comparison first so large i64/u64 values keep their order.
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a.cmp(&b);
    }
    let a = a.as_f64().unwrap_or(0.0);
    let b = b.as_f64().unwrap_or(0.0);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
