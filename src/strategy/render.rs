//! Value rendering strategy.

use std::fmt;

use serde::Serialize;

use crate::metadata::{type_codes, RawValue};

use super::types::is_numeric_target;

/// A rendered value. The core only compares these for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RenderedValue(String);

impl RenderedValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Converts a driver-native value into the representation the downstream
/// renderer expects.
pub trait ValueRenderer {
    fn render(
        &self,
        raw: &RawValue,
        db_type_name: &str,
        type_code: i32,
        target_type: &str,
    ) -> RenderedValue;
}

/// Renders values as source literals: `42`, `1.5`, `true`, `"text"`, `vec![1, 2]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralRenderer;

impl ValueRenderer for LiteralRenderer {
    fn render(
        &self,
        raw: &RawValue,
        _db_type_name: &str,
        type_code: i32,
        target_type: &str,
    ) -> RenderedValue {
        let boolean = matches!(type_code, type_codes::BOOLEAN | type_codes::BIT);
        let literal = match raw {
            RawValue::Null => "None".to_string(),
            RawValue::Boolean(b) => b.to_string(),
            RawValue::Integer(i) if boolean => (*i != 0).to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Real(r) if r.fract() == 0.0 && matches!(target_type, "i32" | "i64") => {
                (*r as i64).to_string()
            }
            RawValue::Real(r) => format!("{:?}", r),
            // Loosely typed drivers hand back numbers stored as text
            RawValue::Text(s) if is_numeric_target(target_type) && s.trim().parse::<f64>().is_ok() => {
                s.trim().to_string()
            }
            RawValue::Text(s) => format!("{:?}", s),
            RawValue::Blob(bytes) => format!("vec!{:?}", bytes),
        };
        RenderedValue(literal)
    }
}
