//! # Value Container
//!
//! Bound parameter values of one node (the `?` of `age = ?`).
//!
//! The count of values is validated against the node's derived fields:
//! - more than one field requires an exact count match
//! - exactly one field requires at least one value
//! - a node without fields accepts any count
//!
//! Values that reference a nested chain stand in for a sub-statement whose
//! arity is not known here, so containers holding one skip the count rule.

use serde::{Deserialize, Serialize};

/// One bound value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundValue {
    /// Plain scalar or structured value.
    Scalar(serde_json::Value),
    /// Reference to another chain by id, used as a nested statement.
    Nested(String),
}

impl BoundValue {
    /// Render the value for JSON output.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::Nested(id) => serde_json::json!({ "chain": id }),
        }
    }
}

impl From<serde_json::Value> for BoundValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for BoundValue {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<&str> for BoundValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for BoundValue {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

/// Count rule violation, wrapped with the node id by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Values bound to a node, paired positionally with its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueContainer {
    fields: Vec<String>,
    values: Vec<BoundValue>,
}

impl ValueContainer {
    /// Bind `values` to `fields`, enforcing the count rule.
    pub fn bind(fields: &[String], values: Vec<BoundValue>) -> Result<Self, CountMismatch> {
        let nested = values.iter().any(|v| matches!(v, BoundValue::Nested(_)));
        if !nested {
            check_count(fields.len(), values.len())?;
        }
        Ok(Self {
            fields: fields.to_vec(),
            values,
        })
    }

    /// Number of bound values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no values are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound values in order.
    #[must_use]
    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }

    /// The value bound to a field, if the field has a positional value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&BoundValue> {
        let index = self.fields.iter().position(|f| f == field)?;
        self.values.get(index)
    }

    /// Field/value pairs; extra values of a single-field node are paired
    /// with that field.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &BoundValue)> + '_ {
        let single = (self.fields.len() == 1).then(|| self.fields[0].as_str());
        self.values.iter().enumerate().filter_map(move |(i, v)| {
            let field = single.or_else(|| self.fields.get(i).map(String::as_str))?;
            Some((field, v))
        })
    }

    /// Values rendered as JSON, in order.
    #[must_use]
    pub fn object_list(&self) -> Vec<serde_json::Value> {
        self.values.iter().map(BoundValue::to_json).collect()
    }
}

fn check_count(fields: usize, values: usize) -> Result<(), CountMismatch> {
    let ok = match fields {
        0 => true,
        1 => values >= 1,
        _ => values == fields,
    };
    if ok {
        Ok(())
    } else {
        Err(CountMismatch {
            expected: fields,
            actual: values,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
