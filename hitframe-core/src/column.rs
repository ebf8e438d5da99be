//! Typed columns and the ordered field schema.
//!
//! Hit tables store every field as a [`Column`]: a single typed vector with
//! one entry per flat row. Columns of different types live side by side in
//! one table; the [`Schema`] records their names and order.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single typed value, used by filters and cell accessors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    F64(f64),
    I64(i64),
    Str(String),
}

impl Value {
    /// Returns the numeric content, if any.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    /// Returns the type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::F64(_) => "f64",
            Value::I64(_) => "i64",
            Value::Str(_) => "str",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// One named column of hit data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Column {
    F64(Vec<f64>),
    I64(Vec<i64>),
    Str(Vec<String>),
}

impl Column {
    /// Returns a zero-filled numeric column, the placeholder for fields a
    /// source does not carry.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Column::F64(vec![0.0; len])
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::F64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    /// Returns true if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Column::F64(_) => "f64",
            Column::I64(_) => "i64",
            Column::Str(_) => "str",
        }
    }

    /// Returns the value of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds; callers index through an
    /// [`EventIndex`](crate::EventIndex), which bounds-checks first.
    #[must_use]
    pub fn value(&self, row: usize) -> Value {
        match self {
            Column::F64(v) => Value::F64(v[row]),
            Column::I64(v) => Value::I64(v[row]),
            Column::Str(v) => Value::Str(v[row].clone()),
        }
    }

    /// Returns a new column holding the given rows, in the order given.
    #[must_use]
    pub fn gather(&self, rows: &[usize]) -> Self {
        match self {
            Column::F64(v) => Column::F64(rows.iter().map(|&r| v[r]).collect()),
            Column::I64(v) => Column::I64(rows.iter().map(|&r| v[r]).collect()),
            Column::Str(v) => Column::Str(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Returns a copy of a contiguous row range.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        match self {
            Column::F64(v) => Column::F64(v[range].to_vec()),
            Column::I64(v) => Column::I64(v[range].to_vec()),
            Column::Str(v) => Column::Str(v[range].to_vec()),
        }
    }

    /// Appends another column of the same type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the types differ.
    pub fn append(&mut self, field: &str, other: &Column) -> Result<()> {
        match (self, other) {
            (Column::F64(a), Column::F64(b)) => a.extend_from_slice(b),
            (Column::I64(a), Column::I64(b)) => a.extend_from_slice(b),
            (Column::Str(a), Column::Str(b)) => a.extend_from_slice(b),
            (mine, other) => {
                return Err(Error::TypeMismatch {
                    field: field.to_owned(),
                    expected: mine.type_name(),
                    actual: other.type_name(),
                })
            }
        }
        Ok(())
    }

    /// Borrows the rows as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for non-`f64` columns.
    pub fn as_f64(&self, field: &str) -> Result<&[f64]> {
        match self {
            Column::F64(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                field: field.to_owned(),
                expected: "f64",
                actual: other.type_name(),
            }),
        }
    }

    /// Borrows the rows as `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for non-`i64` columns.
    pub fn as_i64(&self, field: &str) -> Result<&[i64]> {
        match self {
            Column::I64(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                field: field.to_owned(),
                expected: "i64",
                actual: other.type_name(),
            }),
        }
    }

    /// Borrows the rows as strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for non-string columns.
    pub fn as_str(&self, field: &str) -> Result<&[String]> {
        match self {
            Column::Str(v) => Ok(v),
            other => Err(Error::TypeMismatch {
                field: field.to_owned(),
                expected: "str",
                actual: other.type_name(),
            }),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::F64(v)
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Column::I64(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::Str(v)
    }
}

/// Ordered field list with constant-time name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field name and returns its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if the name is already registered.
    pub fn push(&mut self, name: &str) -> Result<usize> {
        if self.positions.contains_key(name) {
            return Err(Error::DuplicateField(name.to_owned()));
        }
        let position = self.fields.len();
        self.fields.push(name.to_owned());
        self.positions.insert(name.to_owned(), position);
        Ok(position)
    }

    /// Returns the position of a field, if registered.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Returns true if the field is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Returns the field names in registration order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
