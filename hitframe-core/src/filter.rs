//! Value filters over hit columns.
//!
//! A [`Filter`] turns a column into a boolean keep-mask. Conditions are
//! combined with logical AND; an empty filter keeps every row.

use crate::column::{Column, Value};
use crate::error::{Error, Result};

/// A set of AND-combined conditions on one field, optionally inverted.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    values: Option<Vec<Value>>,
    greater_than: Option<Value>,
    less_than: Option<Value>,
    invert: bool,
}

impl Filter {
    /// Creates a filter with no conditions, which keeps every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps rows whose value equals one of the given values.
    #[must_use]
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Keeps rows whose value is strictly greater than the bound.
    #[must_use]
    pub fn with_greater_than<V: Into<Value>>(mut self, bound: V) -> Self {
        self.greater_than = Some(bound.into());
        self
    }

    /// Keeps rows whose value is strictly less than the bound.
    #[must_use]
    pub fn with_less_than<V: Into<Value>>(mut self, bound: V) -> Self {
        self.less_than = Some(bound.into());
        self
    }

    /// Inverts the combined conditions.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    /// Returns true if the filter has no conditions and no inversion.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.values.is_none()
            && self.greater_than.is_none()
            && self.less_than.is_none()
            && !self.invert
    }

    /// Evaluates the filter over a full column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] when a condition cannot be applied
    /// to the column's type, such as an ordering bound on a string column.
    pub fn mask(&self, field: &str, column: &Column) -> Result<Vec<bool>> {
        let mut mask = vec![true; column.len()];
        if let Some(values) = &self.values {
            apply_values(field, column, values, &mut mask)?;
        }
        if let Some(bound) = &self.greater_than {
            apply_ordering(field, column, bound, Ordering::Above, &mut mask)?;
        }
        if let Some(bound) = &self.less_than {
            apply_ordering(field, column, bound, Ordering::Below, &mut mask)?;
        }
        if self.invert {
            for keep in &mut mask {
                *keep = !*keep;
            }
        }
        Ok(mask)
    }
}

#[allow(clippy::float_cmp)]
fn apply_values(
    field: &str,
    column: &Column,
    values: &[Value],
    mask: &mut [bool],
) -> Result<()> {
    match column {
        Column::Str(rows) => {
            let mut wanted = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Str(s) => wanted.push(s.as_str()),
                    other => {
                        return Err(Error::TypeMismatch {
                            field: field.to_owned(),
                            expected: "str",
                            actual: other.type_name(),
                        })
                    }
                }
            }
            for (keep, row) in mask.iter_mut().zip(rows.iter()) {
                *keep = *keep && wanted.contains(&row.as_str());
            }
        }
        Column::I64(rows) => {
            let wanted = numeric_values(field, values)?;
            for (keep, &row) in mask.iter_mut().zip(rows.iter()) {
                #[allow(clippy::cast_precision_loss)]
                let row = row as f64;
                *keep = *keep && wanted.iter().any(|&w| w == row);
            }
        }
        Column::F64(rows) => {
            let wanted = numeric_values(field, values)?;
            for (keep, &row) in mask.iter_mut().zip(rows.iter()) {
                *keep = *keep && wanted.iter().any(|&w| w == row);
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Ordering {
    Above,
    Below,
}

fn numeric_values(field: &str, values: &[Value]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|value| {
            value.as_f64().ok_or(Error::TypeMismatch {
                field: field.to_owned(),
                expected: "f64",
                actual: value.type_name(),
            })
        })
        .collect()
}

fn apply_ordering(
    field: &str,
    column: &Column,
    bound: &Value,
    side: Ordering,
    mask: &mut [bool],
) -> Result<()> {
    let bound = bound.as_f64().ok_or(Error::TypeMismatch {
        field: field.to_owned(),
        expected: "f64",
        actual: bound.type_name(),
    })?;
    let keep_row = |row: f64| match side {
        Ordering::Above => row > bound,
        Ordering::Below => row < bound,
    };
    match column {
        Column::F64(rows) => {
            for (keep, &row) in mask.iter_mut().zip(rows.iter()) {
                *keep = *keep && keep_row(row);
            }
        }
        Column::I64(rows) => {
            for (keep, &row) in mask.iter_mut().zip(rows.iter()) {
                #[allow(clippy::cast_precision_loss)]
                let row = row as f64;
                *keep = *keep && keep_row(row);
            }
        }
        Column::Str(_) => {
            return Err(Error::TypeMismatch {
                field: field.to_owned(),
                expected: "f64",
                actual: "str",
            })
        }
    }
    Ok(())
}
