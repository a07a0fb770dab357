//! # Tabular Results
//!
//! Every rolling transform yields one row per input index. [`ResultTable`]
//! pivots those rows into named numeric columns aligned with the input, the
//! shape downstream persistence expects: booleans become `1.0` / `0.0` and
//! sentinel rows become NaN.

use crate::critical_values::ConfidenceLevel;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::series::SENTINEL;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A result row that can be flattened into named numeric fields.
///
/// Sentinel rows must report the same field names, in the same order, as
/// computed rows.
pub trait TableRow {
    /// `(column name, value)` pairs for this row.
    fn fields(&self) -> Vec<(String, f64)>;
}

/// Encodes an optional flag as 1.0 / 0.0, or NaN when not computable.
#[inline]
pub fn flag_value(flag: Option<bool>) -> f64 {
    match flag {
        Some(true) => 1.0,
        Some(false) => 0.0,
        None => SENTINEL,
    }
}

/// Named columns of equal length, one entry per input index.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultTable {
    len: usize,
    order: Vec<String>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl ResultTable {
    /// Empty table whose columns must all have `len` entries.
    pub fn with_len(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// Builds a table from per-index rows.
    pub fn from_rows<R: TableRow>(rows: &[R]) -> Self {
        let mut table = Self::with_len(rows.len());
        let Some(first) = rows.first() else {
            return table;
        };

        for (name, _) in first.fields() {
            table.order.push(name.clone());
            table.columns.insert(name, Vec::with_capacity(rows.len()));
        }
        for row in rows {
            for (name, value) in row.fields() {
                if let Some(column) = table.columns.get_mut(&name) {
                    column.push(value);
                }
            }
        }
        table
    }

    /// Adds or replaces a column.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> AnalysisResult<()> {
        if values.len() != self.len {
            return Err(AnalysisError::LengthMismatch {
                left: self.len,
                right: values.len(),
            });
        }
        let name = name.into();
        if !self.columns.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Column values by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.order.len()
    }

    /// Drops `critical_<level>` columns whose level is not in `levels`.
    pub fn retain_critical_levels(&mut self, levels: &[ConfidenceLevel]) {
        for level in ConfidenceLevel::ALL {
            if levels.contains(&level) {
                continue;
            }
            let name = format!("critical_{}", level.column_suffix());
            if self.columns.remove(&name).is_some() {
                self.order.retain(|n| n != &name);
            }
        }
    }

    /// Count of NaN entries in `name` after the leading NaN run.
    ///
    /// Leading sentinels are warm-up; later ones are windows that could not be
    /// computed.
    pub fn degraded_count(&self, name: &str) -> usize {
        self.column(name)
            .map(|values| {
                values
                    .iter()
                    .skip_while(|v| v.is_nan())
                    .filter(|v| v.is_nan())
                    .count()
            })
            .unwrap_or(0)
    }
}
