//! Input series and the "not yet computable" sentinel.

use crate::errors::{AnalysisError, AnalysisResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Marker for an output value that cannot be computed at a given index.
///
/// NaN is used so that sentinel rows persist naturally as not-a-number in
/// tabular output. It is distinct from zero.
pub const SENTINEL: f64 = f64::NAN;

/// Returns true if `value` is the sentinel marker.
#[inline]
pub fn is_sentinel(value: f64) -> bool {
    value.is_nan()
}

/// Ordered, immutable sequence of observations with optional timestamps.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Series {
    values: Vec<f64>,
    timestamps: Option<Vec<i64>>,
}

impl Series {
    /// Builds a series from raw values. The series must not be empty.
    pub fn new(values: Vec<f64>) -> AnalysisResult<Self> {
        if values.is_empty() {
            return Err(AnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        Ok(Self {
            values,
            timestamps: None,
        })
    }

    /// Builds a series paired with a strictly increasing timestamp sequence.
    pub fn with_timestamps(values: Vec<f64>, timestamps: Vec<i64>) -> AnalysisResult<Self> {
        if values.len() != timestamps.len() {
            return Err(AnalysisError::LengthMismatch {
                left: values.len(),
                right: timestamps.len(),
            });
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(AnalysisError::InvalidParameter {
                parameter: "timestamps".to_string(),
                value: timestamps[pos + 1] as f64,
                constraint: format!(
                    "strictly increasing (index {} does not exceed {})",
                    pos + 1,
                    timestamps[pos]
                ),
            });
        }
        let mut series = Self::new(values)?;
        series.timestamps = Some(timestamps);
        Ok(series)
    }

    /// Observation values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamps, if the series carries any.
    pub fn timestamps(&self) -> Option<&[i64]> {
        self.timestamps.as_deref()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed series; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl AsRef<[f64]> for Series {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}
