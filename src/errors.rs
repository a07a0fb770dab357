//! Error types and validation functions for rolling-window analysis.
//!
//! Input-shape problems (empty series, window longer than the data, bad
//! parameters) are reported eagerly through [`AnalysisError`]. Numerical
//! degeneracy inside a single window is *not* an error at the engine level:
//! the rolling transforms catch collaborator failures and emit sentinel rows.

use thiserror::Error;

/// Error types for stationarity and cointegration analysis.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnalysisError {
    /// Insufficient data for the requested operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Two series that must be aligned have different lengths.
    #[error("Length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first series
        left: usize,
        /// Length of the second series
        right: usize,
    },

    /// Numerical computation error (singular design, zero variance, ...).
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },

    /// Statistical test computation failure.
    #[error("Statistical test failed: {test_name}: {reason}")]
    StatisticalTestError {
        /// Name of the statistical test that failed
        test_name: String,
        /// Why the test could not be computed
        reason: String,
    },
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Validates that data has sufficient length for analysis.
///
/// # Example
/// ```rust
/// use stationarity_finance::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> AnalysisResult<()> {
    if data.len() < min_required || (data.is_empty() && min_required > 0) {
        return Err(AnalysisError::InsufficientData {
            required: min_required,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Validates a rolling window against the series it will slide over.
///
/// A window of zero is a parameter error; an empty series or a window longer
/// than the series is an insufficient-data error.
pub fn validate_window(series_len: usize, window: usize) -> AnalysisResult<()> {
    if window == 0 {
        return Err(AnalysisError::InvalidParameter {
            parameter: "window".to_string(),
            value: 0.0,
            constraint: "a positive integer".to_string(),
        });
    }
    if series_len == 0 || window > series_len {
        return Err(AnalysisError::InsufficientData {
            required: window,
            actual: series_len,
        });
    }
    Ok(())
}

/// Validates that two series are aligned.
pub fn validate_equal_length(left: &[f64], right: &[f64]) -> AnalysisResult<()> {
    if left.len() != right.len() {
        return Err(AnalysisError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(())
}

/// Validates that a parameter is within expected bounds (inclusive).
///
/// # Example
/// ```rust
/// use stationarity_finance::errors::validate_parameter;
///
/// assert!(validate_parameter(0.5, 0.0, 2.0, "d").is_ok());
/// assert!(validate_parameter(2.5, 0.0, 2.0, "d").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> AnalysisResult<()> {
    if value.is_nan() {
        return Err(AnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(AnalysisError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
            operation: None,
        });
    }

    if value < min || value > max {
        return Err(AnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        });
    }
    Ok(())
}

/// Validates that a value is finite and not NaN.
pub fn validate_finite(value: f64, name: &str) -> AnalysisResult<()> {
    if !value.is_finite() {
        return Err(AnalysisError::NumericalError {
            reason: format!("{} is not finite: {}", name, value),
            operation: None,
        });
    }
    Ok(())
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value, reporting its index.
pub fn validate_all_finite(data: &[f64], name: &str) -> AnalysisResult<()> {
    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(AnalysisError::NumericalError {
            reason: format!(
                "{} contains non-finite value at index {}: {}",
                name, i, value
            ),
            operation: None,
        });
    }
    Ok(())
}
