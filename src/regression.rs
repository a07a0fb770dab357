//! Simple linear regression `y = intercept + slope * x` and its rolling form.
//!
//! This is the hedge-ratio leg of the Engle-Granger procedure. The fit
//! centers both series before accumulating cross-products, which avoids
//! catastrophic cancellation for price levels with small variation.

use crate::errors::{validate_equal_length, AnalysisError, AnalysisResult};
use crate::results::TableRow;
use crate::series::SENTINEL;
use crate::window::{PairedWindowBuffer, WindowSpec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Denominators below this are treated as a constant predictor.
const MIN_PREDICTOR_VARIATION: f64 = 1e-12;

/// Intercept and slope of a simple OLS fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegressionResult {
    /// Alpha
    pub intercept: f64,
    /// Beta (the hedge ratio when regressing one price on another)
    pub slope: f64,
}

impl RegressionResult {
    /// Fitted value at `x`.
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// `y - predict(x)` for each aligned pair.
    pub fn residuals(&self, x: &[f64], y: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| yi - self.predict(xi))
            .collect()
    }
}

/// Fits `y = intercept + slope * x` by ordinary least squares.
///
/// # Errors
/// - `LengthMismatch` if the inputs are not aligned
/// - `InsufficientData` for fewer than two observations
/// - `NumericalError` for non-finite input or a constant predictor
///
/// # Example
/// ```rust
/// use stationarity_finance::regression::fit_linear;
///
/// let x = vec![1.0, 2.0, 3.0, 4.0];
/// let y = vec![3.0, 5.0, 7.0, 9.0];
/// let fit = fit_linear(&x, &y).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 1.0).abs() < 1e-12);
/// ```
pub fn fit_linear(x: &[f64], y: &[f64]) -> AnalysisResult<RegressionResult> {
    validate_equal_length(x, y)?;
    if x.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            required: 2,
            actual: x.len(),
        });
    }
    if !x.iter().chain(y).all(|v| v.is_finite()) {
        return Err(AnalysisError::NumericalError {
            reason: "Non-finite values in regression data".to_string(),
            operation: Some("fit_linear".to_string()),
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (sxy, sxx) = x.iter().zip(y).fold((0.0, 0.0), |(sxy, sxx), (&xi, &yi)| {
        let dx = xi - mean_x;
        (sxy + dx * (yi - mean_y), sxx + dx * dx)
    });

    if sxx <= MIN_PREDICTOR_VARIATION * n.max(1.0) {
        return Err(AnalysisError::NumericalError {
            reason: format!(
                "Predictor variable has zero variance (constant values). X variance: {:.2e}",
                sxx / n
            ),
            operation: Some("fit_linear".to_string()),
        });
    }

    let slope = sxy / sxx;
    Ok(RegressionResult {
        intercept: mean_y - slope * mean_x,
        slope,
    })
}

/// One row of the rolling linear fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearFitRow {
    /// Slope of `y` on `x` over the window
    pub slope: f64,
    /// Intercept over the window
    pub intercept: f64,
    /// Residual of the window's last observation
    pub residual: f64,
}

impl LinearFitRow {
    /// Row for an index with no computable fit.
    pub fn sentinel() -> Self {
        Self {
            slope: SENTINEL,
            intercept: SENTINEL,
            residual: SENTINEL,
        }
    }
}

impl TableRow for LinearFitRow {
    fn fields(&self) -> Vec<(String, f64)> {
        vec![
            ("slope".to_string(), self.slope),
            ("intercept".to_string(), self.intercept),
            ("residual".to_string(), self.residual),
        ]
    }
}

/// Rolling regression of `y` on `x`.
#[derive(Debug, Clone, Copy)]
pub struct RollingLinearFit {
    spec: WindowSpec,
}

impl RollingLinearFit {
    /// Creates a rolling fit over `window` observations.
    pub fn new(window: usize) -> AnalysisResult<Self> {
        Ok(Self {
            spec: WindowSpec::new(window)?,
        })
    }

    /// One row per input index; warm-up and degenerate windows are sentinels.
    pub fn compute(&self, x: &[f64], y: &[f64]) -> AnalysisResult<Vec<LinearFitRow>> {
        let buffer = PairedWindowBuffer::new(x, y, self.spec)?;
        Ok(buffer.map_windows(LinearFitRow::sentinel(), |t, xs, ys| {
            match fit_linear(xs, ys) {
                Ok(fit) => {
                    let last = xs.len() - 1;
                    LinearFitRow {
                        slope: fit.slope,
                        intercept: fit.intercept,
                        residual: ys[last] - fit.predict(xs[last]),
                    }
                }
                Err(e) => {
                    log::debug!("linear fit window ending at {} is degenerate: {}", t, e);
                    LinearFitRow::sentinel()
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_fit_linear_perfect_fit() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 0.5 + 1.5 * v).collect();
        let fit = fit_linear(&x, &y).unwrap();
        assert_approx_eq!(fit.slope, 1.5, 1e-12);
        assert_approx_eq!(fit.intercept, 0.5, 1e-12);
        for r in fit.residuals(&x, &y) {
            assert_approx_eq!(r, 0.0, 1e-12);
        }
    }

    #[test]
    fn test_fit_linear_large_levels() {
        // Price-like levels with tiny variation relative to the mean
        let x: Vec<f64> = (0..50).map(|i| 1e6 + i as f64 * 0.01).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 2.0).collect();
        let fit = fit_linear(&x, &y).unwrap();
        assert_approx_eq!(fit.slope, 3.0, 1e-6);
    }

    #[test]
    fn test_fit_linear_errors() {
        assert!(matches!(
            fit_linear(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::NumericalError { .. })
        ));
        assert!(matches!(
            fit_linear(&[1.0], &[1.0]),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(matches!(
            fit_linear(&[1.0, 2.0], &[1.0]),
            Err(AnalysisError::LengthMismatch { .. })
        ));
        assert!(fit_linear(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_rolling_linear_fit() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let mut y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        y[9] += 3.0;

        let rows = RollingLinearFit::new(4).unwrap().compute(&x, &y).unwrap();
        assert_eq!(rows.len(), 10);
        for row in &rows[..3] {
            assert!(row.slope.is_nan() && row.residual.is_nan());
        }
        assert_approx_eq!(rows[5].slope, 2.0, 1e-12);
        assert_approx_eq!(rows[5].intercept, 1.0, 1e-12);
        assert_approx_eq!(rows[5].residual, 0.0, 1e-12);
        assert!(rows[9].residual > 0.0);
    }

    #[test]
    fn test_rolling_linear_fit_degenerate_window() {
        let x = vec![1.0, 1.0, 1.0, 2.0, 3.0];
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let rows = RollingLinearFit::new(3).unwrap().compute(&x, &y).unwrap();
        assert!(rows[2].slope.is_nan());
        assert!(rows[3].slope.is_finite());
    }
}
