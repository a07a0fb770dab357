//! Engle-Granger two-step cointegration over a rolling window.
//!
//! 1. Regress `y` on `x` by OLS to get the hedge ratio and intercept.
//! 2. Test the residual spread for a unit root with a [`StationarityTest`].
//!
//! The pair is flagged cointegrated when the p-value is below the configured
//! significance (5% unless overridden). A window where either step fails
//! degrades to a sentinel row and the remaining windows are still computed.
//!
//! ## References
//! - Engle, R.F. & Granger, C.W.J. (1987). "Co-integration and Error
//!   Correction: Representation, Estimation, and Testing." Econometrica 55.

use crate::critical_values::ConfidenceLevel;
use crate::errors::{validate_parameter, AnalysisError, AnalysisResult};
use crate::regression::fit_linear;
use crate::results::{flag_value, TableRow};
use crate::series::SENTINEL;
use crate::stationarity::{AdfTest, StationarityTest};
use crate::window::{DegradedWindows, PairedWindowBuffer, WindowSpec};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default significance for `is_cointegrated`.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Engle-Granger result for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngleGrangerRow {
    /// Slope of `y` on `x`
    pub hedge_ratio: f64,
    /// Intercept of `y` on `x`
    pub intercept: f64,
    /// Residual at the last index of the window
    pub spread: f64,
    /// Unit-root statistic of the residual spread
    pub adf_stat: f64,
    /// Its p-value
    pub p_value: f64,
    /// 1% critical value
    pub critical_1pct: f64,
    /// 5% critical value
    pub critical_5pct: f64,
    /// 10% critical value
    pub critical_10pct: f64,
    /// `p_value < significance`
    pub is_cointegrated: Option<bool>,
}

impl EngleGrangerRow {
    /// Row for an index with no computable test.
    pub fn sentinel() -> Self {
        Self {
            hedge_ratio: SENTINEL,
            intercept: SENTINEL,
            spread: SENTINEL,
            adf_stat: SENTINEL,
            p_value: SENTINEL,
            critical_1pct: SENTINEL,
            critical_5pct: SENTINEL,
            critical_10pct: SENTINEL,
            is_cointegrated: None,
        }
    }
}

impl TableRow for EngleGrangerRow {
    fn fields(&self) -> Vec<(String, f64)> {
        vec![
            ("hedge_ratio".to_string(), self.hedge_ratio),
            ("intercept".to_string(), self.intercept),
            ("spread".to_string(), self.spread),
            ("adf_stat".to_string(), self.adf_stat),
            ("p_value".to_string(), self.p_value),
            ("critical_1pct".to_string(), self.critical_1pct),
            ("critical_5pct".to_string(), self.critical_5pct),
            ("critical_10pct".to_string(), self.critical_10pct),
            ("is_cointegrated".to_string(), flag_value(self.is_cointegrated)),
        ]
    }
}

/// Rolling Engle-Granger tester.
#[derive(Clone)]
pub struct EngleGranger {
    spec: WindowSpec,
    test: Arc<dyn StationarityTest>,
    significance: f64,
}

impl fmt::Debug for EngleGranger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngleGranger")
            .field("window", &self.spec.window)
            .field("test", &self.test.name())
            .field("significance", &self.significance)
            .finish()
    }
}

impl EngleGranger {
    /// Tester with the residual ADF backend (one lagged difference).
    pub fn new(window: usize) -> AnalysisResult<Self> {
        Self::with_test(window, Arc::new(AdfTest::engle_granger(2, 1)?))
    }

    /// Tester with any stationarity backend.
    pub fn with_test(window: usize, test: Arc<dyn StationarityTest>) -> AnalysisResult<Self> {
        Ok(Self {
            spec: WindowSpec::new(window)?,
            test,
            significance: DEFAULT_SIGNIFICANCE,
        })
    }

    /// Sets the p-value threshold, which must lie strictly inside (0, 1).
    pub fn with_significance(mut self, significance: f64) -> AnalysisResult<Self> {
        validate_parameter(significance, f64::MIN_POSITIVE, 1.0 - f64::EPSILON, "significance")?;
        self.significance = significance;
        Ok(self)
    }

    /// Window length.
    pub fn window(&self) -> usize {
        self.spec.window
    }

    /// Significance used for `is_cointegrated`.
    pub fn significance(&self) -> f64 {
        self.significance
    }

    /// Runs both steps on one aligned window, propagating any failure.
    pub fn test_window(&self, x: &[f64], y: &[f64]) -> AnalysisResult<EngleGrangerRow> {
        let fit = fit_linear(x, y)?;
        let residuals = fit.residuals(x, y);
        let spread = residuals[residuals.len() - 1];

        let result = self.test.test(&residuals)?;
        if !result.statistic.is_finite() || !result.p_value.is_finite() {
            return Err(AnalysisError::StatisticalTestError {
                test_name: self.test.name().to_string(),
                reason: "non-finite statistic".to_string(),
            });
        }

        let cv = |level| result.critical_value(level).unwrap_or(SENTINEL);
        Ok(EngleGrangerRow {
            hedge_ratio: fit.slope,
            intercept: fit.intercept,
            spread,
            adf_stat: result.statistic,
            p_value: result.p_value,
            critical_1pct: cv(ConfidenceLevel::OnePercent),
            critical_5pct: cv(ConfidenceLevel::FivePercent),
            critical_10pct: cv(ConfidenceLevel::TenPercent),
            is_cointegrated: Some(result.p_value < self.significance),
        })
    }

    /// One row per input index.
    ///
    /// # Errors
    /// Only input-shape errors: misaligned series, or a window longer than
    /// the data.
    pub fn compute(&self, x: &[f64], y: &[f64]) -> AnalysisResult<Vec<EngleGrangerRow>> {
        let buffer = PairedWindowBuffer::new(x, y, self.spec)?;
        let degraded = DegradedWindows::default();
        let rows = buffer.map_windows(EngleGrangerRow::sentinel(), |t, xs, ys| {
            self.test_window(xs, ys).unwrap_or_else(|e| {
                degraded.record("Engle-Granger", t, &e);
                EngleGrangerRow::sentinel()
            })
        });
        degraded.report("Engle-Granger", buffer.len() - buffer.first_index());
        Ok(rows)
    }
}
