//! # Unit-Root Testing
//!
//! The rolling transforms never hard-code a particular test: they talk to a
//! [`StationarityTest`], which maps a finite series to a statistic, a
//! p-value and critical values, and fails on degenerate input. [`AdfTest`]
//! is the built-in backend, an Augmented Dickey-Fuller regression
//!
//! ```text
//! Δy[t] = [α] + [δ t] + γ y[t-1] + Σ_{j=1..p} φ_j Δy[t-j] + ε[t]
//! ```
//!
//! with the test statistic `γ / SE(γ)` judged against MacKinnon response
//! surfaces.
//!
//! ## References
//! - Dickey, D.A. & Fuller, W.A. (1979). "Distribution of the Estimators for
//!   Autoregressive Time Series with a Unit Root." JASA 74, 427-431.
//! - Said, S.E. & Dickey, D.A. (1984). "Testing for Unit Roots in
//!   Autoregressive-Moving Average Models of Unknown Order." Biometrika 71.

use crate::critical_values::{ConfidenceLevel, CriticalValueTable, Deterministic};
use crate::errors::{validate_all_finite, AnalysisError, AnalysisResult};
use crate::linear_algebra::ols_fit;
use crate::results::{flag_value, TableRow};
use crate::series::SENTINEL;
use crate::window::{DegradedWindows, WindowBuffer, WindowSpec};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum number of observations in the Dickey-Fuller regression.
pub const MIN_REGRESSION_OBS: usize = 5;

/// Outcome of a stationarity test on one series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationarityResult {
    /// Test statistic
    pub statistic: f64,
    /// Approximate p-value in [0, 1]
    pub p_value: f64,
    /// Critical values keyed by significance level
    pub critical_values: BTreeMap<ConfidenceLevel, f64>,
    /// Lagged differences in the regression
    pub used_lag: usize,
    /// Observations in the regression
    pub nobs: usize,
}

impl StationarityResult {
    /// Critical value at `level`, if the backend reported one.
    pub fn critical_value(&self, level: ConfidenceLevel) -> Option<f64> {
        self.critical_values.get(&level).copied()
    }

    /// Rejects the unit root when the statistic is below the critical value
    /// at `level`, falling back to the p-value when that value is missing.
    pub fn rejects_unit_root(&self, level: ConfidenceLevel) -> bool {
        match self.critical_value(level) {
            Some(cv) => self.statistic < cv,
            None => self.p_value < level.alpha(),
        }
    }
}

/// A stationarity test over a finite real sequence.
///
/// Implementations must return an error, rather than a meaningless
/// statistic, for input they cannot test (constant series, too few
/// observations). Rolling callers turn such errors into sentinel rows.
pub trait StationarityTest: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Tests `series` for a unit root.
    fn test(&self, series: &[f64]) -> AnalysisResult<StationarityResult>;
}

/// ADF regression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdfConfig {
    /// Number of lagged differences
    pub max_lag: usize,
    /// Deterministic terms
    pub deterministic: Deterministic,
}

impl Default for AdfConfig {
    fn default() -> Self {
        Self {
            max_lag: 1,
            deterministic: Deterministic::Constant,
        }
    }
}

/// Augmented Dickey-Fuller test with a fixed lag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfTest {
    config: AdfConfig,
    table: CriticalValueTable,
}

impl AdfTest {
    /// Plain ADF test using the standard tables for its deterministic terms.
    pub fn new(config: AdfConfig) -> Self {
        Self {
            config,
            table: CriticalValueTable::Adf(config.deterministic),
        }
    }

    /// Residual-based test for Engle-Granger: no deterministic terms and
    /// cointegration critical values for `n_vars` series.
    pub fn engle_granger(n_vars: usize, lag: usize) -> AnalysisResult<Self> {
        let table = CriticalValueTable::EngleGranger { n_vars };
        table.coefficients(ConfidenceLevel::FivePercent)?;
        Ok(Self {
            config: AdfConfig {
                max_lag: lag,
                deterministic: Deterministic::None,
            },
            table,
        })
    }

    /// Replaces the critical-value table.
    pub fn with_table(mut self, table: CriticalValueTable) -> Self {
        self.table = table;
        self
    }

    /// Regression settings.
    pub fn config(&self) -> &AdfConfig {
        &self.config
    }

    /// Critical-value table the statistic is judged against.
    pub fn table(&self) -> CriticalValueTable {
        self.table
    }

    fn degenerate(&self, error: AnalysisError) -> AnalysisError {
        match error {
            AnalysisError::NumericalError { reason, .. } => AnalysisError::StatisticalTestError {
                test_name: self.name().to_string(),
                reason,
            },
            other => other,
        }
    }

    /// `(tau, nobs)` of the Dickey-Fuller regression.
    fn statistic(&self, y: &[f64]) -> AnalysisResult<(f64, usize)> {
        let lag = self.config.max_lag;
        let n = y.len();
        if n < lag + 3 {
            return Err(AnalysisError::InsufficientData {
                required: lag + 3,
                actual: n,
            });
        }
        let nobs = n - lag - 1;
        if nobs < MIN_REGRESSION_OBS {
            return Err(AnalysisError::InsufficientData {
                required: lag + 1 + MIN_REGRESSION_OBS,
                actual: n,
            });
        }
        validate_all_finite(y, "ADF input")?;

        let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
        let has_const = self.config.deterministic.has_constant();
        let has_trend = self.config.deterministic.has_trend();
        let gamma_col = usize::from(has_const) + usize::from(has_trend);
        let k = gamma_col + 1 + lag;

        let mut design = DMatrix::zeros(nobs, k);
        for i in 0..nobs {
            let t = i + lag;
            let mut col = 0;
            if has_const {
                design[(i, col)] = 1.0;
                col += 1;
            }
            if has_trend {
                design[(i, col)] = (i + 1) as f64;
                col += 1;
            }
            design[(i, col)] = y[t];
            for j in 1..=lag {
                design[(i, col + j)] = dy[t - j];
            }
        }
        let response = DVector::from_fn(nobs, |i, _| dy[i + lag]);

        let fit = ols_fit(&design, &response)?;
        let tau = fit.t_statistic(gamma_col)?;
        Ok((tau, nobs))
    }
}

impl Default for AdfTest {
    fn default() -> Self {
        Self::new(AdfConfig::default())
    }
}

impl StationarityTest for AdfTest {
    fn name(&self) -> &str {
        match self.table {
            CriticalValueTable::Adf(_) => "ADF",
            CriticalValueTable::EngleGranger { .. } => "Engle-Granger ADF",
        }
    }

    fn test(&self, series: &[f64]) -> AnalysisResult<StationarityResult> {
        let (statistic, nobs) = self.statistic(series).map_err(|e| self.degenerate(e))?;
        let sample_size = series.len();
        Ok(StationarityResult {
            statistic,
            p_value: self.table.p_value(statistic, sample_size)?,
            critical_values: self.table.critical_values(sample_size)?,
            used_lag: self.config.max_lag,
            nobs,
        })
    }
}

/// Rolling ADF row.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdfRow {
    /// Test statistic
    pub adf_stat: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// 1% critical value
    pub critical_1pct: f64,
    /// 5% critical value
    pub critical_5pct: f64,
    /// 10% critical value
    pub critical_10pct: f64,
    /// Statistic below the critical value at the chosen significance
    pub is_stationary: Option<bool>,
}

impl AdfRow {
    /// Row for an index with no computable test.
    pub fn sentinel() -> Self {
        Self {
            adf_stat: SENTINEL,
            p_value: SENTINEL,
            critical_1pct: SENTINEL,
            critical_5pct: SENTINEL,
            critical_10pct: SENTINEL,
            is_stationary: None,
        }
    }

    pub(crate) fn from_result(result: &StationarityResult, level: ConfidenceLevel) -> Self {
        let cv = |at| result.critical_value(at).unwrap_or(SENTINEL);
        Self {
            adf_stat: result.statistic,
            p_value: result.p_value,
            critical_1pct: cv(ConfidenceLevel::OnePercent),
            critical_5pct: cv(ConfidenceLevel::FivePercent),
            critical_10pct: cv(ConfidenceLevel::TenPercent),
            is_stationary: Some(result.rejects_unit_root(level)),
        }
    }
}

impl TableRow for AdfRow {
    fn fields(&self) -> Vec<(String, f64)> {
        vec![
            ("adf_stat".to_string(), self.adf_stat),
            ("p_value".to_string(), self.p_value),
            ("critical_1pct".to_string(), self.critical_1pct),
            ("critical_5pct".to_string(), self.critical_5pct),
            ("critical_10pct".to_string(), self.critical_10pct),
            ("is_stationary".to_string(), flag_value(self.is_stationary)),
        ]
    }
}

/// Stationarity test over a rolling window.
///
/// A window whose test fails becomes a sentinel row; the run continues.
#[derive(Clone)]
pub struct RollingAdf {
    spec: WindowSpec,
    test: Arc<dyn StationarityTest>,
    level: ConfidenceLevel,
}

impl fmt::Debug for RollingAdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingAdf")
            .field("window", &self.spec.window)
            .field("test", &self.test.name())
            .field("level", &self.level)
            .finish()
    }
}

impl RollingAdf {
    /// Rolling ADF with the built-in backend at 5% significance.
    pub fn new(window: usize, config: AdfConfig) -> AnalysisResult<Self> {
        Self::with_test(window, Arc::new(AdfTest::new(config)))
    }

    /// Rolling test with any backend.
    pub fn with_test(window: usize, test: Arc<dyn StationarityTest>) -> AnalysisResult<Self> {
        Ok(Self {
            spec: WindowSpec::new(window)?,
            test,
            level: ConfidenceLevel::FivePercent,
        })
    }

    /// Sets the significance used for `is_stationary` (0.01, 0.05 or 0.10).
    pub fn with_significance(mut self, significance: f64) -> AnalysisResult<Self> {
        self.level = ConfidenceLevel::from_alpha(significance)?;
        Ok(self)
    }

    /// One row per input index.
    pub fn compute(&self, values: &[f64]) -> AnalysisResult<Vec<AdfRow>> {
        let buffer = WindowBuffer::new(values, self.spec)?;
        let degraded = DegradedWindows::default();
        let rows = buffer.map_windows(AdfRow::sentinel(), |t, window| {
            match self.test.test(window) {
                Ok(result) => AdfRow::from_result(&result, self.level),
                Err(e) => {
                    degraded.record("rolling ADF", t, &e);
                    AdfRow::sentinel()
                }
            }
        });
        degraded.report("rolling ADF", values.len() - buffer.first_index());
        Ok(rows)
    }
}
