//! # Johansen VECM Decomposition
//!
//! For `n_vars` aligned series `Y`, the vector error-correction model
//!
//! ```text
//! ΔY[t] = Π Y[t-1] + Σ_{i=1..p-1} Γ_i ΔY[t-i] + c + ε[t],    Π = α β'
//! ```
//!
//! is reduced to a generalized eigenvalue problem on product-moment matrices
//! of the residuals `R0` (of `ΔY[t]`) and `R1` (of `Y[t-1]`) after the
//! short-run regressors are projected out:
//!
//! ```text
//! | λ S11 - S10 S00^{-1} S01 | = 0
//! ```
//!
//! With `S11 = L L'` the problem becomes the symmetric eigenproblem of
//! `L^{-1} S10 S00^{-1} S01 L^{-T}`, whose eigenvectors map back to the
//! cointegrating vectors through `β = L^{-T} v`.
//!
//! ## References
//! - Johansen, S. (1991). "Estimation and Hypothesis Testing of
//!   Cointegration Vectors in Gaussian Vector Autoregressive Models."
//!   Econometrica 59, 1551-1580.
//! - Osterwald-Lenum, M. (1992). Oxford Bulletin of Economics and Statistics
//!   54, 461-472.

use crate::errors::{validate_all_finite, AnalysisError, AnalysisResult};
use crate::linear_algebra::{residualize, spd_inverse};
use crate::rank::{
    estimate_rank, DeterministicOrder, JohansenColumn, JohansenCriticalValues, JohansenStatistic,
};
use crate::results::TableRow;
use crate::series::SENTINEL;
use crate::window::{DegradedWindows, MultiWindowBuffer, WindowSpec};
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Eigenvalues at or below this are treated as zero.
pub const MIN_EIGENVALUE: f64 = 1e-10;

/// VECM specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JohansenConfig {
    /// Deterministic terms
    pub det_order: DeterministicOrder,
    /// VAR lag order `p`; the VECM carries `p - 1` lagged differences
    pub lag_order: usize,
}

impl Default for JohansenConfig {
    fn default() -> Self {
        Self {
            det_order: DeterministicOrder::UnrestrictedConstant,
            lag_order: 1,
        }
    }
}

impl JohansenConfig {
    /// Checks that the lag order is at least one.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.lag_order == 0 {
            return Err(AnalysisError::InvalidParameter {
                parameter: "lag_order".to_string(),
                value: 0.0,
                constraint: "at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Output of a VECM eigen-decomposition.
#[derive(Debug, Clone)]
pub struct VecmResult {
    /// Eigenvalues in descending order, clamped to `[0, 1)`
    pub eigenvalues: Vec<f64>,
    /// Trace statistics for `r = 0..n_vars`
    pub trace_stats: Vec<f64>,
    /// Maximum-eigenvalue statistics for `r = 0..n_vars`
    pub max_eigen_stats: Vec<f64>,
    /// Trace critical values per `r`, columns 10% / 5% / 1%
    pub trace_critical_values: Vec<[f64; 3]>,
    /// Maximum-eigenvalue critical values per `r`
    pub max_eigen_critical_values: Vec<[f64; 3]>,
    /// Cointegrating vectors as columns, ordered like `eigenvalues`
    pub eigenvectors: DMatrix<f64>,
    /// Observations in the VECM regression
    pub n_obs: usize,
}

impl VecmResult {
    /// Number of series.
    pub fn n_vars(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Rank by the sequential trace test.
    pub fn rank_trace(&self, column: JohansenColumn) -> AnalysisResult<usize> {
        estimate_rank(&self.trace_stats, &self.trace_critical_values, column)
    }

    /// Rank by the sequential maximum-eigenvalue test.
    pub fn rank_max_eigen(&self, column: JohansenColumn) -> AnalysisResult<usize> {
        estimate_rank(&self.max_eigen_stats, &self.max_eigen_critical_values, column)
    }

    /// First cointegrating vector scaled so its first element is one.
    ///
    /// `None` when the leading eigenvalue is zero. The vector is left
    /// unscaled when its first element is numerically zero.
    pub fn normalized_beta(&self) -> Option<Vec<f64>> {
        if self.eigenvalues.first().copied().unwrap_or(0.0) <= MIN_EIGENVALUE {
            return None;
        }
        let beta: Vec<f64> = self.eigenvectors.column(0).iter().copied().collect();
        let scale = beta[0];
        if scale.abs() > MIN_EIGENVALUE {
            Some(beta.iter().map(|b| b / scale).collect())
        } else {
            Some(beta)
        }
    }
}

/// A VECM eigen-decomposition over aligned series.
pub trait VecmDecomposition: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Decomposes the system formed by `columns` (one slice per series).
    fn decompose(&self, columns: &[&[f64]]) -> AnalysisResult<VecmResult>;
}

/// Johansen maximum-likelihood procedure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JohansenProcedure {
    config: JohansenConfig,
}

impl JohansenProcedure {
    /// Validated procedure.
    pub fn new(config: JohansenConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// VECM specification.
    pub fn config(&self) -> &JohansenConfig {
        &self.config
    }

    fn numerical(reason: &str) -> AnalysisError {
        AnalysisError::NumericalError {
            reason: reason.to_string(),
            operation: Some("johansen".to_string()),
        }
    }
}

impl VecmDecomposition for JohansenProcedure {
    fn name(&self) -> &str {
        "Johansen"
    }

    fn decompose(&self, columns: &[&[f64]]) -> AnalysisResult<VecmResult> {
        let k = columns.len();
        if k < 2 {
            return Err(AnalysisError::InsufficientData {
                required: 2,
                actual: k,
            });
        }
        let t_len = columns[0].len();
        for column in columns {
            if column.len() != t_len {
                return Err(AnalysisError::LengthMismatch {
                    left: t_len,
                    right: column.len(),
                });
            }
            validate_all_finite(column, "Johansen input")?;
        }

        let p = self.config.lag_order;
        let required = (p + 3).max(k + 5).max(p + k + 3);
        if t_len < required {
            return Err(AnalysisError::InsufficientData {
                required,
                actual: t_len,
            });
        }
        let n_obs = t_len - p - 1;

        let level = |t: usize, j: usize| columns[j][t];
        let diff = |t: usize, j: usize| columns[j][t + 1] - columns[j][t];

        let z0 = DMatrix::from_fn(n_obs, k, |t, j| diff(t + p, j));
        let z1 = DMatrix::from_fn(n_obs, k, |t, j| level(t + p, j));

        let n_lagged = (p - 1) * k;
        let has_constant = self.config.det_order.has_constant();
        let n_z2 = n_lagged + usize::from(has_constant);
        let z2 = DMatrix::from_fn(n_obs, n_z2, |t, col| {
            if col < n_lagged {
                let lag = col / k + 1;
                diff(t + p - lag, col % k)
            } else {
                1.0
            }
        });

        let r0 = residualize(&z0, &z2)?;
        let r1 = residualize(&z1, &z2)?;

        let scale = 1.0 / n_obs as f64;
        let s00 = r0.transpose() * &r0 * scale;
        let s11 = r1.transpose() * &r1 * scale;
        let s01 = r0.transpose() * &r1 * scale;
        let s10 = s01.transpose();

        let s00_inverse = spd_inverse(s00, "johansen_s00")?;
        let chol = Cholesky::new(s11).ok_or_else(|| Self::numerical("S11 is not positive definite"))?;
        let l_inverse = chol
            .l()
            .try_inverse()
            .ok_or_else(|| Self::numerical("Cholesky factor of S11 is singular"))?;

        let product = &s10 * &s00_inverse * &s01;
        let c = &l_inverse * product * l_inverse.transpose();
        let c = (&c + c.transpose()) * 0.5;

        let eigen = SymmetricEigen::new(c);
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let eigenvalues: Vec<f64> = order
            .iter()
            .map(|&i| eigen.eigenvalues[i].clamp(0.0, 1.0 - MIN_EIGENVALUE))
            .collect();
        if eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(Self::numerical("non-finite eigenvalue"));
        }

        let sorted_vectors = DMatrix::from_fn(k, k, |i, j| eigen.eigenvectors[(i, order[j])]);
        let eigenvectors = l_inverse.transpose() * sorted_vectors;

        let log_terms: Vec<f64> = eigenvalues
            .iter()
            .map(|&lambda| {
                if lambda > MIN_EIGENVALUE {
                    -(1.0 - lambda).ln()
                } else {
                    0.0
                }
            })
            .collect();
        let n = n_obs as f64;
        let trace_stats: Vec<f64> = (0..k).map(|r| n * log_terms[r..].iter().sum::<f64>()).collect();
        let max_eigen_stats: Vec<f64> = log_terms.iter().map(|term| n * term).collect();

        let det_order = self.config.det_order;
        Ok(VecmResult {
            eigenvalues,
            trace_stats,
            max_eigen_stats,
            trace_critical_values: JohansenCriticalValues::new(JohansenStatistic::Trace, det_order)
                .rows(k)?,
            max_eigen_critical_values: JohansenCriticalValues::new(JohansenStatistic::MaxEigen, det_order)
                .rows(k)?,
            eigenvectors,
            n_obs,
        })
    }
}

/// Johansen result for one window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JohansenRow {
    /// Cointegration rank
    pub rank: Option<usize>,
    /// Trace statistics, one per series
    pub trace_stats: Vec<f64>,
    /// Maximum-eigenvalue statistics, one per series
    pub max_stats: Vec<f64>,
    /// Eigenvalues in descending order
    pub eigenvalues: Vec<f64>,
    /// First cointegrating vector, first element one
    pub beta: Vec<f64>,
    /// `beta · Y` at the window's last index
    pub spread: f64,
}

impl JohansenRow {
    /// Row for an index with no computable decomposition.
    pub fn sentinel(n_vars: usize) -> Self {
        Self {
            rank: None,
            trace_stats: vec![SENTINEL; n_vars],
            max_stats: vec![SENTINEL; n_vars],
            eigenvalues: vec![SENTINEL; n_vars],
            beta: vec![SENTINEL; n_vars],
            spread: SENTINEL,
        }
    }
}

impl TableRow for JohansenRow {
    fn fields(&self) -> Vec<(String, f64)> {
        let mut fields = vec![(
            "rank".to_string(),
            self.rank.map_or(SENTINEL, |r| r as f64),
        )];
        let groups = [
            ("trace_stat", &self.trace_stats),
            ("max_stat", &self.max_stats),
            ("eigval", &self.eigenvalues),
            ("beta", &self.beta),
        ];
        for (prefix, values) in groups {
            fields.extend(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (format!("{}_{}", prefix, i), *v)),
            );
        }
        fields.push(("spread".to_string(), self.spread));
        fields
    }
}

/// Rolling Johansen rank estimation.
#[derive(Clone)]
pub struct RollingJohansen {
    spec: WindowSpec,
    backend: Arc<dyn VecmDecomposition>,
    statistic: JohansenStatistic,
    column: JohansenColumn,
}

impl fmt::Debug for RollingJohansen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingJohansen")
            .field("window", &self.spec.window)
            .field("backend", &self.backend.name())
            .field("statistic", &self.statistic)
            .field("column", &self.column)
            .finish()
    }
}

impl RollingJohansen {
    /// Trace-test rank at 5% with the built-in procedure.
    pub fn new(window: usize, config: JohansenConfig) -> AnalysisResult<Self> {
        Self::with_backend(window, Arc::new(JohansenProcedure::new(config)?))
    }

    /// Rolling rank with any decomposition backend.
    pub fn with_backend(window: usize, backend: Arc<dyn VecmDecomposition>) -> AnalysisResult<Self> {
        Ok(Self {
            spec: WindowSpec::new(window)?,
            backend,
            statistic: JohansenStatistic::Trace,
            column: JohansenColumn::FivePercent,
        })
    }

    /// Decides the rank with `statistic` instead of the trace test.
    pub fn with_statistic(mut self, statistic: JohansenStatistic) -> Self {
        self.statistic = statistic;
        self
    }

    /// Critical-value column for the rank decision.
    pub fn with_column(mut self, column: JohansenColumn) -> Self {
        self.column = column;
        self
    }

    /// Decomposes one window and derives its row.
    pub fn test_window(&self, columns: &[&[f64]]) -> AnalysisResult<JohansenRow> {
        let result = self.backend.decompose(columns)?;
        let rank = match self.statistic {
            JohansenStatistic::Trace => result.rank_trace(self.column)?,
            JohansenStatistic::MaxEigen => result.rank_max_eigen(self.column)?,
        };

        let n_vars = columns.len();
        let (beta, spread) = match result.normalized_beta() {
            Some(beta) => {
                let spread: f64 = beta
                    .iter()
                    .zip(columns)
                    .map(|(b, column)| b * column[column.len() - 1])
                    .sum();
                (beta, spread)
            }
            None => (vec![SENTINEL; n_vars], SENTINEL),
        };

        Ok(JohansenRow {
            rank: Some(rank),
            trace_stats: result.trace_stats,
            max_stats: result.max_eigen_stats,
            eigenvalues: result.eigenvalues,
            beta,
            spread,
        })
    }

    /// One row per input index; failing windows become sentinel rows.
    pub fn compute(&self, columns: &[&[f64]]) -> AnalysisResult<Vec<JohansenRow>> {
        let buffer = MultiWindowBuffer::new(columns, self.spec)?;
        let n_vars = buffer.n_vars();
        let degraded = DegradedWindows::default();
        let rows = buffer.map_windows(JohansenRow::sentinel(n_vars), |t, window| {
            self.test_window(window).unwrap_or_else(|e| {
                degraded.record("Johansen", t, &e);
                JohansenRow::sentinel(n_vars)
            })
        });
        degraded.report("Johansen", buffer.len() - buffer.first_index());
        Ok(rows)
    }
}
