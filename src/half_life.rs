//! Rolling AR(1) mean-reversion half-life.
//!
//! Each window is read as a lag-1 sample `(y[i], y[i-1])` and the AR(1)
//! coefficient is estimated from sample moments:
//!
//! ```text
//! phi = cov(y_t, y_lag) / var(y_lag)      (both with N-1 denominators)
//! half_life = -ln(2) / ln(phi)            for 0 < phi < 1
//! ```
//!
//! The half-life is capped at `window * 10` so near-unit-root windows report a
//! bounded value instead of an arbitrarily large one.

use crate::errors::AnalysisResult;
use crate::results::{flag_value, TableRow};
use crate::series::SENTINEL;
use crate::window::{WindowBuffer, WindowSpec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lag variances at or below this give `phi = 0`.
pub const MIN_LAG_VARIANCE: f64 = 1e-10;

/// Half-lives are capped at `window * HALF_LIFE_CAP_FACTOR`.
pub const HALF_LIFE_CAP_FACTOR: f64 = 10.0;

/// Half-life estimate for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HalfLifeRow {
    /// AR(1) coefficient
    pub phi: f64,
    /// Periods to close half the gap to the mean; NaN unless `0 < phi < 1`
    pub half_life: f64,
    /// `0 < phi < 1`; `None` when `phi` itself is not computable
    pub is_mean_reverting: Option<bool>,
}

impl HalfLifeRow {
    /// Row for an index with no computable estimate.
    pub fn sentinel() -> Self {
        Self {
            phi: SENTINEL,
            half_life: SENTINEL,
            is_mean_reverting: None,
        }
    }
}

impl TableRow for HalfLifeRow {
    fn fields(&self) -> Vec<(String, f64)> {
        vec![
            ("phi".to_string(), self.phi),
            ("half_life".to_string(), self.half_life),
            (
                "is_mean_reverting".to_string(),
                flag_value(self.is_mean_reverting),
            ),
        ]
    }
}

/// AR(1) coefficient of a window, or `None` with fewer than two valid pairs.
///
/// Pairs where either side is NaN are skipped, and `N` is the number of
/// pairs that remain.
pub fn ar1_coefficient(window: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = window
        .windows(2)
        .map(|w| (w[1], w[0]))
        .filter(|(y, lag)| !y.is_nan() && !lag.is_nan())
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_y = pairs.iter().map(|(y, _)| y).sum::<f64>() / n;
    let mean_lag = pairs.iter().map(|(_, lag)| lag).sum::<f64>() / n;

    let (cross, lag_sq) = pairs.iter().fold((0.0, 0.0), |(cross, lag_sq), (y, lag)| {
        let dl = lag - mean_lag;
        (cross + (y - mean_y) * dl, lag_sq + dl * dl)
    });
    let cov = cross / (n - 1.0);
    let var_lag = lag_sq / (n - 1.0);

    if var_lag > MIN_LAG_VARIANCE {
        Some(cov / var_lag)
    } else {
        Some(0.0)
    }
}

/// Estimates `phi` and the half-life over one window.
///
/// The cap is `window.len() * 10`.
pub fn estimate_half_life(window: &[f64]) -> HalfLifeRow {
    let Some(phi) = ar1_coefficient(window) else {
        return HalfLifeRow::sentinel();
    };

    if phi > 0.0 && phi < 1.0 {
        let cap = window.len() as f64 * HALF_LIFE_CAP_FACTOR;
        let half_life = (-std::f64::consts::LN_2 / phi.ln()).min(cap);
        HalfLifeRow {
            phi,
            half_life,
            is_mean_reverting: Some(true),
        }
    } else {
        HalfLifeRow {
            phi,
            half_life: SENTINEL,
            is_mean_reverting: Some(false),
        }
    }
}

/// Rolling half-life over a fixed window.
///
/// # Example
/// ```rust
/// use stationarity_finance::half_life::HalfLifeEstimator;
///
/// // x[t] - 50 = 0.5 * (x[t-1] - 50)
/// let series: Vec<f64> = (0..12).map(|t| 50.0 + 32.0 * 0.5f64.powi(t)).collect();
/// let rows = HalfLifeEstimator::new(10).unwrap().compute(&series).unwrap();
/// assert!(rows[8].phi.is_nan());
/// assert!((rows[11].phi - 0.5).abs() < 1e-9);
/// assert!((rows[11].half_life - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HalfLifeEstimator {
    spec: WindowSpec,
}

impl HalfLifeEstimator {
    /// Creates an estimator over `window` observations.
    pub fn new(window: usize) -> AnalysisResult<Self> {
        Ok(Self {
            spec: WindowSpec::new(window)?,
        })
    }

    /// Window length.
    pub fn window(&self) -> usize {
        self.spec.window
    }

    /// One row per input index; the first `window - 1` rows are sentinels.
    pub fn compute(&self, values: &[f64]) -> AnalysisResult<Vec<HalfLifeRow>> {
        let buffer = WindowBuffer::new(values, self.spec)?;
        Ok(buffer.map_windows(HalfLifeRow::sentinel(), |_, window| {
            estimate_half_life(window)
        }))
    }
}
