//! # Fixed-Width Fractional Differentiation (FFD)
//!
//! Fractional differencing generalizes the integer difference operator
//! `(1 - B)^d` to a real order `d`. Expanding the binomial series gives the
//! weight recurrence
//!
//! ```text
//! w[0] = 1
//! w[k] = -w[k-1] * (d - k + 1) / k
//! ```
//!
//! which is truncated at the first weight whose magnitude falls below a
//! threshold. The surviving weights are applied as a causal convolution, so
//! the filter keeps far more memory than a first difference while still
//! removing most of the unit root.
//!
//! ## References
//! - López de Prado, M. (2018). *Advances in Financial Machine Learning*,
//!   Chapter 5. Wiley.

use crate::errors::{validate_data_length, AnalysisError, AnalysisResult};
use crate::series::SENTINEL;
use crate::stationarity::{StationarityResult, StationarityTest};
use crate::window::collect_rolling;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hard cap on the number of weights.
pub const DEFAULT_MAX_WEIGHTS: usize = 10_000;

/// Default truncation threshold.
pub const DEFAULT_THRESHOLD: f64 = 1e-5;

/// Parameters of the FFD weight series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FfdParams {
    /// Differencing order; conventionally in (0, 2) but not restricted
    pub d: f64,
    /// Weights with magnitude below this end the series
    pub threshold: f64,
    /// Maximum number of weights
    pub max_size: usize,
}

impl Default for FfdParams {
    fn default() -> Self {
        Self {
            d: 0.5,
            threshold: DEFAULT_THRESHOLD,
            max_size: DEFAULT_MAX_WEIGHTS,
        }
    }
}

impl FfdParams {
    /// Validated parameters with the default weight cap.
    pub fn new(d: f64, threshold: f64) -> AnalysisResult<Self> {
        let params = Self {
            d,
            threshold,
            max_size: DEFAULT_MAX_WEIGHTS,
        };
        params.validate()?;
        Ok(params)
    }

    /// Replaces the weight cap.
    pub fn with_max_size(mut self, max_size: usize) -> AnalysisResult<Self> {
        self.max_size = max_size;
        self.validate()?;
        Ok(self)
    }

    /// Checks that `d` is finite, the threshold positive and the cap non-zero.
    pub fn validate(&self) -> AnalysisResult<()> {
        if !self.d.is_finite() {
            return Err(AnalysisError::InvalidParameter {
                parameter: "d".to_string(),
                value: self.d,
                constraint: "a finite real".to_string(),
            });
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(AnalysisError::InvalidParameter {
                parameter: "threshold".to_string(),
                value: self.threshold,
                constraint: "a finite value > 0".to_string(),
            });
        }
        if self.max_size == 0 {
            return Err(AnalysisError::InvalidParameter {
                parameter: "max_size".to_string(),
                value: 0.0,
                constraint: "at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Truncated FFD weights, lag 0 first.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightSeries {
    weights: Vec<f64>,
    truncated: bool,
}

impl WeightSeries {
    /// The weights, `w[0] == 1.0`.
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Effective window of the filter.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Never true: the series always holds `w[0]`.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Whether generation stopped at the weight cap rather than the threshold.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Sum of the weights; the response of the filter to a unit step.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl AsRef<[f64]> for WeightSeries {
    fn as_ref(&self) -> &[f64] {
        &self.weights
    }
}

/// Generates the FFD weight series for `params`.
///
/// Generation stops at the first weight with `|w| < threshold` (that weight
/// is excluded) or once `max_size` weights exist.
///
/// # Example
/// ```rust
/// use stationarity_finance::fracdiff::{compute_ffd_weights, FfdParams};
///
/// let weights = compute_ffd_weights(&FfdParams::new(1.0, 1e-8).unwrap()).unwrap();
/// assert_eq!(weights.as_slice(), &[1.0, -1.0]);
/// ```
pub fn compute_ffd_weights(params: &FfdParams) -> AnalysisResult<WeightSeries> {
    params.validate()?;

    let mut weights = Vec::with_capacity(params.max_size.min(1000));
    weights.push(1.0);

    let mut w = 1.0_f64;
    let mut truncated = false;
    for k in 1_usize.. {
        if weights.len() >= params.max_size {
            truncated = true;
            break;
        }
        let kf = k as f64;
        w = -w * (params.d - kf + 1.0) / kf;
        if w.abs() < params.threshold {
            break;
        }
        weights.push(w);
    }

    if truncated {
        log::warn!(
            "FFD weights for d = {} reached the cap of {} before falling below threshold {:e}",
            params.d,
            params.max_size,
            params.threshold
        );
    }
    log::debug!(
        "FFD effective window for d = {}, threshold = {:e}: {}",
        params.d,
        params.threshold,
        weights.len()
    );

    Ok(WeightSeries { weights, truncated })
}

/// Causal FFD filter with weights computed once at construction.
#[derive(Debug, Clone)]
pub struct FracDiffFilter {
    params: FfdParams,
    weights: WeightSeries,
}

impl FracDiffFilter {
    /// Builds the filter and its weight series.
    pub fn new(params: FfdParams) -> AnalysisResult<Self> {
        let weights = compute_ffd_weights(&params)?;
        Ok(Self { params, weights })
    }

    /// Parameters the filter was built with.
    pub fn params(&self) -> &FfdParams {
        &self.params
    }

    /// The weight series.
    pub fn weights(&self) -> &WeightSeries {
        &self.weights
    }

    /// Number of observations each output depends on.
    pub fn effective_window(&self) -> usize {
        self.weights.len()
    }

    /// Filters `values`.
    ///
    /// `output[t] = Σ_k w[k] * values[t - k]` for `t >= len(weights) - 1`;
    /// earlier indices are sentinels, and so is every output whose window
    /// contains a NaN. A series shorter than the weight series yields an
    /// all-sentinel output.
    ///
    /// # Errors
    /// `InsufficientData` for an empty series.
    pub fn apply(&self, values: &[f64]) -> AnalysisResult<Vec<f64>> {
        validate_data_length(values, 1)?;

        let weights = self.weights.as_slice();
        let width = weights.len();
        if width > values.len() {
            log::debug!(
                "FFD window {} exceeds series length {}; output is all sentinel",
                width,
                values.len()
            );
            return Ok(vec![SENTINEL; values.len()]);
        }

        Ok(collect_rolling(values.len(), width - 1, SENTINEL, |t| {
            let mut sum = 0.0;
            for (k, w) in weights.iter().enumerate() {
                let x = values[t - k];
                if x.is_nan() {
                    return SENTINEL;
                }
                sum += w * x;
            }
            sum
        }))
    }
}

/// Outcome of one candidate order in [`find_min_ffd_order`].
#[derive(Debug, Clone)]
pub struct FfdCandidate {
    /// Differencing order tried
    pub d: f64,
    /// Number of weights at this order
    pub effective_window: usize,
    /// Test result on the filtered series, if the test succeeded
    pub result: Option<StationarityResult>,
    /// Why the candidate could not be evaluated
    pub failure: Option<AnalysisError>,
}

impl FfdCandidate {
    /// Whether the filtered series was judged stationary at `significance`.
    pub fn is_stationary(&self, significance: f64) -> Option<bool> {
        self.result.as_ref().map(|r| r.p_value < significance)
    }
}

/// Result of the minimum-order search.
#[derive(Debug, Clone)]
pub struct MinFfdOrder {
    /// Smallest order whose filtered series is stationary
    pub selected: Option<f64>,
    /// Every candidate in ascending order of `d`
    pub candidates: Vec<FfdCandidate>,
}

/// Searches for the smallest `d` that makes `values` stationary.
///
/// Each candidate filters the series with `threshold`, strips the sentinel
/// outputs and hands the remainder to `test`. A candidate whose test fails
/// is recorded with its error and the search continues.
pub fn find_min_ffd_order(
    values: &[f64],
    candidates: &[f64],
    threshold: f64,
    test: &dyn StationarityTest,
    significance: f64,
) -> AnalysisResult<MinFfdOrder> {
    validate_data_length(values, 1)?;
    if candidates.is_empty() {
        return Err(AnalysisError::InvalidParameter {
            parameter: "candidates".to_string(),
            value: 0.0,
            constraint: "at least one differencing order".to_string(),
        });
    }

    let mut orders = candidates.to_vec();
    for &d in &orders {
        FfdParams::new(d, threshold)?;
    }
    orders.sort_by(|a, b| a.total_cmp(b));

    let mut results = Vec::with_capacity(orders.len());
    for d in orders {
        let filter = FracDiffFilter::new(FfdParams::new(d, threshold)?)?;
        let filtered: Vec<f64> = filter
            .apply(values)?
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();

        let (result, failure) = match test.test(&filtered) {
            Ok(result) => (Some(result), None),
            Err(e) => {
                log::warn!("{} failed for d = {}: {}", test.name(), d, e);
                (None, Some(e))
            }
        };
        results.push(FfdCandidate {
            d,
            effective_window: filter.effective_window(),
            result,
            failure,
        });
    }

    let selected = results
        .iter()
        .find(|c| c.is_stationary(significance) == Some(true))
        .map(|c| c.d);

    Ok(MinFfdOrder {
        selected,
        candidates: results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critical_values::ConfidenceLevel;
    use assert_approx_eq::assert_approx_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_weight_recurrence() {
        let params = FfdParams::new(0.4, 1e-4).unwrap();
        let weights = compute_ffd_weights(&params).unwrap();
        let w = weights.as_slice();

        assert_eq!(w[0], 1.0);
        for k in 1..w.len() {
            let expected = -w[k - 1] * (params.d - k as f64 + 1.0) / k as f64;
            assert_approx_eq!(w[k], expected, 1e-15);
            assert!(w[k].abs() >= params.threshold);
            assert!(w[k].abs() < w[k - 1].abs());
        }

        // The first weight past the end is below threshold
        let k = w.len() as f64;
        let next = -w[w.len() - 1] * (params.d - k + 1.0) / k;
        assert!(next.abs() < params.threshold);
        assert!(!weights.truncated());
    }

    #[test]
    fn test_identity_filter() {
        let filter = FracDiffFilter::new(FfdParams::new(0.0, 1e-5).unwrap()).unwrap();
        assert_eq!(filter.weights().as_slice(), &[1.0]);

        let values = vec![3.0, -1.5, 2.25, 8.0];
        assert_eq!(filter.apply(&values).unwrap(), values);
    }

    #[test]
    fn test_first_difference_filter() {
        let filter = FracDiffFilter::new(FfdParams::new(1.0, 1e-8).unwrap()).unwrap();
        assert_eq!(filter.weights().as_slice(), &[1.0, -1.0]);

        let values = vec![1.0, 4.0, 9.0, 16.0];
        let out = filter.apply(&values).unwrap();
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_weight_cap() {
        let params = FfdParams::new(0.5, 1e-12)
            .unwrap()
            .with_max_size(50)
            .unwrap();
        let weights = compute_ffd_weights(&params).unwrap();
        assert_eq!(weights.len(), 50);
        assert!(weights.truncated());
    }

    #[test]
    fn test_invalid_params() {
        assert!(FfdParams::new(f64::NAN, 1e-5).is_err());
        assert!(FfdParams::new(0.5, 0.0).is_err());
        assert!(FfdParams::new(0.5, -1e-5).is_err());
        assert!(FfdParams::default().with_max_size(0).is_err());
    }

    #[test]
    fn test_warm_up_and_nan_propagation() {
        let filter = FracDiffFilter::new(FfdParams::new(0.6, 1e-2).unwrap()).unwrap();
        let width = filter.effective_window();
        assert!(width > 2);

        let mut values: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin() + 10.0).collect();
        values[20] = f64::NAN;
        let out = filter.apply(&values).unwrap();

        assert_eq!(out.len(), values.len());
        for v in &out[..width - 1] {
            assert!(v.is_nan());
        }
        assert!(out[width - 1].is_finite());
        for v in &out[20..20 + width] {
            assert!(v.is_nan());
        }
        assert!(out[20 + width].is_finite());
    }

    #[test]
    fn test_short_series_is_all_sentinel() {
        let filter = FracDiffFilter::new(FfdParams::new(0.5, 1e-5).unwrap()).unwrap();
        assert!(filter.effective_window() > 100);

        let linear: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let out = filter.apply(&linear).unwrap();
        assert_eq!(out.len(), 100);
        assert!(out.iter().all(|v| v.is_nan()));

        assert!(filter.apply(&[]).is_err());
    }

    /// Stationary iff the series is flat
    struct FlatSeriesTest;

    impl StationarityTest for FlatSeriesTest {
        fn name(&self) -> &str {
            "flat"
        }

        fn test(&self, series: &[f64]) -> AnalysisResult<StationarityResult> {
            validate_data_length(series, 10)?;
            let max = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let min = series.iter().cloned().fold(f64::INFINITY, f64::min);
            let p_value = if max - min < 1e-9 { 0.001 } else { 0.5 };
            Ok(StationarityResult {
                statistic: max - min,
                p_value,
                critical_values: BTreeMap::from([(ConfidenceLevel::FivePercent, 0.0)]),
                used_lag: 0,
                nobs: series.len(),
            })
        }
    }

    #[test]
    fn test_find_min_ffd_order() {
        let linear: Vec<f64> = (0..500).map(|i| i as f64).collect();
        let search =
            find_min_ffd_order(&linear, &[1.0, 0.0, 0.5], 1e-4, &FlatSeriesTest, 0.05).unwrap();

        let orders: Vec<f64> = search.candidates.iter().map(|c| c.d).collect();
        assert_eq!(orders, vec![0.0, 0.5, 1.0]);
        assert_eq!(search.selected, Some(1.0));
        assert_eq!(search.candidates[0].is_stationary(0.05), Some(false));
        assert_eq!(search.candidates[2].effective_window, 2);
    }

    #[test]
    fn test_find_min_ffd_order_records_failures() {
        // Too short for any output at d = 0.5, so the test sees no data
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let search =
            find_min_ffd_order(&values, &[0.5, 1.0], 1e-5, &FlatSeriesTest, 0.05).unwrap();

        assert!(search.candidates[0].failure.is_some());
        assert!(search.candidates[0].is_stationary(0.05).is_none());
        assert_eq!(search.selected, Some(1.0));

        assert!(find_min_ffd_order(&values, &[], 1e-5, &FlatSeriesTest, 0.05).is_err());
    }
}
