//! Johansen cointegration-rank decision.
//!
//! The rank is found by sequential testing. Starting at `r = 0`, the
//! hypothesis "rank <= r" is rejected while the statistic for `r` exceeds
//! its critical value. The first non-rejection fixes the rank, and rejecting
//! every hypothesis gives full rank `n_vars`.
//!
//! Critical values are the Osterwald-Lenum (1992) tables, indexed by
//! `n_vars - r` in `1..=12` with columns ordered 10%, 5%, 1%.

use crate::critical_values::ConfidenceLevel;
use crate::errors::{AnalysisError, AnalysisResult};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest `n_vars - r` the tables cover.
pub const MAX_TABLE_DIMENSION: usize = 12;

/// Column of a Johansen critical-value row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JohansenColumn {
    /// 90% quantile (10% significance), column 0
    TenPercent,
    /// 95% quantile (5% significance), column 1
    FivePercent,
    /// 99% quantile (1% significance), column 2
    OnePercent,
}

impl JohansenColumn {
    /// Position in a table row.
    pub fn index(self) -> usize {
        match self {
            JohansenColumn::TenPercent => 0,
            JohansenColumn::FivePercent => 1,
            JohansenColumn::OnePercent => 2,
        }
    }
}

impl From<ConfidenceLevel> for JohansenColumn {
    fn from(level: ConfidenceLevel) -> Self {
        match level {
            ConfidenceLevel::OnePercent => JohansenColumn::OnePercent,
            ConfidenceLevel::FivePercent => JohansenColumn::FivePercent,
            ConfidenceLevel::TenPercent => JohansenColumn::TenPercent,
        }
    }
}

/// Deterministic terms of the VECM, numbered -1, 0, 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeterministicOrder {
    /// -1: no intercept or trend
    NoDeterministic,
    /// 0: constant restricted to the cointegrating relation
    RestrictedConstant,
    /// 1: unrestricted constant
    #[default]
    UnrestrictedConstant,
}

impl DeterministicOrder {
    /// Numeric order.
    pub fn as_i32(self) -> i32 {
        match self {
            DeterministicOrder::NoDeterministic => -1,
            DeterministicOrder::RestrictedConstant => 0,
            DeterministicOrder::UnrestrictedConstant => 1,
        }
    }

    /// Whether the short-run regression carries a constant.
    pub fn has_constant(self) -> bool {
        self != DeterministicOrder::NoDeterministic
    }
}

impl TryFrom<i32> for DeterministicOrder {
    type Error = AnalysisError;

    fn try_from(order: i32) -> Result<Self, Self::Error> {
        match order {
            -1 => Ok(DeterministicOrder::NoDeterministic),
            0 => Ok(DeterministicOrder::RestrictedConstant),
            1 => Ok(DeterministicOrder::UnrestrictedConstant),
            other => Err(AnalysisError::InvalidParameter {
                parameter: "det_order".to_string(),
                value: other as f64,
                constraint: "one of -1, 0, 1".to_string(),
            }),
        }
    }
}

impl fmt::Display for DeterministicOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// Trace or maximum-eigenvalue statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JohansenStatistic {
    /// H0: rank <= r against rank > r
    Trace,
    /// H0: rank = r against rank = r + 1
    MaxEigen,
}

type CriticalTable = [[f64; 3]; MAX_TABLE_DIMENSION];

const TRACE_UNRESTRICTED_CONSTANT: CriticalTable = [
    [7.52, 9.24, 12.97],
    [17.85, 19.96, 24.60],
    [32.00, 34.91, 41.07],
    [49.65, 53.12, 60.16],
    [71.86, 76.07, 84.45],
    [97.18, 102.14, 111.01],
    [126.58, 131.70, 143.09],
    [159.48, 165.58, 177.20],
    [196.37, 202.92, 215.74],
    [236.54, 244.15, 257.68],
    [282.45, 291.40, 307.64],
    [330.81, 341.02, 359.41],
];

const MAX_EIGEN_UNRESTRICTED_CONSTANT: CriticalTable = [
    [7.52, 9.24, 12.97],
    [13.75, 15.67, 20.20],
    [19.77, 22.00, 26.81],
    [25.56, 28.14, 33.24],
    [31.66, 34.40, 39.79],
    [37.45, 40.30, 46.82],
    [43.25, 46.45, 52.31],
    [48.91, 52.00, 57.95],
    [54.35, 57.42, 63.71],
    [60.25, 63.57, 70.05],
    [66.02, 69.74, 76.28],
    [72.07, 76.07, 82.51],
];

const TRACE_RESTRICTED_CONSTANT: CriticalTable = [
    [2.69, 3.76, 6.65],
    [13.33, 15.41, 20.04],
    [26.79, 29.68, 35.65],
    [43.95, 47.21, 54.46],
    [64.84, 68.52, 77.74],
    [89.48, 94.15, 104.96],
    [118.50, 124.24, 136.06],
    [151.38, 157.87, 170.80],
    [188.21, 195.53, 209.95],
    [228.95, 237.19, 253.25],
    [273.00, 283.00, 300.00],
    [322.00, 333.00, 352.00],
];

const MAX_EIGEN_RESTRICTED_CONSTANT: CriticalTable = [
    [2.69, 3.76, 6.65],
    [12.07, 14.07, 18.63],
    [18.60, 20.97, 25.52],
    [24.73, 27.07, 32.24],
    [30.90, 33.46, 38.77],
    [36.76, 39.37, 45.10],
    [42.32, 44.91, 51.38],
    [48.33, 51.07, 57.69],
    [53.98, 56.74, 63.37],
    [59.62, 62.57, 69.09],
    [65.38, 68.83, 75.95],
    [71.80, 75.32, 83.00],
];

const TRACE_NO_DETERMINISTIC: CriticalTable = [
    [2.69, 3.76, 6.65],
    [12.07, 14.07, 18.63],
    [24.60, 27.58, 33.73],
    [40.49, 44.50, 51.54],
    [60.05, 64.84, 73.73],
    [83.20, 89.37, 99.45],
    [110.42, 117.45, 128.45],
    [141.01, 149.58, 162.30],
    [176.67, 186.54, 200.14],
    [215.17, 226.34, 241.55],
    [257.00, 270.00, 287.00],
    [303.00, 318.00, 337.00],
];

const MAX_EIGEN_NO_DETERMINISTIC: CriticalTable = [
    [2.69, 3.76, 6.65],
    [11.03, 12.98, 17.37],
    [17.18, 19.31, 23.65],
    [23.46, 25.73, 30.34],
    [29.37, 31.79, 36.90],
    [35.07, 37.69, 43.05],
    [40.78, 43.61, 49.51],
    [46.82, 49.95, 55.75],
    [52.50, 55.67, 61.24],
    [58.24, 61.29, 67.48],
    [64.24, 67.88, 74.36],
    [70.60, 74.50, 81.50],
];

/// Lookup into the Osterwald-Lenum tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JohansenCriticalValues {
    statistic: JohansenStatistic,
    det_order: DeterministicOrder,
}

impl JohansenCriticalValues {
    /// Table for one statistic and deterministic order.
    pub fn new(statistic: JohansenStatistic, det_order: DeterministicOrder) -> Self {
        Self {
            statistic,
            det_order,
        }
    }

    fn table(&self) -> &'static CriticalTable {
        use DeterministicOrder::*;
        use JohansenStatistic::*;
        match (self.statistic, self.det_order) {
            (Trace, NoDeterministic) => &TRACE_NO_DETERMINISTIC,
            (Trace, RestrictedConstant) => &TRACE_RESTRICTED_CONSTANT,
            (Trace, UnrestrictedConstant) => &TRACE_UNRESTRICTED_CONSTANT,
            (MaxEigen, NoDeterministic) => &MAX_EIGEN_NO_DETERMINISTIC,
            (MaxEigen, RestrictedConstant) => &MAX_EIGEN_RESTRICTED_CONSTANT,
            (MaxEigen, UnrestrictedConstant) => &MAX_EIGEN_UNRESTRICTED_CONSTANT,
        }
    }

    /// Critical value for testing rank `r` among `n_vars` series.
    pub fn critical_value(&self, n_vars: usize, r: usize, column: JohansenColumn) -> AnalysisResult<f64> {
        let dim = n_vars.saturating_sub(r);
        if !(1..=MAX_TABLE_DIMENSION).contains(&dim) {
            return Err(AnalysisError::InvalidParameter {
                parameter: "n_vars - r".to_string(),
                value: n_vars as f64 - r as f64,
                constraint: format!("[1, {}]", MAX_TABLE_DIMENSION),
            });
        }
        Ok(self.table()[dim - 1][column.index()])
    }

    /// Rows for `r = 0..n_vars`, each `[10%, 5%, 1%]`.
    pub fn rows(&self, n_vars: usize) -> AnalysisResult<Vec<[f64; 3]>> {
        if n_vars == 0 || n_vars > MAX_TABLE_DIMENSION {
            return Err(AnalysisError::InvalidParameter {
                parameter: "n_vars".to_string(),
                value: n_vars as f64,
                constraint: format!("[1, {}]", MAX_TABLE_DIMENSION),
            });
        }
        Ok((0..n_vars)
            .map(|r| self.table()[n_vars - r - 1])
            .collect())
    }
}

/// Sequential rank decision from statistics and their critical-value rows.
///
/// `stats[r]` is compared with `cvt[r][column]`; the chain stops at the
/// first statistic that does not exceed its critical value. A NaN statistic
/// never rejects.
///
/// # Example
/// ```rust
/// use stationarity_finance::rank::{estimate_rank, JohansenColumn};
///
/// let cvt = [[13.43, 15.49, 19.94], [2.71, 3.84, 6.63]];
/// assert_eq!(estimate_rank(&[20.1, 1.2], &cvt, JohansenColumn::FivePercent).unwrap(), 1);
/// assert_eq!(estimate_rank(&[20.1, 5.0], &cvt, JohansenColumn::FivePercent).unwrap(), 2);
/// assert_eq!(estimate_rank(&[10.0, 5.0], &cvt, JohansenColumn::FivePercent).unwrap(), 0);
/// ```
pub fn estimate_rank(stats: &[f64], cvt: &[[f64; 3]], column: JohansenColumn) -> AnalysisResult<usize> {
    if stats.is_empty() {
        return Err(AnalysisError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    if stats.len() != cvt.len() {
        return Err(AnalysisError::LengthMismatch {
            left: stats.len(),
            right: cvt.len(),
        });
    }

    let mut rank = 0;
    for (stat, row) in stats.iter().zip(cvt) {
        if *stat > row[column.index()] {
            rank += 1;
        } else {
            break;
        }
    }
    Ok(rank)
}

/// Rank from trace statistics for `r = 0..n_vars`.
pub fn estimate_rank_trace(
    trace_stats: &[f64],
    det_order: DeterministicOrder,
    column: JohansenColumn,
) -> AnalysisResult<usize> {
    let cvt = JohansenCriticalValues::new(JohansenStatistic::Trace, det_order).rows(trace_stats.len())?;
    estimate_rank(trace_stats, &cvt, column)
}

/// Rank from maximum-eigenvalue statistics for `r = 0..n_vars`.
pub fn estimate_rank_max_eigen(
    max_stats: &[f64],
    det_order: DeterministicOrder,
    column: JohansenColumn,
) -> AnalysisResult<usize> {
    let cvt = JohansenCriticalValues::new(JohansenStatistic::MaxEigen, det_order).rows(max_stats.len())?;
    estimate_rank(max_stats, &cvt, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_variable_chain() {
        let cvt = JohansenCriticalValues::new(JohansenStatistic::Trace, DeterministicOrder::UnrestrictedConstant)
            .rows(2)
            .unwrap();
        assert_eq!(cvt[0], [17.85, 19.96, 24.60]);
        assert_eq!(cvt[1], [7.52, 9.24, 12.97]);

        let col = JohansenColumn::FivePercent;
        assert_eq!(estimate_rank(&[5.0, 1.0], &cvt, col).unwrap(), 0);
        assert_eq!(estimate_rank(&[25.0, 1.0], &cvt, col).unwrap(), 1);
        assert_eq!(estimate_rank(&[25.0, 10.0], &cvt, col).unwrap(), 2);
        // Later rejections do not count once the chain stops
        assert_eq!(estimate_rank(&[5.0, 50.0], &cvt, col).unwrap(), 0);
        // Equality does not reject
        assert_eq!(estimate_rank(&[19.96, 50.0], &cvt, col).unwrap(), 0);
    }

    #[test]
    fn test_rank_monotone_and_bounded() {
        for n_vars in 1..=MAX_TABLE_DIMENSION {
            let cvt = JohansenCriticalValues::new(JohansenStatistic::Trace, DeterministicOrder::RestrictedConstant)
                .rows(n_vars)
                .unwrap();
            let mut stats: Vec<f64> = vec![0.0; n_vars];
            let mut previous = estimate_rank(&stats, &cvt, JohansenColumn::OnePercent).unwrap();
            assert_eq!(previous, 0);
            for r in 0..n_vars {
                stats[r] = cvt[r][2] + 1.0;
                let rank = estimate_rank(&stats, &cvt, JohansenColumn::OnePercent).unwrap();
                assert!(rank >= previous);
                assert!(rank <= n_vars);
                previous = rank;
            }
            assert_eq!(previous, n_vars);
        }
    }

    #[test]
    fn test_column_selection() {
        let cvt = [[7.52, 9.24, 12.97]];
        assert_eq!(estimate_rank(&[8.0], &cvt, JohansenColumn::TenPercent).unwrap(), 1);
        assert_eq!(estimate_rank(&[8.0], &cvt, JohansenColumn::FivePercent).unwrap(), 0);
        assert_eq!(estimate_rank(&[f64::NAN], &cvt, JohansenColumn::TenPercent).unwrap(), 0);
        assert_eq!(
            JohansenColumn::from(ConfidenceLevel::OnePercent),
            JohansenColumn::OnePercent
        );
    }

    #[test]
    fn test_table_lookup() {
        let max_eigen = JohansenCriticalValues::new(JohansenStatistic::MaxEigen, DeterministicOrder::NoDeterministic);
        assert_eq!(max_eigen.critical_value(3, 0, JohansenColumn::FivePercent).unwrap(), 19.31);
        assert_eq!(max_eigen.critical_value(3, 2, JohansenColumn::OnePercent).unwrap(), 6.65);
        assert!(max_eigen.critical_value(3, 3, JohansenColumn::FivePercent).is_err());
        assert!(max_eigen.critical_value(20, 0, JohansenColumn::FivePercent).is_err());
        assert!(max_eigen.rows(0).is_err());
        assert!(max_eigen.rows(13).is_err());

        // Trace and max-eigen coincide for the last hypothesis
        let trace = JohansenCriticalValues::new(JohansenStatistic::Trace, DeterministicOrder::NoDeterministic);
        assert_eq!(
            trace.critical_value(4, 3, JohansenColumn::FivePercent).unwrap(),
            max_eigen.critical_value(4, 3, JohansenColumn::FivePercent).unwrap()
        );
    }

    #[test]
    fn test_shape_errors_and_helpers() {
        let cvt = [[1.0, 2.0, 3.0]];
        assert!(estimate_rank(&[], &[], JohansenColumn::FivePercent).is_err());
        assert!(matches!(
            estimate_rank(&[1.0, 2.0], &cvt, JohansenColumn::FivePercent),
            Err(AnalysisError::LengthMismatch { .. })
        ));

        let det = DeterministicOrder::UnrestrictedConstant;
        assert_eq!(
            estimate_rank_trace(&[30.0, 2.0], det, JohansenColumn::FivePercent).unwrap(),
            1
        );
        assert_eq!(
            estimate_rank_max_eigen(&[16.0, 10.0], det, JohansenColumn::FivePercent).unwrap(),
            2
        );
    }

    #[test]
    fn test_deterministic_order_conversion() {
        assert_eq!(DeterministicOrder::try_from(-1).unwrap(), DeterministicOrder::NoDeterministic);
        assert_eq!(DeterministicOrder::try_from(1).unwrap().as_i32(), 1);
        assert!(DeterministicOrder::try_from(2).is_err());
        assert!(!DeterministicOrder::NoDeterministic.has_constant());
        assert_eq!(DeterministicOrder::RestrictedConstant.to_string(), "0");
    }
}
