//! MacKinnon (2010) critical values for unit-root and cointegration tests.
//!
//! Critical values follow the response surface
//! `tau(T) = tau_inf + tau_1 / T + tau_2 / T^2` evaluated at the sample size
//! `T`. P-values are piecewise-linear interpolations across the 1%, 5% and
//! 10% critical values, extrapolated outside that band and clamped to
//! `[0.0001, 0.9999]`.
//!
//! # References
//! * MacKinnon, J.G. (2010). "Critical Values for Cointegration Tests."
//!   Queen's Economics Department Working Paper No. 1227.

use crate::errors::{AnalysisError, AnalysisResult};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Significance level of a critical value.
///
/// Ordered from the most to the least stringent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConfidenceLevel {
    /// 1% significance
    OnePercent,
    /// 5% significance
    FivePercent,
    /// 10% significance
    TenPercent,
}

impl ConfidenceLevel {
    /// All supported levels, most stringent first.
    pub const ALL: [ConfidenceLevel; 3] = [
        ConfidenceLevel::OnePercent,
        ConfidenceLevel::FivePercent,
        ConfidenceLevel::TenPercent,
    ];

    /// Significance as a probability.
    pub fn alpha(self) -> f64 {
        match self {
            ConfidenceLevel::OnePercent => 0.01,
            ConfidenceLevel::FivePercent => 0.05,
            ConfidenceLevel::TenPercent => 0.10,
        }
    }

    /// Label used in critical-value mappings ("1%", "5%", "10%").
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::OnePercent => "1%",
            ConfidenceLevel::FivePercent => "5%",
            ConfidenceLevel::TenPercent => "10%",
        }
    }

    /// Column suffix used in tabular output ("1pct", "5pct", "10pct").
    pub fn column_suffix(self) -> &'static str {
        match self {
            ConfidenceLevel::OnePercent => "1pct",
            ConfidenceLevel::FivePercent => "5pct",
            ConfidenceLevel::TenPercent => "10pct",
        }
    }

    /// Maps 0.01 / 0.05 / 0.10 to a level.
    pub fn from_alpha(alpha: f64) -> AnalysisResult<Self> {
        Self::ALL
            .into_iter()
            .find(|level| (level.alpha() - alpha).abs() < 1e-6)
            .ok_or_else(|| AnalysisError::InvalidParameter {
                parameter: "significance".to_string(),
                value: alpha,
                constraint: "one of 0.01, 0.05, 0.10".to_string(),
            })
    }

    fn index(self) -> usize {
        match self {
            ConfidenceLevel::OnePercent => 0,
            ConfidenceLevel::FivePercent => 1,
            ConfidenceLevel::TenPercent => 2,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Deterministic terms included in a Dickey-Fuller regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Deterministic {
    /// No constant, no trend ("nc")
    None,
    /// Constant only ("c")
    #[default]
    Constant,
    /// Constant and linear trend ("ct")
    ConstantTrend,
}

impl Deterministic {
    /// Whether the regression carries an intercept column.
    pub fn has_constant(self) -> bool {
        !matches!(self, Deterministic::None)
    }

    /// Whether the regression carries a linear trend column.
    pub fn has_trend(self) -> bool {
        matches!(self, Deterministic::ConstantTrend)
    }

    fn index(self) -> usize {
        match self {
            Deterministic::None => 0,
            Deterministic::Constant => 1,
            Deterministic::ConstantTrend => 2,
        }
    }
}

impl FromStr for Deterministic {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nc" | "n" | "none" => Ok(Deterministic::None),
            "c" | "constant" => Ok(Deterministic::Constant),
            "ct" | "trend" | "constant_trend" => Ok(Deterministic::ConstantTrend),
            other => Err(AnalysisError::InvalidParameter {
                parameter: format!("deterministic ({})", other),
                value: f64::NAN,
                constraint: "one of 'nc', 'c', 'ct'".to_string(),
            }),
        }
    }
}

/// Response-surface coefficients for one critical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseSurface {
    /// Asymptotic critical value
    pub tau_inf: f64,
    /// Coefficient on 1/T
    pub tau_1: f64,
    /// Coefficient on 1/T^2
    pub tau_2: f64,
}

impl ResponseSurface {
    const fn new(tau_inf: f64, tau_1: f64, tau_2: f64) -> Self {
        Self {
            tau_inf,
            tau_1,
            tau_2,
        }
    }

    /// Critical value at sample size `nobs`.
    pub fn evaluate(&self, nobs: usize) -> f64 {
        let t_inv = 1.0 / nobs as f64;
        self.tau_inf + self.tau_1 * t_inv + self.tau_2 * t_inv * t_inv
    }
}

// [deterministic][level], levels ordered 1%, 5%, 10%
const ADF_COEFFICIENTS: [[ResponseSurface; 3]; 3] = [
    [
        ResponseSurface::new(-2.5658, -1.960, -10.04),
        ResponseSurface::new(-1.9393, -0.398, 0.0),
        ResponseSurface::new(-1.6156, -0.181, 0.0),
    ],
    [
        ResponseSurface::new(-3.4336, -5.999, -29.25),
        ResponseSurface::new(-2.8621, -2.738, -8.36),
        ResponseSurface::new(-2.5671, -1.438, -4.48),
    ],
    [
        ResponseSurface::new(-3.9638, -8.353, -47.44),
        ResponseSurface::new(-3.4126, -4.039, -17.83),
        ResponseSurface::new(-3.1279, -2.418, -7.58),
    ],
];

// [n_vars - 2][level]; residual-based tests need stricter values than plain ADF
const COINTEGRATION_COEFFICIENTS: [[ResponseSurface; 3]; 6] = [
    [
        ResponseSurface::new(-3.9001, -10.534, -30.03),
        ResponseSurface::new(-3.3377, -5.967, -8.98),
        ResponseSurface::new(-3.0462, -4.069, -5.73),
    ],
    [
        ResponseSurface::new(-4.2981, -13.790, -46.37),
        ResponseSurface::new(-3.7429, -8.352, -13.41),
        ResponseSurface::new(-3.4518, -6.241, -2.79),
    ],
    [
        ResponseSurface::new(-4.6493, -17.188, -59.20),
        ResponseSurface::new(-4.1193, -10.745, -21.57),
        ResponseSurface::new(-3.8344, -8.317, -13.13),
    ],
    [
        ResponseSurface::new(-4.9695, -20.222, -77.332),
        ResponseSurface::new(-4.4294, -13.461, -22.75),
        ResponseSurface::new(-4.1474, -10.741, -19.57),
    ],
    [
        ResponseSurface::new(-5.2528, -23.636, -83.93),
        ResponseSurface::new(-4.7154, -15.809, -34.85),
        ResponseSurface::new(-4.4345, -12.845, -24.48),
    ],
    [
        ResponseSurface::new(-5.5127, -26.538, -101.82),
        ResponseSurface::new(-4.9767, -18.023, -38.23),
        ResponseSurface::new(-4.6999, -14.942, -29.38),
    ],
];

/// Which critical-value surface a Dickey-Fuller statistic is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CriticalValueTable {
    /// Plain unit-root test on an observed series.
    Adf(Deterministic),
    /// Residual-based (Engle-Granger) cointegration test over `n_vars` series.
    EngleGranger {
        /// Number of variables in the cointegrating regression (2..=7)
        n_vars: usize,
    },
}

impl CriticalValueTable {
    /// Response-surface coefficients for `level`.
    pub fn coefficients(&self, level: ConfidenceLevel) -> AnalysisResult<ResponseSurface> {
        match *self {
            CriticalValueTable::Adf(det) => Ok(ADF_COEFFICIENTS[det.index()][level.index()]),
            CriticalValueTable::EngleGranger { n_vars } => {
                if !(2..=7).contains(&n_vars) {
                    return Err(AnalysisError::InvalidParameter {
                        parameter: "n_vars".to_string(),
                        value: n_vars as f64,
                        constraint: "[2, 7]".to_string(),
                    });
                }
                Ok(COINTEGRATION_COEFFICIENTS[n_vars - 2][level.index()])
            }
        }
    }

    /// Critical value at sample size `nobs` and significance `level`.
    pub fn critical_value(&self, nobs: usize, level: ConfidenceLevel) -> AnalysisResult<f64> {
        if nobs == 0 {
            return Err(AnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        Ok(self.coefficients(level)?.evaluate(nobs))
    }

    /// The 1%, 5% and 10% critical values keyed by level.
    pub fn critical_values(&self, nobs: usize) -> AnalysisResult<BTreeMap<ConfidenceLevel, f64>> {
        ConfidenceLevel::ALL
            .into_iter()
            .map(|level| Ok((level, self.critical_value(nobs, level)?)))
            .collect()
    }

    /// Approximate p-value of statistic `tau` at sample size `nobs`.
    ///
    /// More negative statistics give smaller p-values.
    pub fn p_value(&self, tau: f64, nobs: usize) -> AnalysisResult<f64> {
        let cv_01 = self.critical_value(nobs, ConfidenceLevel::OnePercent)?;
        let cv_05 = self.critical_value(nobs, ConfidenceLevel::FivePercent)?;
        let cv_10 = self.critical_value(nobs, ConfidenceLevel::TenPercent)?;
        Ok(interpolate_p_value(tau, cv_01, cv_05, cv_10))
    }
}

/// Piecewise-linear p-value across the three critical values.
pub fn interpolate_p_value(tau: f64, cv_01: f64, cv_05: f64, cv_10: f64) -> f64 {
    if tau.is_nan() {
        return f64::NAN;
    }

    if tau <= cv_01 {
        let slope = (0.05 - 0.01) / (cv_05 - cv_01);
        (0.01 + slope * (tau - cv_01)).max(0.0001)
    } else if tau <= cv_05 {
        let frac = (tau - cv_01) / (cv_05 - cv_01);
        0.01 + frac * (0.05 - 0.01)
    } else if tau <= cv_10 {
        let frac = (tau - cv_05) / (cv_10 - cv_05);
        0.05 + frac * (0.10 - 0.05)
    } else {
        let slope = (0.10 - 0.05) / (cv_10 - cv_05);
        (0.10 + slope * (tau - cv_10)).min(0.9999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_adf_critical_values_ordering() {
        let table = CriticalValueTable::Adf(Deterministic::Constant);
        let cvs = table.critical_values(100).unwrap();
        let cv1 = cvs[&ConfidenceLevel::OnePercent];
        let cv5 = cvs[&ConfidenceLevel::FivePercent];
        let cv10 = cvs[&ConfidenceLevel::TenPercent];
        assert!(cv1 < cv5 && cv5 < cv10);
        assert_approx_eq!(cv5, -2.8621 - 2.738 / 100.0 - 8.36 / 10_000.0, 1e-12);
    }

    #[test]
    fn test_cointegration_values_are_stricter() {
        let adf = CriticalValueTable::Adf(Deterministic::Constant);
        let eg = CriticalValueTable::EngleGranger { n_vars: 2 };
        for level in ConfidenceLevel::ALL {
            assert!(eg.critical_value(60, level).unwrap() < adf.critical_value(60, level).unwrap());
        }
        assert!(CriticalValueTable::EngleGranger { n_vars: 8 }
            .critical_value(60, ConfidenceLevel::FivePercent)
            .is_err());
        assert!(CriticalValueTable::EngleGranger { n_vars: 1 }
            .critical_values(60)
            .is_err());
    }

    #[test]
    fn test_p_value_interpolation() {
        let table = CriticalValueTable::Adf(Deterministic::Constant);
        let nobs = 250;
        let cv5 = table
            .critical_value(nobs, ConfidenceLevel::FivePercent)
            .unwrap();
        let cv10 = table
            .critical_value(nobs, ConfidenceLevel::TenPercent)
            .unwrap();

        assert_approx_eq!(table.p_value(cv5, nobs).unwrap(), 0.05, 1e-12);
        assert_approx_eq!(table.p_value(cv10, nobs).unwrap(), 0.10, 1e-12);
        assert_approx_eq!(table.p_value(-50.0, nobs).unwrap(), 0.0001, 1e-12);
        assert_approx_eq!(table.p_value(50.0, nobs).unwrap(), 0.9999, 1e-12);

        let mid = table.p_value(0.5 * (cv5 + cv10), nobs).unwrap();
        assert!(mid > 0.05 && mid < 0.10);
        assert!(table.p_value(f64::NAN, nobs).unwrap().is_nan());
    }

    #[test]
    fn test_p_value_monotone_in_statistic() {
        let table = CriticalValueTable::EngleGranger { n_vars: 3 };
        let mut previous = 0.0;
        for i in 0..80 {
            let tau = -8.0 + 0.1 * i as f64;
            let p = table.p_value(tau, 120).unwrap();
            assert!(p >= previous, "p-value decreased at tau = {}", tau);
            assert!((0.0..=1.0).contains(&p));
            previous = p;
        }
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("nc".parse::<Deterministic>().unwrap(), Deterministic::None);
        assert_eq!("ct".parse::<Deterministic>().unwrap(), Deterministic::ConstantTrend);
        assert!("xyz".parse::<Deterministic>().is_err());

        assert_eq!(
            ConfidenceLevel::from_alpha(0.05).unwrap(),
            ConfidenceLevel::FivePercent
        );
        assert!(ConfidenceLevel::from_alpha(0.2).is_err());
        assert_eq!(ConfidenceLevel::TenPercent.to_string(), "10%");
    }
}
