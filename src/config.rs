//! # Engine Configuration
//!
//! Parameters shared by every rolling transform: the window length, the
//! fractional-differencing weights, the unit-root test set-up and the
//! Johansen model. Presets trade window length and lag depth against
//! responsiveness.

use crate::cointegration::DEFAULT_SIGNIFICANCE;
use crate::critical_values::{ConfidenceLevel, Deterministic};
use crate::errors::{validate_parameter, AnalysisError, AnalysisResult};
use crate::fracdiff::FfdParams;
use crate::johansen::JohansenConfig;
use crate::rank::DeterministicOrder;
use crate::stationarity::AdfConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a [`RollingEngine`](crate::engine::RollingEngine)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Rolling window length (observations per window)
    pub window: usize,
    /// Fractional differencing parameters
    pub ffd: FfdParams,
    /// p-value threshold for cointegration and minimum-order search
    pub significance: f64,
    /// Unit-root test set-up for the single-series ADF transform
    pub adf: AdfConfig,
    /// Johansen deterministic order and lag order
    pub johansen: JohansenConfig,
    /// Critical-value columns kept in ADF and Engle-Granger output
    pub confidence_levels: Vec<ConfidenceLevel>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl EngineConfig {
    /// Light configuration: short window, minimal lag structure
    pub fn light() -> Self {
        Self {
            window: 60,
            ffd: FfdParams {
                threshold: 1e-4,
                ..FfdParams::default()
            },
            significance: DEFAULT_SIGNIFICANCE,
            adf: AdfConfig {
                max_lag: 0,
                deterministic: Deterministic::Constant,
            },
            johansen: JohansenConfig::default(),
            confidence_levels: vec![ConfidenceLevel::FivePercent],
        }
    }

    /// Standard configuration: 100-observation window, one lagged difference
    pub fn standard() -> Self {
        Self {
            window: 100,
            ffd: FfdParams::default(),
            significance: DEFAULT_SIGNIFICANCE,
            adf: AdfConfig::default(),
            johansen: JohansenConfig::default(),
            confidence_levels: ConfidenceLevel::ALL.to_vec(),
        }
    }

    /// Deep configuration: one trading year per window, richer dynamics
    pub fn deep() -> Self {
        Self {
            window: 252,
            ffd: FfdParams::default(),
            significance: DEFAULT_SIGNIFICANCE,
            adf: AdfConfig {
                max_lag: 4,
                deterministic: Deterministic::ConstantTrend,
            },
            johansen: JohansenConfig {
                det_order: DeterministicOrder::UnrestrictedConstant,
                lag_order: 2,
            },
            confidence_levels: ConfidenceLevel::ALL.to_vec(),
        }
    }

    /// Replace the window length
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Replace the significance threshold
    pub fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }

    /// Replace the fractional differencing parameters
    pub fn with_ffd(mut self, ffd: FfdParams) -> Self {
        self.ffd = ffd;
        self
    }

    /// Check every parameter before any data is touched
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.window == 0 {
            return Err(AnalysisError::InvalidParameter {
                parameter: "window".to_string(),
                value: 0.0,
                constraint: "must be at least 1".to_string(),
            });
        }
        self.ffd.validate()?;
        validate_parameter(
            self.significance,
            f64::MIN_POSITIVE,
            1.0 - f64::EPSILON,
            "significance",
        )?;
        self.johansen.validate()?;
        if self.confidence_levels.is_empty() {
            return Err(AnalysisError::InvalidParameter {
                parameter: "confidence_levels".to_string(),
                value: 0.0,
                constraint: "at least one of 1%, 5%, 10%".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for config in [
            EngineConfig::light(),
            EngineConfig::standard(),
            EngineConfig::deep(),
        ] {
            assert!(config.validate().is_ok(), "{:?}", config);
        }
        assert_eq!(EngineConfig::default(), EngineConfig::standard());
    }

    #[test]
    fn test_presets_scale_window() {
        assert!(EngineConfig::light().window < EngineConfig::standard().window);
        assert!(EngineConfig::standard().window < EngineConfig::deep().window);
        assert_eq!(EngineConfig::deep().johansen.lag_order, 2);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(EngineConfig::default().with_window(0).validate().is_err());
        assert!(EngineConfig::default()
            .with_significance(0.0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_significance(1.0)
            .validate()
            .is_err());

        let mut config = EngineConfig::default();
        config.ffd.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.confidence_levels.clear();
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidParameter { .. })
        ));
    }
}
