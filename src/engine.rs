//! # Rolling Engine
//!
//! Entry point tying an [`EngineConfig`] to the pluggable statistical
//! backends. Every transform returns a [`ResultTable`] aligned to the input
//! index, with warm-up rows and failed windows holding NaN.
//!
//! ```rust
//! use stationarity_finance::{EngineConfig, RollingEngine};
//!
//! let prices: Vec<f64> = (0..200).map(|t| 100.0 + (t as f64 * 0.3).sin()).collect();
//! let engine = RollingEngine::new(EngineConfig::light()).unwrap();
//! let table = engine.half_life(&prices).unwrap();
//! assert_eq!(table.len(), prices.len());
//! assert!(table.column("half_life").is_some());
//! ```

use crate::cointegration::EngleGranger;
use crate::config::EngineConfig;
use crate::critical_values::ConfidenceLevel;
use crate::errors::AnalysisResult;
use crate::fracdiff::{find_min_ffd_order, FracDiffFilter, MinFfdOrder};
use crate::half_life::HalfLifeEstimator;
use crate::johansen::{JohansenProcedure, RollingJohansen, VecmDecomposition};
use crate::rank::{JohansenColumn, JohansenStatistic};
use crate::regression::RollingLinearFit;
use crate::results::ResultTable;
use crate::stationarity::{AdfTest, RollingAdf, StationarityTest};
use std::fmt;
use std::sync::Arc;

/// Column holding the fractionally differenced series.
pub const FRAC_DIFF_COLUMN: &str = "frac_diff";

/// Rolling transforms sharing one configuration and backend set.
#[derive(Clone)]
pub struct RollingEngine {
    config: EngineConfig,
    unit_root: Arc<dyn StationarityTest>,
    residual_test: Arc<dyn StationarityTest>,
    vecm: Arc<dyn VecmDecomposition>,
}

impl fmt::Debug for RollingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingEngine")
            .field("config", &self.config)
            .field("unit_root", &self.unit_root.name())
            .field("residual_test", &self.residual_test.name())
            .field("vecm", &self.vecm.name())
            .finish()
    }
}

impl RollingEngine {
    /// Engine with the built-in ADF and Johansen backends.
    pub fn new(config: EngineConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let unit_root = Arc::new(AdfTest::new(config.adf));
        let residual_test = Arc::new(AdfTest::engle_granger(2, config.adf.max_lag.max(1))?);
        let vecm = Arc::new(JohansenProcedure::new(config.johansen)?);
        Ok(Self {
            config,
            unit_root,
            residual_test,
            vecm,
        })
    }

    /// Replaces the single-series stationarity backend.
    pub fn with_unit_root_test(mut self, test: Arc<dyn StationarityTest>) -> Self {
        self.unit_root = test;
        self
    }

    /// Replaces the backend applied to Engle-Granger residuals.
    pub fn with_residual_test(mut self, test: Arc<dyn StationarityTest>) -> Self {
        self.residual_test = test;
        self
    }

    /// Replaces the VECM decomposition backend.
    pub fn with_vecm(mut self, vecm: Arc<dyn VecmDecomposition>) -> Self {
        self.vecm = vecm;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fractionally differenced series in a single `frac_diff` column.
    pub fn fracdiff(&self, values: &[f64]) -> AnalysisResult<ResultTable> {
        let filter = FracDiffFilter::new(self.config.ffd)?;
        let mut table = ResultTable::with_len(values.len());
        table.push_column(FRAC_DIFF_COLUMN, filter.apply(values)?)?;
        Ok(table)
    }

    /// Smallest order in `candidates` whose filtered series passes the
    /// configured unit-root test at the configured significance.
    pub fn min_ffd_order(&self, values: &[f64], candidates: &[f64]) -> AnalysisResult<MinFfdOrder> {
        find_min_ffd_order(
            values,
            candidates,
            self.config.ffd.threshold,
            self.unit_root.as_ref(),
            self.config.significance,
        )
    }

    /// Columns `phi`, `half_life`, `is_mean_reverting`.
    pub fn half_life(&self, values: &[f64]) -> AnalysisResult<ResultTable> {
        let rows = HalfLifeEstimator::new(self.config.window)?.compute(values)?;
        Ok(ResultTable::from_rows(&rows))
    }

    /// Columns `slope`, `intercept`, `residual`.
    pub fn linear_fit(&self, x: &[f64], y: &[f64]) -> AnalysisResult<ResultTable> {
        let rows = RollingLinearFit::new(self.config.window)?.compute(x, y)?;
        Ok(ResultTable::from_rows(&rows))
    }

    /// Rolling unit-root test; `is_stationary` is decided at the configured
    /// significance, which must be 0.01, 0.05 or 0.10.
    pub fn rolling_adf(&self, values: &[f64]) -> AnalysisResult<ResultTable> {
        let rows = RollingAdf::with_test(self.config.window, Arc::clone(&self.unit_root))?
            .with_significance(self.config.significance)?
            .compute(values)?;
        Ok(self.with_configured_levels(ResultTable::from_rows(&rows)))
    }

    /// Rolling Engle-Granger test of `y` on `x`.
    pub fn engle_granger(&self, x: &[f64], y: &[f64]) -> AnalysisResult<ResultTable> {
        let rows = EngleGranger::with_test(self.config.window, Arc::clone(&self.residual_test))?
            .with_significance(self.config.significance)?
            .compute(x, y)?;
        Ok(self.with_configured_levels(ResultTable::from_rows(&rows)))
    }

    /// Rolling Johansen rank using the trace test at 5%.
    pub fn johansen(&self, columns: &[&[f64]]) -> AnalysisResult<ResultTable> {
        self.johansen_with(columns, JohansenStatistic::Trace, JohansenColumn::FivePercent)
    }

    /// Rolling Johansen rank with an explicit statistic and column.
    pub fn johansen_with(
        &self,
        columns: &[&[f64]],
        statistic: JohansenStatistic,
        column: JohansenColumn,
    ) -> AnalysisResult<ResultTable> {
        let rows = RollingJohansen::with_backend(self.config.window, Arc::clone(&self.vecm))?
            .with_statistic(statistic)
            .with_column(column)
            .compute(columns)?;
        Ok(ResultTable::from_rows(&rows))
    }

    fn with_configured_levels(&self, mut table: ResultTable) -> ResultTable {
        if self.config.confidence_levels.len() < ConfidenceLevel::ALL.len() {
            table.retain_critical_levels(&self.config.confidence_levels);
        }
        table
    }
}
