//! # Stationarity Transforms for Financial Series
//!
//! Rolling-window building blocks for turning price series into features
//! that keep as much memory as possible while becoming stationary.
//!
//! ## Key Features
//!
//! - **Fractional Differencing**: fixed-width window FFD weights and filter,
//!   plus a search for the minimum order that passes a unit-root test
//! - **Mean Reversion**: rolling AR(1) coefficient and half-life
//! - **Cointegration**: rolling Engle-Granger two-step test with hedge ratio
//!   and spread
//! - **Cointegration Rank**: Johansen trace and maximum-eigenvalue statistics
//!   with Osterwald-Lenum critical values and sequential rank selection
//! - **Unit-Root Testing**: Augmented Dickey-Fuller with MacKinnon (2010)
//!   response-surface critical values and p-values
//!
//! ## Quick Start
//!
//! ```rust
//! use stationarity_finance::{EngineConfig, RollingEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let x: Vec<f64> = (0..300).map(|t| 50.0 + (t as f64 * 0.05).sin() * 5.0 + t as f64 * 0.1).collect();
//!     let y: Vec<f64> = x
//!         .iter()
//!         .enumerate()
//!         .map(|(t, v)| 2.0 * v + 1.0 + ((t * 7919) % 13) as f64 * 0.05)
//!         .collect();
//!
//!     let engine = RollingEngine::new(EngineConfig::standard())?;
//!     let table = engine.engle_granger(&x, &y)?;
//!
//!     let hedge = table.column("hedge_ratio").unwrap_or_default();
//!     println!("latest hedge ratio: {:.3}", hedge[hedge.len() - 1]);
//!     Ok(())
//! }
//! ```
//!
//! ## Output Conventions
//!
//! Every rolling transform returns one row per input index. Rows before the
//! first full window, and windows whose statistics cannot be computed, hold
//! NaN ([`SENTINEL`]). Boolean flags are `Option<bool>` on rows and 1.0 / 0.0
//! / NaN in a [`ResultTable`].
//!
//! ## Architecture
//!
//! [`RollingEngine`] bundles an [`EngineConfig`] with the statistical
//! backends: a [`StationarityTest`] and a [`VecmDecomposition`]. Individual
//! transforms can also be used directly.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod critical_values;
pub mod engine;
pub mod errors;
pub mod linear_algebra;
pub mod results;
pub mod series;
pub mod window;

// Transforms
pub mod cointegration;
pub mod fracdiff;
pub mod half_life;
pub mod johansen;
pub mod rank;
pub mod regression;
pub mod stationarity;

pub use config::EngineConfig;
pub use engine::{RollingEngine, FRAC_DIFF_COLUMN};
pub use errors::{AnalysisError, AnalysisResult};
pub use results::{flag_value, ResultTable, TableRow};
pub use series::{is_sentinel, Series, SENTINEL};
pub use window::{MultiWindowBuffer, PairedWindowBuffer, WindowBuffer, WindowSpec};

pub use critical_values::{ConfidenceLevel, CriticalValueTable, Deterministic};
pub use stationarity::{
    AdfConfig, AdfRow, AdfTest, RollingAdf, StationarityResult, StationarityTest,
};

pub use fracdiff::{
    compute_ffd_weights, find_min_ffd_order, FfdCandidate, FfdParams, FracDiffFilter,
    MinFfdOrder, WeightSeries,
};
pub use half_life::{estimate_half_life, HalfLifeEstimator, HalfLifeRow};
pub use regression::{fit_linear, LinearFitRow, RegressionResult, RollingLinearFit};

pub use cointegration::{EngleGranger, EngleGrangerRow};
pub use johansen::{
    JohansenConfig, JohansenProcedure, JohansenRow, RollingJohansen, VecmDecomposition,
    VecmResult,
};
pub use rank::{
    estimate_rank, estimate_rank_max_eigen, estimate_rank_trace, DeterministicOrder,
    JohansenColumn, JohansenCriticalValues, JohansenStatistic,
};
