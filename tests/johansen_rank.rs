//! Integration tests for Johansen cointegration rank
//!
//! These tests validate the sequential rank chain, the full-sample Johansen
//! procedure on simulated systems and the rolling transform's fail isolation
//! with a custom decomposition backend.

use assert_approx_eq::assert_approx_eq;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use stationarity_finance::{
    estimate_rank, estimate_rank_trace, AnalysisError, AnalysisResult, DeterministicOrder,
    JohansenColumn, JohansenConfig, JohansenCriticalValues, JohansenProcedure, JohansenStatistic,
    RollingJohansen, VecmDecomposition, VecmResult,
};
use std::sync::Arc;

fn random_walk(rng: &mut ChaCha20Rng, n: usize) -> Vec<f64> {
    let mut level = 10.0;
    (0..n)
        .map(|_| {
            level += rng.gen::<f64>() - 0.5;
            level
        })
        .collect()
}

/// Two series sharing one stochastic trend plus an independent third
fn three_variable_system(n: usize, seed: u64) -> [Vec<f64>; 3] {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let common = random_walk(&mut rng, n);
    let paired: Vec<f64> = common
        .iter()
        .map(|v| v + 0.3 * (rng.gen::<f64>() - 0.5))
        .collect();
    let independent = random_walk(&mut rng, n);
    [common, paired, independent]
}

/// Decomposition that refuses to work on a fixed set of window end points
struct FailsOnWindows {
    inner: JohansenProcedure,
    failing_last_values: Vec<f64>,
}

impl VecmDecomposition for FailsOnWindows {
    fn name(&self) -> &str {
        "fails-on-windows"
    }

    fn decompose(&self, columns: &[&[f64]]) -> AnalysisResult<VecmResult> {
        let last = columns[0][columns[0].len() - 1];
        if self.failing_last_values.contains(&last) {
            return Err(AnalysisError::NumericalError {
                reason: "injected failure".to_string(),
                operation: Some("decompose".to_string()),
            });
        }
        self.inner.decompose(columns)
    }
}

/// Test scenario: Rank chain is monotone and bounded
///
/// Every prefix of rejections adds one to the rank; the first acceptance
/// ends the chain even if later statistics would reject.
#[test]
fn test_rank_chain_properties() {
    let cvt = JohansenCriticalValues::new(
        JohansenStatistic::Trace,
        DeterministicOrder::UnrestrictedConstant,
    )
    .rows(3)
    .unwrap();

    let mut previous = 0;
    for rejections in 0..=3 {
        let stats: Vec<f64> = (0..3)
            .map(|r| {
                if r < rejections {
                    cvt[r][1] + 1.0
                } else {
                    cvt[r][1] - 1.0
                }
            })
            .collect();
        let rank = estimate_rank(&stats, &cvt, JohansenColumn::FivePercent).unwrap();
        assert_eq!(rank, rejections);
        assert!(rank >= previous && rank <= 3);
        previous = rank;
    }

    let gapped = vec![cvt[0][1] - 1.0, cvt[1][1] + 100.0, cvt[2][1] + 100.0];
    assert_eq!(
        estimate_rank(&gapped, &cvt, JohansenColumn::FivePercent).unwrap(),
        0
    );
    assert_eq!(
        estimate_rank(&[f64::NAN, 1e6, 1e6], &cvt, JohansenColumn::FivePercent).unwrap(),
        0
    );
}

/// Test scenario: Helper uses the table for the given deterministic order
#[test]
fn test_rank_trace_helper_matches_manual_chain() {
    let stats = [40.0, 2.0];
    let det = DeterministicOrder::UnrestrictedConstant;
    let cvt = JohansenCriticalValues::new(JohansenStatistic::Trace, det)
        .rows(2)
        .unwrap();
    assert_eq!(
        estimate_rank_trace(&stats, det, JohansenColumn::FivePercent).unwrap(),
        estimate_rank(&stats, &cvt, JohansenColumn::FivePercent).unwrap()
    );
}

/// Test scenario: Full-sample Johansen on a system with one relation
#[test]
fn test_three_variable_system() {
    let [a, b, c] = three_variable_system(500, 31);
    let procedure = JohansenProcedure::new(JohansenConfig::default()).unwrap();
    let result = procedure.decompose(&[&a, &b, &c]).unwrap();

    assert_eq!(result.n_vars(), 3);
    assert_eq!(result.trace_stats.len(), 3);
    assert_eq!(result.trace_critical_values.len(), 3);
    assert!(result.eigenvalues.windows(2).all(|p| p[0] >= p[1]));

    let rank = result.rank_trace(JohansenColumn::FivePercent).unwrap();
    assert!((1..=2).contains(&rank), "rank {}", rank);

    let beta = result.normalized_beta().unwrap();
    assert_eq!(beta[0], 1.0);
    assert_approx_eq!(beta[1], -1.0, 0.05);
    assert!(beta[2].abs() < 0.1);
}

/// Test scenario: Independent random walks are not cointegrated
#[test]
fn test_independent_walks_have_low_rank() {
    let mut rng = ChaCha20Rng::seed_from_u64(32);
    let a = random_walk(&mut rng, 400);
    let b = random_walk(&mut rng, 400);
    let result = JohansenProcedure::default().decompose(&[&a, &b]).unwrap();
    assert!(result.rank_trace(JohansenColumn::OnePercent).unwrap() < 2);
    assert!(result.rank_max_eigen(JohansenColumn::OnePercent).unwrap() < 2);
}

/// Test scenario: Eigenvectors diagonalize S11
///
/// Columns of beta are S11-orthonormal: beta' S11 beta = I for the
/// no-deterministic, p = 1 model where R1 is the lagged level.
#[test]
fn test_eigenvectors_are_s11_orthonormal() {
    let [a, b, _] = three_variable_system(200, 33);
    let config = JohansenConfig {
        det_order: DeterministicOrder::NoDeterministic,
        lag_order: 1,
    };
    let result = JohansenProcedure::new(config)
        .unwrap()
        .decompose(&[&a, &b])
        .unwrap();

    let n = a.len() - 2;
    assert_eq!(result.n_obs, n);
    let r1 = DMatrix::from_fn(n, 2, |t, j| if j == 0 { a[t + 1] } else { b[t + 1] });
    let s11 = r1.transpose() * &r1 / n as f64;
    let gram = result.eigenvectors.transpose() * s11 * &result.eigenvectors;
    for i in 0..2 {
        for j in 0..2 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_approx_eq!(gram[(i, j)], expected, 1e-6);
        }
    }
}

/// Test scenario: Rolling rank with injected failures
///
/// Only the windows whose decomposition fails become sentinel rows.
#[test]
fn test_rolling_rank_isolates_failures() {
    let [a, b, _] = three_variable_system(200, 34);
    let window = 80;
    let backend = FailsOnWindows {
        inner: JohansenProcedure::default(),
        failing_last_values: vec![a[100], a[150]],
    };
    let rolling = RollingJohansen::with_backend(window, Arc::new(backend)).unwrap();
    let rows = rolling.compute(&[&a, &b]).unwrap();

    assert_eq!(rows.len(), 200);
    assert!(rows[..window - 1].iter().all(|r| r.rank.is_none()));
    for (t, row) in rows.iter().enumerate().skip(window - 1) {
        if a[t] == a[100] || a[t] == a[150] {
            assert!(row.rank.is_none());
            assert!(row.spread.is_nan());
        } else {
            let rank = row.rank.unwrap();
            assert!(rank <= 2);
            assert_eq!(row.beta.len(), 2);
        }
    }
}

/// Test scenario: Window and shape validation
#[test]
fn test_rolling_rank_shape_errors() {
    let mut rng = ChaCha20Rng::seed_from_u64(35);
    let a = random_walk(&mut rng, 50);
    let rolling = RollingJohansen::new(60, JohansenConfig::default()).unwrap();
    assert!(matches!(
        rolling.compute(&[&a, &a]),
        Err(AnalysisError::InsufficientData { .. })
    ));
    assert!(RollingJohansen::new(0, JohansenConfig::default()).is_err());
}
