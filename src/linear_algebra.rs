//! Linear algebra operations for the regression legs of the unit-root and
//! VECM computations.
//!
//! Dense matrices come from `nalgebra`. Normal-equation inverses go through a
//! Cholesky factorization so that singular or indefinite designs surface as
//! [`AnalysisError::NumericalError`] instead of producing garbage estimates.

use crate::errors::{AnalysisError, AnalysisResult};
use nalgebra::{Cholesky, DMatrix, DVector};

/// Standard errors below this are treated as a degenerate fit.
pub const MIN_STANDARD_ERROR: f64 = 1e-10;

/// Ordinary least squares fit of `y = X b + e`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Estimated coefficients, one per design column
    pub coefficients: DVector<f64>,
    /// `(X'X)^{-1}`
    pub xtx_inverse: DMatrix<f64>,
    /// Residuals `y - X b`
    pub residuals: DVector<f64>,
    /// Unbiased residual variance `RSS / (n - k)`
    pub sigma2: f64,
}

impl OlsFit {
    /// Standard error of coefficient `index`.
    pub fn standard_error(&self, index: usize) -> f64 {
        (self.sigma2 * self.xtx_inverse[(index, index)]).sqrt()
    }

    /// t-statistic of coefficient `index`.
    ///
    /// Fails when the standard error is numerically zero, which happens for
    /// perfectly fitted (e.g. constant) inputs.
    pub fn t_statistic(&self, index: usize) -> AnalysisResult<f64> {
        let se = self.standard_error(index);
        if !se.is_finite() || se < MIN_STANDARD_ERROR {
            return Err(AnalysisError::NumericalError {
                reason: format!("standard error of coefficient {} is degenerate: {:e}", index, se),
                operation: Some("ols_t_statistic".to_string()),
            });
        }
        Ok(self.coefficients[index] / se)
    }
}

/// Inverts a symmetric positive definite matrix via Cholesky.
pub fn spd_inverse(matrix: DMatrix<f64>, operation: &str) -> AnalysisResult<DMatrix<f64>> {
    Cholesky::new(matrix)
        .map(|chol| chol.inverse())
        .ok_or_else(|| AnalysisError::NumericalError {
            reason: "matrix is singular or not positive definite".to_string(),
            operation: Some(operation.to_string()),
        })
}

/// Fits `response` on the columns of `design` by ordinary least squares.
pub fn ols_fit(design: &DMatrix<f64>, response: &DVector<f64>) -> AnalysisResult<OlsFit> {
    let (n, k) = design.shape();
    if n != response.len() {
        return Err(AnalysisError::LengthMismatch {
            left: n,
            right: response.len(),
        });
    }
    if n <= k {
        return Err(AnalysisError::InsufficientData {
            required: k + 1,
            actual: n,
        });
    }
    if design.iter().chain(response.iter()).any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalError {
            reason: "Non-finite values in regression data".to_string(),
            operation: Some("ols_fit".to_string()),
        });
    }

    let xtx_inverse = spd_inverse(design.transpose() * design, "ols_fit")?;
    let coefficients = &xtx_inverse * (design.transpose() * response);
    let residuals = response - design * &coefficients;
    let rss = residuals.norm_squared();
    let sigma2 = rss / (n - k) as f64;

    if !sigma2.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err(AnalysisError::NumericalError {
            reason: "Non-finite regression coefficients computed".to_string(),
            operation: Some("ols_fit".to_string()),
        });
    }

    Ok(OlsFit {
        coefficients,
        xtx_inverse,
        residuals,
        sigma2,
    })
}

/// Residuals of every column of `target` after projecting out `regressors`.
///
/// Computes `Z - W (W'W)^{-1} W'Z` without forming the `n x n` annihilator.
/// When `W'W` is not positive definite the Moore-Penrose pseudo-inverse is
/// used instead.
pub fn residualize(target: &DMatrix<f64>, regressors: &DMatrix<f64>) -> AnalysisResult<DMatrix<f64>> {
    if regressors.ncols() == 0 {
        return Ok(target.clone());
    }
    if target.nrows() != regressors.nrows() {
        return Err(AnalysisError::LengthMismatch {
            left: target.nrows(),
            right: regressors.nrows(),
        });
    }

    let gram = regressors.transpose() * regressors;
    let gram_inverse = match spd_inverse(gram.clone(), "residualize") {
        Ok(inv) => inv,
        Err(_) => gram
            .pseudo_inverse(1e-12)
            .map_err(|reason| AnalysisError::NumericalError {
                reason: reason.to_string(),
                operation: Some("residualize".to_string()),
            })?,
    };
    let projection = regressors * (gram_inverse * (regressors.transpose() * target));
    Ok(target - projection)
}
