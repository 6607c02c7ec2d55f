//! Heteroskedasticity-robust (HC1) standard errors.
//!
//! The sandwich estimator for the logit MLE:
//!
//! ```text
//! cov(β) = (XᵀWX)⁻¹ · Xᵀ diag((y_i - μ_i)²) X · (XᵀWX)⁻¹ · n/(n-k)
//! ```
//!
//! with `W = diag(μ_i (1 - μ_i))`. The `n/(n-k)` factor is the HC1
//! small-sample correction.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Compute HC1 robust standard errors for a fitted logit.
pub fn hc1_standard_errors(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    mu: &DVector<f64>,
) -> Result<Vec<f64>, AppError> {
    let n = x.nrows();
    let k = x.ncols();
    if n <= k {
        return Err(AppError::new(4, "Too few observations for robust covariance."));
    }
    if y.len() != n || mu.len() != n {
        return Err(AppError::new(4, "Inconsistent dimensions in robust covariance."));
    }

    // Bread: (XᵀWX)⁻¹.
    let mut xtwx: DMatrix<f64> = DMatrix::zeros(k, k);
    let mut meat: DMatrix<f64> = DMatrix::zeros(k, k);
    for i in 0..n {
        let w = mu[i] * (1.0 - mu[i]);
        let r2 = (y[i] - mu[i]).powi(2);
        let row = x.row(i);
        for a in 0..k {
            for b in 0..k {
                let xx = row[a] * row[b];
                xtwx[(a, b)] += w * xx;
                meat[(a, b)] += r2 * xx;
            }
        }
    }

    let bread = xtwx.try_inverse().ok_or_else(|| {
        AppError::new(
            4,
            "Information matrix is singular; robust covariance is undefined.",
        )
    })?;

    let correction = n as f64 / (n - k) as f64;
    let cov: DMatrix<f64> = &bread * meat * &bread * correction;

    let mut se = Vec::with_capacity(k);
    for j in 0..k {
        let v = cov[(j, j)];
        if !v.is_finite() || v < 0.0 {
            return Err(AppError::new(4, "Non-finite robust variance."));
        }
        se.push(v.sqrt());
    }
    Ok(se)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::logit::fit_glm;

    #[test]
    fn robust_se_are_positive_and_finite() {
        // Same grouped layout as the exact-MLE test in `logit`.
        let mut rows = Vec::new();
        let mut ys = Vec::new();
        for i in 0..12 {
            rows.extend_from_slice(&[1.0, 0.0]);
            ys.push(f64::from(u8::from(i < 5)));
        }
        for i in 0..12 {
            rows.extend_from_slice(&[1.0, 1.0]);
            ys.push(f64::from(u8::from(i < 8)));
        }
        let x = DMatrix::from_row_slice(24, 2, &rows);
        let y = DVector::from_vec(ys);

        let fit = fit_glm(&x, &y).unwrap();
        let se = hc1_standard_errors(&x, &y, &fit.mu).unwrap();
        assert_eq!(se.len(), 2);
        assert!(se.iter().all(|s| s.is_finite() && *s > 0.0));
        // Binary-covariate logit SEs land near 1/sqrt of the group
        // information; anything wildly outside (0, 2] would be a bug here.
        assert!(se.iter().all(|s| *s < 2.0));
    }

    #[test]
    fn singular_information_is_an_error() {
        // Duplicate columns make XᵀWX singular.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
        let mu = DVector::from_element(4, 0.5);
        assert!(hc1_standard_errors(&x, &y, &mu).is_err());
    }
}
