//! Iteratively reweighted least squares for the binomial logit.
//!
//! Given a design matrix `X` and a 0/1 response `y`, each iteration solves
//! the weighted least-squares problem
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2
//! w_i = μ_i (1 - μ_i)
//! z_i = η_i + (y_i - μ_i) / w_i
//! ```
//!
//! using the shared SVD solver. This is the standard Fisher-scoring update
//! and is deterministic given the inputs.
//!
//! Guardrails:
//! - fitted probabilities are clamped away from 0/1 so the working weights
//!   never underflow under quasi-separation
//! - non-finite deviance aborts with a numeric-failure error rather than
//!   looping on garbage
//! - convergence is on the relative deviance change, with a bounded
//!   iteration count

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::solve_weighted_least_squares;

const MAX_ITER: usize = 25;
const DEVIANCE_TOL: f64 = 1e-8;
const MU_EPS: f64 = 1e-10;

/// Converged IRLS state.
#[derive(Debug, Clone)]
pub struct IrlsFit {
    pub betas: DVector<f64>,
    /// Fitted probabilities at the final betas.
    pub mu: DVector<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub deviance: f64,
    pub null_deviance: f64,
}

/// The logistic function.
pub fn logistic(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

/// Predict a probability from a coefficient vector and one design row.
pub fn predict_prob(betas: &[f64], row: &[f64]) -> f64 {
    let eta: f64 = betas.iter().zip(row).map(|(b, x)| b * x).sum();
    logistic(eta)
}

/// Fit the logit by IRLS.
///
/// `y` must be strictly 0/1 with both classes present; the caller is
/// responsible for the underdetermination check (`n >= k + buffer`).
pub fn fit_glm(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<IrlsFit, AppError> {
    let n = x.nrows();
    let k = x.ncols();
    if n == 0 || k == 0 || y.len() != n {
        return Err(AppError::new(4, "Design matrix and response are inconsistent."));
    }
    if y.iter().any(|v| *v != 0.0 && *v != 1.0) {
        return Err(AppError::new(4, "Response must be strictly 0/1."));
    }
    let n_pos = y.iter().filter(|v| **v == 1.0).count();
    if n_pos == 0 || n_pos == n {
        return Err(AppError::new(
            3,
            "Outcome has no variation; a logit cannot be fit.",
        ));
    }

    let p_base = n_pos as f64 / n as f64;
    let null_deviance = deviance_at_constant(y, p_base);

    let mut betas = DVector::zeros(k);
    let mut mu = DVector::from_element(n, p_base);
    let mut deviance = null_deviance;
    let mut converged = false;
    let mut iterations = 0usize;

    for iter in 1..=MAX_ITER {
        iterations = iter;

        let eta = x * &betas;
        mu = eta.map(|e| logistic(e).clamp(MU_EPS, 1.0 - MU_EPS));

        let mut w = Vec::with_capacity(n);
        let mut z = DVector::zeros(n);
        for i in 0..n {
            let wi = (mu[i] * (1.0 - mu[i])).max(MU_EPS);
            w.push(wi);
            z[i] = eta[i] + (y[i] - mu[i]) / wi;
        }

        let next = solve_weighted_least_squares(x, &z, &w)
            .ok_or_else(|| AppError::new(4, "IRLS weighted least-squares step failed."))?;
        betas = next;

        let eta = x * &betas;
        mu = eta.map(|e| logistic(e).clamp(MU_EPS, 1.0 - MU_EPS));
        let next_deviance = binomial_deviance(y, &mu);
        if !next_deviance.is_finite() {
            return Err(AppError::new(4, "IRLS diverged (non-finite deviance)."));
        }

        let delta = (deviance - next_deviance).abs();
        deviance = next_deviance;
        if delta < DEVIANCE_TOL * (deviance.abs() + 0.1) {
            converged = true;
            break;
        }
    }

    Ok(IrlsFit {
        betas,
        mu,
        iterations,
        converged,
        deviance,
        null_deviance,
    })
}

/// `-2 log L` for a Bernoulli response with fitted probabilities `mu`.
pub fn binomial_deviance(y: &DVector<f64>, mu: &DVector<f64>) -> f64 {
    let mut dev = 0.0;
    for i in 0..y.len() {
        let m = mu[i].clamp(MU_EPS, 1.0 - MU_EPS);
        dev -= 2.0 * if y[i] == 1.0 { m.ln() } else { (1.0 - m).ln() };
    }
    dev
}

fn deviance_at_constant(y: &DVector<f64>, p: f64) -> f64 {
    let mu = DVector::from_element(y.len(), p);
    binomial_deviance(y, &mu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn logit(p: f64) -> f64 {
        (p / (1.0 - p)).ln()
    }

    /// With one binary predictor the MLE has a closed form: the intercept is
    /// the empirical logit of the x=0 group and the slope is the log odds
    /// ratio between groups.
    #[test]
    fn grouped_binary_mle_is_exact() {
        // x=0: 4/10 successes; x=1: 7/10 successes.
        let mut rows = Vec::new();
        let mut ys = Vec::new();
        for i in 0..10 {
            rows.extend_from_slice(&[1.0, 0.0]);
            ys.push(f64::from(u8::from(i < 4)));
        }
        for i in 0..10 {
            rows.extend_from_slice(&[1.0, 1.0]);
            ys.push(f64::from(u8::from(i < 7)));
        }
        let x = DMatrix::from_row_slice(20, 2, &rows);
        let y = DVector::from_vec(ys);

        let fit = fit_glm(&x, &y).unwrap();
        assert!(fit.converged);

        let b0 = logit(0.4);
        let b1 = logit(0.7) - logit(0.4);
        assert!((fit.betas[0] - b0).abs() < 1e-6, "intercept {}", fit.betas[0]);
        assert!((fit.betas[1] - b1).abs() < 1e-6, "slope {}", fit.betas[1]);
        assert!(fit.deviance < fit.null_deviance);
    }

    #[test]
    fn recovers_simulated_coefficients() {
        let mut rng = StdRng::seed_from_u64(99);
        let (b0, b1) = (1.0, -0.5);

        let n = 5000;
        let mut rows = Vec::with_capacity(n * 2);
        let mut ys = Vec::with_capacity(n);
        for _ in 0..n {
            let d: f64 = rng.gen_range(0.0..10.0);
            let p = logistic(b0 + b1 * d);
            rows.extend_from_slice(&[1.0, d]);
            ys.push(f64::from(u8::from(rng.gen_bool(p))));
        }
        let x = DMatrix::from_row_slice(n, 2, &rows);
        let y = DVector::from_vec(ys);

        let fit = fit_glm(&x, &y).unwrap();
        assert!(fit.converged);
        assert!((fit.betas[0] - b0).abs() < 0.5, "intercept {}", fit.betas[0]);
        assert!((fit.betas[1] - b1).abs() < 0.15, "slope {}", fit.betas[1]);
    }

    #[test]
    fn constant_outcome_is_rejected() {
        let x = DMatrix::from_row_slice(4, 1, &[1.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        let err = fit_glm(&x, &y).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn non_binary_response_is_rejected() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_vec(vec![0.0, 0.5]);
        assert!(fit_glm(&x, &y).is_err());
    }

    #[test]
    fn logistic_basics() {
        assert!((logistic(0.0) - 0.5).abs() < 1e-12);
        assert!(logistic(40.0) > 0.999);
        assert!(logistic(-40.0) < 0.001);
    }
}
