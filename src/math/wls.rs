//! Weighted least squares solver.
//!
//! Each IRLS iteration of the logistic fit solves a small weighted linear
//! regression of the working response on the design matrix:
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - Callers scale rows by `sqrt(w_i)` and we solve an ordinary least
//!   squares problem.
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns). Nalgebra's `QR::solve`
//!   is intended for square systems and will panic for non-square matrices.
//! - The parameter dimension is tiny (8 columns), so SVD performance is a
//!   non-issue even for six-figure row counts.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Near-degenerate weight patterns (e.g., fitted probabilities pinned to
    // 0/1 under separation) can make columns nearly collinear, so we try
    // progressively looser tolerances before giving up.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Scale design rows and response by `sqrt(w_i)`, then solve.
///
/// Weights must be finite and non-negative; rows with zero weight simply
/// contribute nothing to the objective.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &[f64],
) -> Option<DVector<f64>> {
    if w.len() != x.nrows() || y.len() != x.nrows() {
        return None;
    }
    if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return None;
    }

    let mut xw = x.clone();
    let mut yw = y.clone();
    for (i, &wi) in w.iter().enumerate() {
        let s = wi.sqrt();
        for j in 0..xw.ncols() {
            xw[(i, j)] *= s;
        }
        yw[i] *= s;
    }

    solve_least_squares(&xw, &yw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        // Third row is wildly off but carries zero weight.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 5.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 1000.0, 8.0]);
        let w = [1.0, 1.0, 0.0, 1.0];

        let beta = solve_weighted_least_squares(&x, &y, &w).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-8);
        assert!((beta[1] - 3.0).abs() < 1e-8);
    }

    #[test]
    fn rejects_invalid_weights() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(solve_weighted_least_squares(&x, &y, &[1.0, -1.0]).is_none());
        assert!(solve_weighted_least_squares(&x, &y, &[1.0, f64::NAN]).is_none());
        assert!(solve_weighted_least_squares(&x, &y, &[1.0]).is_none());
    }
}
