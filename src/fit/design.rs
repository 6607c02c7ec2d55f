//! Trip-model design matrix and fit assembly.
//!
//! The model is fixed: one row per trip, outcome = "trip was made by
//! bicycle", covariates in the order of [`TERMS`]. Imputed income enters in
//! $10k units so the coefficient prints at a readable scale.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Coefficient, FitDiagnostics, FitSummary, ProbGrid, TripRecord};
use crate::error::AppError;
use crate::fit::logit::{fit_glm, predict_prob};
use crate::fit::robust::hc1_standard_errors;
use crate::math::two_sided_p;

pub const TERMS: [&str; 8] = [
    "intercept",
    "distance_mi",
    "income_10k",
    "age",
    "has_vehicle",
    "worker",
    "unsafe_traffic",
    "unsafe_crime",
];

pub const IDX_DISTANCE: usize = 1;
pub const IDX_UNSAFE_TRAFFIC: usize = 6;
pub const IDX_UNSAFE_CRIME: usize = 7;

/// Minimum number of extra observations beyond parameter count.
const MIN_N_BUFFER: usize = 5;

/// Build one design row. Imputation must have run first; a record without
/// an income here is a pipeline bug, not a data condition.
pub fn design_row(rec: &TripRecord) -> Result<[f64; 8], AppError> {
    let income = rec
        .income
        .ok_or_else(|| AppError::new(4, "Trip record reached the fit without an imputed income."))?;

    Ok([
        1.0,
        rec.distance_mi,
        income / 10_000.0,
        rec.age,
        f64::from(u8::from(rec.has_vehicle)),
        f64::from(u8::from(rec.is_worker)),
        f64::from(u8::from(rec.unsafe_traffic)),
        f64::from(u8::from(rec.unsafe_crime)),
    ])
}

/// Build the full design matrix and response vector.
pub fn build_design(records: &[TripRecord]) -> Result<(DMatrix<f64>, DVector<f64>), AppError> {
    let n = records.len();
    let k = TERMS.len();

    let mut data = Vec::with_capacity(n * k);
    let mut y = DVector::zeros(n);
    for (i, rec) in records.iter().enumerate() {
        data.extend_from_slice(&design_row(rec)?);
        y[i] = f64::from(u8::from(rec.is_bike));
    }

    Ok((DMatrix::from_row_slice(n, k, &data), y))
}

/// Fit the trip model and assemble the reportable summary.
pub fn fit_trip_model(records: &[TripRecord]) -> Result<FitSummary, AppError> {
    let n = records.len();
    let k = TERMS.len();
    if n < k + MIN_N_BUFFER {
        return Err(AppError::new(
            3,
            format!("Underdetermined fit: n={n} < k+{MIN_N_BUFFER}={}", k + MIN_N_BUFFER),
        ));
    }

    let (x, y) = build_design(records)?;
    let fit = fit_glm(&x, &y)?;
    let se = hc1_standard_errors(&x, &y, &fit.mu)?;

    let betas: Vec<f64> = fit.betas.iter().copied().collect();
    let mut coefficients = Vec::with_capacity(k);
    for j in 0..k {
        let estimate = betas[j];
        let robust_se = se[j];
        let z = if robust_se > 0.0 { estimate / robust_se } else { f64::NAN };
        coefficients.push(Coefficient {
            term: TERMS[j].to_string(),
            estimate,
            robust_se,
            z,
            p_value: two_sided_p(z),
        });
    }

    let means: Vec<f64> = (0..k).map(|j| x.column(j).mean()).collect();

    let mut distance_min = f64::INFINITY;
    let mut distance_max = f64::NEG_INFINITY;
    for rec in records {
        distance_min = distance_min.min(rec.distance_mi);
        distance_max = distance_max.max(rec.distance_mi);
    }

    let log_likelihood = -fit.deviance / 2.0;
    let mcfadden_r2 = if fit.null_deviance > 0.0 {
        1.0 - fit.deviance / fit.null_deviance
    } else {
        0.0
    };

    Ok(FitSummary {
        terms: TERMS.iter().map(|t| t.to_string()).collect(),
        betas,
        coefficients,
        diagnostics: FitDiagnostics {
            n,
            k,
            iterations: fit.iterations,
            converged: fit.converged,
            log_likelihood,
            null_deviance: fit.null_deviance,
            deviance: fit.deviance,
            mcfadden_r2,
        },
        means,
        distance_range: (distance_min, distance_max),
    })
}

/// Sample P(bike) over the observed distance range, holding every other
/// covariate at its sample mean, with optional term overrides (e.g. pin
/// `unsafe_traffic` to 0 or 1 for a split curve).
pub fn probability_curve(
    summary: &FitSummary,
    n_points: usize,
    overrides: &[(usize, f64)],
) -> ProbGrid {
    let n_points = n_points.max(2);
    let (mut d0, mut d1) = summary.distance_range;
    if !(d0.is_finite() && d1.is_finite()) || d1 <= d0 {
        d0 = 0.1;
        d1 = 10.0;
    }

    let mut distance_mi = Vec::with_capacity(n_points);
    let mut p_bike = Vec::with_capacity(n_points);

    for i in 0..n_points {
        let u = i as f64 / (n_points as f64 - 1.0);
        let d = d0 + u * (d1 - d0);

        let mut row = summary.means.clone();
        row[0] = 1.0;
        row[IDX_DISTANCE] = d;
        for &(idx, value) in overrides {
            if idx < row.len() {
                row[idx] = value;
            }
        }

        distance_mi.push(d);
        p_bike.push(predict_prob(&summary.betas, &row));
    }

    ProbGrid { distance_mi, p_bike }
}
