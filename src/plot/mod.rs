//! Probability-curve plots for the report.
//!
//! The three effect plots are built once (`build_effect_plots`) and then
//! rendered either as deterministic ASCII grids for the terminal or as SVG
//! files via plotters.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;

use crate::domain::{FitSummary, ProbGrid, TripRecord};
use crate::fit::{IDX_UNSAFE_CRIME, IDX_UNSAFE_TRAFFIC, probability_curve};

/// Number of curve samples per plot.
const CURVE_POINTS: usize = 101;

/// The three report plots: the base distance curve plus the two
/// binary-predictor splits.
#[derive(Debug, Clone)]
pub struct EffectPlots {
    /// P(bike) over distance, all covariates at their means.
    pub base: ProbGrid,
    /// (feels safe, feels unsafe) split on the traffic perception.
    pub traffic: (ProbGrid, ProbGrid),
    /// (feels safe, feels unsafe) split on the crime perception.
    pub crime: (ProbGrid, ProbGrid),
}

pub fn build_effect_plots(summary: &FitSummary) -> EffectPlots {
    EffectPlots {
        base: probability_curve(summary, CURVE_POINTS, &[]),
        traffic: (
            probability_curve(summary, CURVE_POINTS, &[(IDX_UNSAFE_TRAFFIC, 0.0)]),
            probability_curve(summary, CURVE_POINTS, &[(IDX_UNSAFE_TRAFFIC, 1.0)]),
        ),
        crime: (
            probability_curve(summary, CURVE_POINTS, &[(IDX_UNSAFE_CRIME, 0.0)]),
            probability_curve(summary, CURVE_POINTS, &[(IDX_UNSAFE_CRIME, 1.0)]),
        ),
    }
}

/// Empirical bike shares in equal-width distance bins, for overlaying on
/// the fitted curve. Empty bins are skipped.
pub fn empirical_bins(records: &[TripRecord], n_bins: usize) -> Vec<(f64, f64)> {
    let n_bins = n_bins.max(1);
    let mut d_min = f64::INFINITY;
    let mut d_max = f64::NEG_INFINITY;
    for r in records {
        d_min = d_min.min(r.distance_mi);
        d_max = d_max.max(r.distance_mi);
    }
    if !(d_min.is_finite() && d_max.is_finite()) || d_max <= d_min {
        return Vec::new();
    }

    let width = (d_max - d_min) / n_bins as f64;
    let mut totals = vec![0usize; n_bins];
    let mut bikes = vec![0usize; n_bins];
    for r in records {
        let idx = (((r.distance_mi - d_min) / width) as usize).min(n_bins - 1);
        totals[idx] += 1;
        if r.is_bike {
            bikes[idx] += 1;
        }
    }

    (0..n_bins)
        .filter(|&i| totals[i] > 0)
        .map(|i| {
            let mid = d_min + (i as f64 + 0.5) * width;
            (mid, bikes[i] as f64 / totals[i] as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IncomeBracket, Mode, Purpose};

    fn record(distance_mi: f64, is_bike: bool) -> TripRecord {
        TripRecord {
            house_id: "H1".to_string(),
            person_id: "1".to_string(),
            age: 25.0,
            mode: if is_bike { Mode::Bike } else { Mode::Auto },
            purpose: Purpose::Work,
            distance_mi,
            state: "06".to_string(),
            bracket: IncomeBracket::Under50k,
            travel_date: None,
            is_bike,
            has_vehicle: true,
            is_worker: true,
            unsafe_traffic: false,
            unsafe_crime: false,
            income: Some(40_000.0),
        }
    }

    #[test]
    fn bins_compute_shares() {
        let records = vec![
            record(1.0, true),
            record(1.2, false),
            record(9.0, false),
            record(9.5, false),
        ];
        let bins = empirical_bins(&records, 2);
        assert_eq!(bins.len(), 2);
        assert!((bins[0].1 - 0.5).abs() < 1e-12);
        assert!((bins[1].1 - 0.0).abs() < 1e-12);
    }

    #[test]
    fn bins_handle_degenerate_input() {
        assert!(empirical_bins(&[], 8).is_empty());
        assert!(empirical_bins(&[record(2.0, true)], 8).is_empty());
    }
}
