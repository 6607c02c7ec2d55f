//! Export augmented trip records to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream
//! scripts: one row per analyzed trip with the derived covariates, the
//! imputed income, and the fitted probability.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FitSummary, TripRecord};
use crate::error::AppError;
use crate::fit::{design_row, predict_prob};

/// Write per-trip results to a CSV file.
pub fn write_results_csv(
    path: &Path,
    records: &[TripRecord],
    summary: &FitSummary,
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;

    writeln!(
        file,
        "house_id,person_id,age,mode,purpose,distance_mi,state,bracket_code,bracket_label,\
         income_imputed,has_vehicle,worker,unsafe_traffic,unsafe_crime,travel_date,is_bike,p_bike_fit"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for rec in records {
        let row = design_row(rec)?;
        let p_fit = predict_prob(&summary.betas, &row);

        writeln!(
            file,
            "{},{},{:.0},{},{},{:.3},{},{},{},{:.2},{},{},{},{},{},{},{:.6}",
            rec.house_id,
            rec.person_id,
            rec.age,
            rec.mode.display_name(),
            rec.purpose.display_name(),
            rec.distance_mi,
            rec.state,
            rec.bracket.code(),
            rec.bracket.label(),
            rec.income.unwrap_or(f64::NAN),
            u8::from(rec.has_vehicle),
            u8::from(rec.is_worker),
            u8::from(rec.unsafe_traffic),
            u8::from(rec.unsafe_crime),
            rec.travel_date.map(|d| d.to_string()).unwrap_or_default(),
            u8::from(rec.is_bike),
            p_fit,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coefficient, FitDiagnostics, IncomeBracket, Mode, Purpose};

    fn record() -> TripRecord {
        TripRecord {
            house_id: "H1".to_string(),
            person_id: "1".to_string(),
            age: 25.0,
            mode: Mode::Bike,
            purpose: Purpose::Work,
            distance_mi: 2.0,
            state: "06".to_string(),
            bracket: IncomeBracket::Under50k,
            travel_date: None,
            is_bike: true,
            has_vehicle: false,
            is_worker: true,
            unsafe_traffic: false,
            unsafe_crime: false,
            income: Some(42_000.0),
        }
    }

    fn summary() -> FitSummary {
        let k = crate::fit::TERMS.len();
        FitSummary {
            terms: crate::fit::TERMS.iter().map(|t| t.to_string()).collect(),
            betas: vec![0.0; k],
            coefficients: (0..k)
                .map(|i| Coefficient {
                    term: crate::fit::TERMS[i].to_string(),
                    estimate: 0.0,
                    robust_se: 1.0,
                    z: 0.0,
                    p_value: 1.0,
                })
                .collect(),
            diagnostics: FitDiagnostics {
                n: 1,
                k,
                iterations: 1,
                converged: true,
                log_likelihood: 0.0,
                null_deviance: 1.0,
                deviance: 1.0,
                mcfadden_r2: 0.0,
            },
            means: vec![1.0; k],
            distance_range: (0.1, 10.0),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!("mode_odds_export_{}.csv", std::process::id()));
        write_results_csv(&path, &[record()], &summary()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("house_id,person_id"));
        let row = lines.next().unwrap();
        assert!(row.contains("bike"));
        assert!(row.contains("42000.00"));
        // Zero betas: fitted probability is exactly one half.
        assert!(row.ends_with("0.500000"));
        std::fs::remove_file(&path).ok();
    }
}
