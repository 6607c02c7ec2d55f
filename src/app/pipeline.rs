//! Shared analysis pipeline used by the `run` and `tables` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> reference pull -> median table -> impute -> fit -> plots
//!
//! The command handlers can then focus on presentation (printing vs files).

use crate::data::PumsClient;
use crate::domain::{FitSummary, RunConfig};
use crate::error::AppError;
use crate::fit::fit_trip_model;
use crate::income::{BracketMedianTable, ReferenceFilter, filter_reference, impute_incomes};
use crate::io::ingest::{IngestedData, load_reference_csv, load_survey};
use crate::plot::{EffectPlots, build_effect_plots, empirical_bins};

/// Number of distance bins for the empirical overlay.
const OVERLAY_BINS: usize = 10;

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub ref_filter: ReferenceFilter,
    pub table: BracketMedianTable,
    pub summary: FitSummary,
    pub plots: EffectPlots,
    pub bins: Vec<(f64, f64)>,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_analysis(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Ingest and filter the survey extracts.
    let mut ingest = load_survey(config)?;

    // 2) Pull the reference sample (local CSV wins over the network).
    let raw_reference = match &config.reference_csv {
        Some(path) => load_reference_csv(path)?,
        None => PumsClient::from_env()?.fetch_reference(config.pums_year, &ingest.states)?,
    };

    // 3) Restrict it to the study population and build the median table.
    let (reference, ref_filter) = filter_reference(&raw_reference);
    if reference.is_empty() {
        return Err(AppError::new(
            3,
            "Reference sample is empty after the age/income restriction.",
        ));
    }
    let table = BracketMedianTable::build(&reference);

    // 4) Impute. A bracket without reference support aborts the run here;
    //    silently dropping those trips would shift the population.
    impute_incomes(&mut ingest.records, &table)
        .map_err(|e| AppError::new(3, format!("Imputation failed: {e}.")))?;

    // 5) Fit and derive the plot data.
    let summary = fit_trip_model(&ingest.records)?;
    let plots = build_effect_plots(&summary);
    let bins = empirical_bins(&ingest.records, OVERLAY_BINS);

    Ok(RunOutput {
        ingest,
        ref_filter,
        table,
        summary,
        plots,
        bins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleConfig, generate_survey, write_survey};

    /// End-to-end over synthetic data: sample -> CSVs -> full pipeline.
    #[test]
    fn pipeline_runs_on_synthetic_survey() {
        let dir = std::env::temp_dir().join(format!("mode_odds_pipeline_{}", std::process::id()));
        let sample = SampleConfig {
            out_dir: dir.clone(),
            n_persons: 600,
            n_reference: 3000,
            seed: 42,
        };
        let survey = generate_survey(&sample).unwrap();
        write_survey(&dir, &survey).unwrap();

        let config = RunConfig {
            trips_path: dir.join("trips.csv"),
            persons_path: dir.join("persons.csv"),
            distance_min: 0.05,
            distance_max: 50.0,
            pums_year: 2023,
            reference_csv: Some(dir.join("reference.csv")),
            show_row_errors: 5,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            plot_dir: None,
            export_results: None,
            export_model: None,
        };

        let run = run_analysis(&config).unwrap();

        // The sentinel rate keeps some rows out; accounting must reconcile.
        assert!(run.ingest.rows_used > 200);
        assert_eq!(
            run.ingest.trip_rows_read,
            run.ingest.rows_used + run.ingest.exclusions.total() + run.ingest.row_errors.len()
        );

        // Every analyzed trip carries an imputed income.
        assert!(run.ingest.records.iter().all(|r| r.income.is_some()));

        // The reference spine populates every bracket.
        assert_eq!(run.table.populated(), 11);

        // The synthetic ground truth has a negative distance effect.
        let d = &run.summary.diagnostics;
        assert!(d.converged);
        assert!(run.summary.betas[crate::fit::IDX_DISTANCE] < 0.0);
        assert_eq!(run.plots.base.distance_mi.len(), run.plots.base.p_bike.len());

        std::fs::remove_dir_all(&dir).ok();
    }
}
