//! Read/write model JSON files.
//!
//! Model JSON is the "portable" representation of a fitted model:
//! - terms, coefficients and robust inference
//! - fit diagnostics and the covariate means
//! - a precomputed base probability grid for quick plotting
//!
//! The schema is defined by `domain::ModelFile`; `modo plot` re-renders the
//! effect plots from one of these without refitting.

use std::fs::File;
use std::path::Path;

use chrono::Local;

use crate::domain::{FitSummary, ModelFile};
use crate::error::AppError;
use crate::fit::probability_curve;

const GRID_POINTS: usize = 101;

/// Write a model JSON file.
pub fn write_model_json(path: &Path, summary: &FitSummary, pums_year: u16) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display()))
    })?;

    let model = ModelFile {
        tool: "modo".to_string(),
        fitted_date: Local::now().date_naive(),
        pums_year,
        summary: summary.clone(),
        grid: probability_curve(summary, GRID_POINTS, &[]),
    };

    serde_json::to_writer_pretty(file, &model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;

    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display()))
    })?;
    let model: ModelFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    Ok(model)
}
