//! Command-line parsing for the mode-choice analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the imputation/modeling code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "modo",
    version,
    about = "Bicycle mode choice modeling for young-adult travel surveys"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full analysis: ingest, impute, fit, report, plot, export.
    Run(RunArgs),
    /// Print the category frequency tables only (useful for scripting).
    Tables(RunArgs),
    /// Write a synthetic demo survey (trips, persons, reference CSVs).
    Sample(SampleArgs),
    /// Re-render the effect plots from a previously exported model JSON.
    Plot(PlotArgs),
}

/// Common options for the analysis commands.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Trip CSV path.
    #[arg(long, default_value = "trips.csv")]
    pub trips: PathBuf,

    /// Person CSV path.
    #[arg(long, default_value = "persons.csv")]
    pub persons: PathBuf,

    /// Minimum trip distance (miles) kept in the population.
    #[arg(long, default_value_t = 0.05)]
    pub distance_min: f64,

    /// Maximum trip distance (miles) kept in the population.
    #[arg(long, default_value_t = 50.0)]
    pub distance_max: f64,

    /// ACS 1-year PUMS survey year for the reference sample.
    #[arg(long, default_value_t = 2023)]
    pub pums_year: u16,

    /// Load the reference sample from a local CSV (`income`,`age` columns)
    /// instead of querying the PUMS API.
    #[arg(long, value_name = "CSV")]
    pub reference_csv: Option<PathBuf>,

    /// How many row-level ingest errors to echo in the summary.
    #[arg(long, default_value_t = 5)]
    pub show_row_errors: usize,

    /// Render ASCII plots in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Also write the three plots as SVG files into this directory.
    #[arg(long, value_name = "DIR")]
    pub plot_dir: Option<PathBuf>,

    /// Export per-trip results (covariates + imputed income + fitted
    /// probability) to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fitted model (terms + coefficients + grid) to JSON.
    #[arg(long = "export-model", value_name = "JSON")]
    pub export_model: Option<PathBuf>,
}

/// Options for synthetic survey generation.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    /// Output directory for `trips.csv`, `persons.csv`, `reference.csv`.
    #[arg(long, default_value = "demo")]
    pub out: PathBuf,

    /// Number of synthetic persons (each takes 1-3 trips).
    #[arg(long, default_value_t = 500)]
    pub persons: usize,

    /// Number of synthetic reference-sample records.
    #[arg(long, default_value_t = 4000)]
    pub reference: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved model.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Model JSON file produced by `modo run --export-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}
