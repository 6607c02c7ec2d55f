//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the ingest → impute → fit pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, PlotArgs, RunArgs, SampleArgs};
use crate::data::{SampleConfig, generate_survey, write_survey};
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `modo` binary.
pub fn run() -> Result<(), AppError> {
    // We want `modo` and `modo --trips t.csv` to behave like `modo run ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of
    // the argv list before parsing. This preserves a clean clap structure
    // while retaining the short UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args, OutputMode::Full),
        Command::Tables(args) => handle_run(args, OutputMode::TablesOnly),
        Command::Sample(args) => handle_sample(args),
        Command::Plot(args) => handle_plot(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    TablesOnly,
}

fn handle_run(args: RunArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_analysis(&config)?;

    if mode == OutputMode::Full {
        println!(
            "{}",
            crate::report::format_run_summary(
                &run.ingest,
                &run.ref_filter,
                &run.table,
                &run.summary,
                &config,
            )
        );
    }

    println!("{}", crate::report::format_frequency_tables(&run.ingest.records));

    if mode == OutputMode::Full {
        println!("{}", crate::report::format_coefficients(&run.summary));

        if config.plot {
            println!(
                "{}",
                crate::plot::render_effect_plots_ascii(
                    &run.plots,
                    &run.bins,
                    config.plot_width,
                    config.plot_height,
                )
            );
        }

        if let Some(dir) = &config.plot_dir {
            let written = crate::plot::write_effect_plots_svg(dir, &run.plots, &run.bins)?;
            for path in written {
                println!("wrote {}", path.display());
            }
        }

        if let Some(path) = &config.export_results {
            crate::io::export::write_results_csv(path, &run.ingest.records, &run.summary)?;
            println!("wrote {}", path.display());
        }
        if let Some(path) = &config.export_model {
            crate::io::model_file::write_model_json(path, &run.summary, config.pums_year)?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        out_dir: args.out.clone(),
        n_persons: args.persons,
        n_reference: args.reference,
        seed: args.seed,
    };
    let survey = generate_survey(&config)?;
    write_survey(&args.out, &survey)?;
    println!(
        "wrote {} trips, {} persons, {} reference records under {}",
        survey.trips.len(),
        survey.persons.len(),
        survey.reference.len(),
        args.out.display(),
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let model = crate::io::model_file::read_model_json(&args.model)?;
    let plots = crate::plot::build_effect_plots(&model.summary);

    println!(
        "{}",
        crate::plot::render_effect_plots_ascii(&plots, &[], args.width, args.height)
    );
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        trips_path: args.trips.clone(),
        persons_path: args.persons.clone(),
        distance_min: args.distance_min,
        distance_max: args.distance_max,
        pums_year: args.pums_year,
        reference_csv: args.reference_csv.clone(),
        show_row_errors: args.show_row_errors,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        plot_dir: args.plot_dir.clone(),
        export_results: args.export.clone(),
        export_model: args.export_model.clone(),
    }
}

/// Rewrite argv so `modo` defaults to `modo run`.
///
/// Rules:
/// - `modo`                       -> `modo run`
/// - `modo --trips t.csv ...`     -> `modo run --trips t.csv ...`
/// - `modo --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "tables" | "sample" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    // Otherwise, leave as-is (clap will produce the usage error).
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("modo")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn bare_invocation_defaults_to_run() {
        assert_eq!(rewrite_args(argv(&[])), argv(&["run"]));
        assert_eq!(
            rewrite_args(argv(&["--trips", "t.csv"])),
            argv(&["run", "--trips", "t.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(argv(&["tables"])), argv(&["tables"]));
        assert_eq!(rewrite_args(argv(&["--help"])), argv(&["--help"]));
        assert_eq!(rewrite_args(argv(&["sample", "--seed", "7"])), argv(&["sample", "--seed", "7"]));
    }
}
