//! Formatted terminal output: run summary, frequency tables, the bracket
//! median table, and the coefficient table.

use crate::domain::{FitSummary, IncomeBracket, Mode, Purpose, RunConfig, TripRecord};
use crate::income::{BracketMedianTable, ReferenceFilter};
use crate::io::ingest::IngestedData;

/// Format the full run summary (dataset accounting + reference sample +
/// imputation + fit diagnostics).
pub fn format_run_summary(
    data: &IngestedData,
    ref_filter: &ReferenceFilter,
    table: &BracketMedianTable,
    summary: &FitSummary,
    config: &RunConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== modo - Bicycle Mode Choice (young-adult travel survey) ===\n");
    out.push_str(&format!(
        "Trips: {} read | {} used | {} excluded | {} row errors\n",
        data.trip_rows_read,
        data.rows_used,
        data.exclusions.total(),
        data.row_errors.len(),
    ));
    out.push_str(&format!(
        "Persons: {} read | States: {}\n",
        data.person_rows_read,
        data.states.join(","),
    ));
    if let (Some(d0), Some(d1)) = (data.stats.date_min, data.stats.date_max) {
        out.push_str(&format!("Travel dates: {d0} .. {d1}\n"));
    }
    out.push_str(&format!(
        "Distance: [{:.2}, {:.2}] mi (configured [{:.2}, {:.2}])\n",
        data.stats.distance_min, data.stats.distance_max, config.distance_min, config.distance_max,
    ));
    out.push_str(&format!(
        "Outcome: {} bike trips of {} ({})\n",
        data.stats.n_bike,
        data.stats.n_records,
        fmt_pct(data.stats.n_bike, data.stats.n_records),
    ));

    let exclusions = data.exclusions.entries();
    if !exclusions.is_empty() {
        out.push_str("\nExclusions by reason:\n");
        for (reason, n) in exclusions {
            out.push_str(&format!("  {:>6}  {}\n", n, reason.display_name()));
        }
    }

    if !data.row_errors.is_empty() {
        out.push_str(&format!(
            "\nRow errors (first {} of {}):\n",
            config.show_row_errors.min(data.row_errors.len()),
            data.row_errors.len()
        ));
        for err in data.row_errors.iter().take(config.show_row_errors) {
            match &err.id {
                Some(id) => out.push_str(&format!("  line {} [{}]: {}\n", err.line, id, err.message)),
                None => out.push_str(&format!("  line {}: {}\n", err.line, err.message)),
            }
        }
    }

    out.push_str(&format!(
        "\nReference sample: {} raw | {} used | {} outside 18-35 | {} negative income\n",
        ref_filter.n_raw, ref_filter.n_used, ref_filter.dropped_age, ref_filter.dropped_income,
    ));
    out.push_str(&format_median_table(table));

    out.push_str("\nModel diagnostics:\n");
    let d = &summary.diagnostics;
    out.push_str(&format!(
        "  n={} k={} | iterations={}{} | logL={:.3}\n",
        d.n,
        d.k,
        d.iterations,
        if d.converged { "" } else { " (NOT converged)" },
        d.log_likelihood,
    ));
    out.push_str(&format!(
        "  deviance={:.3} (null {:.3}) | McFadden R2={:.4}\n",
        d.deviance, d.null_deviance, d.mcfadden_r2,
    ));
    out.push('\n');

    out
}

/// Format the bracket median table, flagging sparse and non-monotone cells.
pub fn format_median_table(table: &BracketMedianTable) -> String {
    let mut out = String::new();

    out.push_str("\nBracket medians (reference sample):\n");
    out.push_str(&format!(
        "  {:<4} {:<12} {:>8} {:>14}\n",
        "code", "bracket", "n_ref", "median"
    ));
    for bracket in IncomeBracket::ALL {
        match table.cell(bracket) {
            Some(cell) => out.push_str(&format!(
                "  {:<4} {:<12} {:>8} {:>14}\n",
                bracket.code(),
                bracket.label(),
                cell.n,
                fmt_dollars(cell.median),
            )),
            None => out.push_str(&format!(
                "  {:<4} {:<12} {:>8} {:>14}\n",
                bracket.code(),
                bracket.label(),
                0,
                "(no support)",
            )),
        }
    }

    let violations = table.monotone_violations();
    if !violations.is_empty() {
        out.push_str("  warning: non-monotone medians:");
        for (a, b) in violations {
            out.push_str(&format!(" {}->{}", a.code(), b.code()));
        }
        out.push('\n');
    }

    out
}

/// Format the category frequency tables (counts and percentages).
pub fn format_frequency_tables(records: &[TripRecord]) -> String {
    let n = records.len();
    let mut out = String::new();

    out.push_str("Mode share:\n");
    for mode in Mode::ALL {
        let count = records.iter().filter(|r| r.mode == mode).count();
        out.push_str(&format_freq_row(mode.display_name(), count, n));
    }

    out.push_str("\nTrip purpose:\n");
    for purpose in Purpose::ALL {
        let count = records.iter().filter(|r| r.purpose == purpose).count();
        out.push_str(&format_freq_row(purpose.display_name(), count, n));
    }

    out.push_str("\nIncome bracket:\n");
    for bracket in IncomeBracket::ALL {
        let count = records.iter().filter(|r| r.bracket == bracket).count();
        out.push_str(&format_freq_row(bracket.label(), count, n));
    }

    out.push_str("\nSafety perception:\n");
    let unsafe_traffic = records.iter().filter(|r| r.unsafe_traffic).count();
    let unsafe_crime = records.iter().filter(|r| r.unsafe_crime).count();
    out.push_str(&format_freq_row("traffic: feels unsafe", unsafe_traffic, n));
    out.push_str(&format_freq_row("traffic: feels safe", n - unsafe_traffic, n));
    out.push_str(&format_freq_row("crime: feels unsafe", unsafe_crime, n));
    out.push_str(&format_freq_row("crime: feels safe", n - unsafe_crime, n));
    out.push('\n');

    out
}

/// Format the coefficient table with robust inference.
pub fn format_coefficients(summary: &FitSummary) -> String {
    let mut out = String::new();

    out.push_str("Coefficients (robust HC1 standard errors):\n");
    out.push_str(&format!(
        "{:<16} {:>10} {:>10} {:>8} {:>8} {:>10}\n",
        "term", "estimate", "se", "z", "p", "odds"
    ));
    out.push_str(&format!(
        "{:-<16} {:-<10} {:-<10} {:-<8} {:-<8} {:-<10}\n",
        "", "", "", "", "", ""
    ));

    for c in &summary.coefficients {
        out.push_str(&format!(
            "{:<16} {:>10.4} {:>10.4} {:>8.2} {:>8} {:>10.4}\n",
            truncate(&c.term, 16),
            c.estimate,
            c.robust_se,
            c.z,
            fmt_p(c.p_value),
            c.estimate.exp(),
        ));
    }

    out
}

fn format_freq_row(label: &str, count: usize, total: usize) -> String {
    format!("  {:<22} {:>7}  {:>6}\n", truncate(label, 22), count, fmt_pct(count, total))
}

fn fmt_pct(count: usize, total: usize) -> String {
    if total == 0 {
        return "-".to_string();
    }
    format!("{:.1}%", 100.0 * count as f64 / total as f64)
}

fn fmt_dollars(v: f64) -> String {
    format!("${:.0}", v)
}

fn fmt_p(p: f64) -> String {
    if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{p:.3}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…", &s[..max.saturating_sub(1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coefficient, FitDiagnostics};

    fn summary() -> FitSummary {
        FitSummary {
            terms: vec!["intercept".to_string(), "distance_mi".to_string()],
            betas: vec![1.0, -0.5],
            coefficients: vec![
                Coefficient {
                    term: "intercept".to_string(),
                    estimate: 1.0,
                    robust_se: 0.2,
                    z: 5.0,
                    p_value: 0.0000006,
                },
                Coefficient {
                    term: "distance_mi".to_string(),
                    estimate: -0.5,
                    robust_se: 0.1,
                    z: -5.0,
                    p_value: 0.04,
                },
            ],
            diagnostics: FitDiagnostics {
                n: 100,
                k: 2,
                iterations: 6,
                converged: true,
                log_likelihood: -50.0,
                null_deviance: 130.0,
                deviance: 100.0,
                mcfadden_r2: 0.23,
            },
            means: vec![1.0, 3.0],
            distance_range: (0.1, 10.0),
        }
    }

    #[test]
    fn coefficient_table_renders_all_terms() {
        let text = format_coefficients(&summary());
        assert!(text.contains("distance_mi"));
        assert!(text.contains("<0.001"));
        assert!(text.contains("0.040"));
    }

    #[test]
    fn median_table_marks_missing_brackets() {
        let table = BracketMedianTable::from_medians(&[(IncomeBracket::Under50k, 42_000.0)]);
        let text = format_median_table(&table);
        assert!(text.contains("$42000"));
        assert!(text.contains("(no support)"));
    }

    #[test]
    fn pct_handles_zero_total() {
        assert_eq!(fmt_pct(1, 0), "-");
        assert_eq!(fmt_pct(1, 4), "25.0%");
    }
}
