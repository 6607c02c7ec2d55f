//! Bracket median table construction and lookup.
//!
//! Construction is a one-shot batch computation over an immutable snapshot
//! of the reference sample:
//!
//! 1. restrict to the study age window and non-negative income
//! 2. assign each record a bracket via the shared threshold table
//! 3. compute the median income per bracket
//!
//! A bracket with zero members after grouping produces no entry; looking it
//! up later is a hard failure, never a silent default — a default would
//! bias the fitted model with no trace in the output.

use rayon::prelude::*;

use crate::domain::{AGE_MAX, AGE_MIN, IncomeBracket, ReferenceRecord, TripRecord};
use crate::income::bracket::assign_bracket;
use crate::math::median;

/// One populated bracket: member count and median income.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketCell {
    pub n: usize,
    pub median: f64,
}

/// Lookup failure: the trip population uses a bracket the reference sample
/// could not populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingBracket(pub IncomeBracket);

impl std::fmt::Display for MissingBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no reference-sample support for income bracket {} ({})",
            self.0.code(),
            self.0.label()
        )
    }
}

impl std::error::Error for MissingBracket {}

/// Mapping from bracket to median reference income.
///
/// Immutable once built; lookups are pure and deterministic.
#[derive(Debug, Clone)]
pub struct BracketMedianTable {
    cells: [Option<BracketCell>; 11],
}

impl BracketMedianTable {
    /// Build the table from an already-filtered reference sample.
    ///
    /// Records that fail bracket classification (negative or non-finite
    /// income) are skipped; callers filter those out beforehand via
    /// [`filter_reference`], so in practice nothing is dropped here.
    pub fn build(records: &[ReferenceRecord]) -> Self {
        let mut groups: [Vec<f64>; 11] = Default::default();
        for rec in records {
            if let Some(bracket) = assign_bracket(rec.income) {
                groups[usize::from(bracket.code()) - 1].push(rec.income);
            }
        }

        // PUMS pulls run to six figures of rows; the per-bracket sorts are
        // independent, so compute the medians in parallel.
        let computed: Vec<Option<BracketCell>> = groups
            .par_iter()
            .map(|incomes| {
                median(incomes).map(|m| BracketCell {
                    n: incomes.len(),
                    median: m,
                })
            })
            .collect();

        let mut cells: [Option<BracketCell>; 11] = Default::default();
        for (slot, cell) in cells.iter_mut().zip(computed) {
            *slot = cell;
        }
        Self { cells }
    }

    /// Build directly from per-bracket medians. Test/demo convenience.
    pub fn from_medians(entries: &[(IncomeBracket, f64)]) -> Self {
        let mut cells: [Option<BracketCell>; 11] = Default::default();
        for &(bracket, m) in entries {
            cells[usize::from(bracket.code()) - 1] = Some(BracketCell { n: 0, median: m });
        }
        Self { cells }
    }

    /// Impute a continuous income for a bracket.
    pub fn income_for(&self, bracket: IncomeBracket) -> Result<f64, MissingBracket> {
        self.cells[usize::from(bracket.code()) - 1]
            .map(|cell| cell.median)
            .ok_or(MissingBracket(bracket))
    }

    pub fn cell(&self, bracket: IncomeBracket) -> Option<BracketCell> {
        self.cells[usize::from(bracket.code()) - 1]
    }

    /// Number of populated brackets.
    pub fn populated(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Adjacent bracket pairs whose medians decrease in bracket order.
    ///
    /// Monotone medians are a property of the underlying data, not a
    /// guarantee of the table; violations are surfaced as warnings.
    pub fn monotone_violations(&self) -> Vec<(IncomeBracket, IncomeBracket)> {
        let mut out = Vec::new();
        let mut prev: Option<(IncomeBracket, f64)> = None;
        for bracket in IncomeBracket::ALL {
            let Some(cell) = self.cell(bracket) else {
                continue;
            };
            if let Some((prev_bracket, prev_median)) = prev {
                if cell.median < prev_median {
                    out.push((prev_bracket, bracket));
                }
            }
            prev = Some((bracket, cell.median));
        }
        out
    }
}

/// Result of restricting a raw reference pull to the study population.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceFilter {
    pub n_raw: usize,
    pub n_used: usize,
    pub dropped_age: usize,
    pub dropped_income: usize,
}

/// Restrict reference records to age in `[AGE_MIN, AGE_MAX]` and
/// non-negative, finite income.
pub fn filter_reference(records: &[ReferenceRecord]) -> (Vec<ReferenceRecord>, ReferenceFilter) {
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped_age = 0usize;
    let mut dropped_income = 0usize;

    for rec in records {
        if !(rec.age >= AGE_MIN as f64 && rec.age <= AGE_MAX as f64) {
            dropped_age += 1;
            continue;
        }
        if !rec.income.is_finite() || rec.income < 0.0 {
            dropped_income += 1;
            continue;
        }
        kept.push(*rec);
    }

    let filter = ReferenceFilter {
        n_raw: records.len(),
        n_used: kept.len(),
        dropped_age,
        dropped_income,
    };
    (kept, filter)
}

/// Attach the bracket-median income to every trip record.
///
/// Fails on the first bracket with no reference support; partial imputation
/// would leave the downstream fit on a silently shifted population.
pub fn impute_incomes(
    records: &mut [TripRecord],
    table: &BracketMedianTable,
) -> Result<(), MissingBracket> {
    for rec in records.iter_mut() {
        rec.income = Some(table.income_for(rec.bracket)?);
    }
    Ok(())
}
