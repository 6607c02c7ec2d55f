//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during filtering and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting without refitting

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Age window defining the study population (inclusive on both ends).
///
/// The same window restricts the trip records and the reference microdata
/// sample; the bracket medians are only meaningful if both populations are
/// drawn from the same age range.
pub const AGE_MIN: i64 = 18;
pub const AGE_MAX: i64 = 35;

/// Travel mode, decoded from the survey's numeric mode codes.
///
/// Negative codes are "missing/refused" sentinels and decode to `None`;
/// rows carrying them are excluded from the analysis population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Walk,
    Bike,
    Auto,
    Transit,
    Other,
}

impl Mode {
    pub const ALL: [Mode; 5] = [Mode::Walk, Mode::Bike, Mode::Auto, Mode::Transit, Mode::Other];

    /// Decode a raw survey mode code.
    ///
    /// Codes 3-6 are the private-vehicle family (car, SUV, van, pickup);
    /// 7-8 are local bus and rail.
    pub fn from_code(code: i64) -> Option<Mode> {
        match code {
            1 => Some(Mode::Walk),
            2 => Some(Mode::Bike),
            3..=6 => Some(Mode::Auto),
            7..=8 => Some(Mode::Transit),
            9..=97 => Some(Mode::Other),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Walk => "walk",
            Mode::Bike => "bike",
            Mode::Auto => "auto",
            Mode::Transit => "transit",
            Mode::Other => "other",
        }
    }
}

/// Trip purpose, decoded from the survey's destination-purpose codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Home,
    Work,
    School,
    Errands,
    Social,
    Other,
}

impl Purpose {
    pub const ALL: [Purpose; 6] = [
        Purpose::Home,
        Purpose::Work,
        Purpose::School,
        Purpose::Errands,
        Purpose::Social,
        Purpose::Other,
    ];

    pub fn from_code(code: i64) -> Option<Purpose> {
        match code {
            1 => Some(Purpose::Home),
            2 => Some(Purpose::Work),
            3 => Some(Purpose::School),
            4 => Some(Purpose::Errands),
            5 => Some(Purpose::Social),
            6..=97 => Some(Purpose::Other),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Purpose::Home => "home",
            Purpose::Work => "work",
            Purpose::School => "school",
            Purpose::Errands => "errands",
            Purpose::Social => "social/rec",
            Purpose::Other => "other",
        }
    }
}

/// Ordinal household income bracket.
///
/// Eleven ordered ranges of annual income, the last unbounded above. The
/// numeric thresholds live in `income::bracket` so that a single constant
/// table serves both the reference-sample classifier and trip-record code
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeBracket {
    Under10k,
    Under15k,
    Under25k,
    Under35k,
    Under50k,
    Under75k,
    Under100k,
    Under125k,
    Under150k,
    Under200k,
    Top,
}

impl IncomeBracket {
    pub const ALL: [IncomeBracket; 11] = [
        IncomeBracket::Under10k,
        IncomeBracket::Under15k,
        IncomeBracket::Under25k,
        IncomeBracket::Under35k,
        IncomeBracket::Under50k,
        IncomeBracket::Under75k,
        IncomeBracket::Under100k,
        IncomeBracket::Under125k,
        IncomeBracket::Under150k,
        IncomeBracket::Under200k,
        IncomeBracket::Top,
    ];

    /// The survey's 1-based bracket code.
    pub fn code(self) -> u8 {
        match self {
            IncomeBracket::Under10k => 1,
            IncomeBracket::Under15k => 2,
            IncomeBracket::Under25k => 3,
            IncomeBracket::Under35k => 4,
            IncomeBracket::Under50k => 5,
            IncomeBracket::Under75k => 6,
            IncomeBracket::Under100k => 7,
            IncomeBracket::Under125k => 8,
            IncomeBracket::Under150k => 9,
            IncomeBracket::Under200k => 10,
            IncomeBracket::Top => 11,
        }
    }

    /// Decode a raw survey bracket code. Sentinels and out-of-range codes
    /// decode to `None`.
    pub fn from_code(code: i64) -> Option<IncomeBracket> {
        match code {
            1 => Some(IncomeBracket::Under10k),
            2 => Some(IncomeBracket::Under15k),
            3 => Some(IncomeBracket::Under25k),
            4 => Some(IncomeBracket::Under35k),
            5 => Some(IncomeBracket::Under50k),
            6 => Some(IncomeBracket::Under75k),
            7 => Some(IncomeBracket::Under100k),
            8 => Some(IncomeBracket::Under125k),
            9 => Some(IncomeBracket::Under150k),
            10 => Some(IncomeBracket::Under200k),
            11 => Some(IncomeBracket::Top),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IncomeBracket::Under10k => "< $10k",
            IncomeBracket::Under15k => "$10k-$15k",
            IncomeBracket::Under25k => "$15k-$25k",
            IncomeBracket::Under35k => "$25k-$35k",
            IncomeBracket::Under50k => "$35k-$50k",
            IncomeBracket::Under75k => "$50k-$75k",
            IncomeBracket::Under100k => "$75k-$100k",
            IncomeBracket::Under125k => "$100k-$125k",
            IncomeBracket::Under150k => "$125k-$150k",
            IncomeBracket::Under200k => "$150k-$200k",
            IncomeBracket::Top => ">= $200k",
        }
    }
}

/// A raw row of the trip CSV (codes still undecoded).
///
/// This mirrors the recommended schema in `docs/csv.md` and allows us to:
/// - perform row-level validation with good error messages
/// - count sentinel-code exclusions by reason
#[derive(Debug, Clone)]
pub struct TripRow {
    pub house_id: String,
    pub person_id: String,
    pub age: i64,
    pub mode_code: i64,
    pub purpose_code: i64,
    pub distance_mi: f64,
    /// Two-digit state FIPS code.
    pub state: String,
    pub veh_count: i64,
    pub worker_code: i64,
    pub income_code: i64,
    pub travel_date: Option<NaiveDate>,
}

/// A raw row of the person CSV.
#[derive(Debug, Clone)]
pub struct PersonRow {
    pub house_id: String,
    pub person_id: String,
    /// Likert code 1-5: "neighborhood streets feel safe from traffic"
    /// (1 strongly agree ... 5 strongly disagree).
    pub safe_traffic_code: i64,
    /// Likert code 1-5: "neighborhood streets feel safe from crime".
    pub safe_crime_code: i64,
}

/// A joined, filtered, covariate-derived analysis record.
///
/// `income` starts empty and is attached by the imputation step; nothing
/// else on the record is mutated after ingest.
#[derive(Debug, Clone)]
pub struct TripRecord {
    pub house_id: String,
    pub person_id: String,
    pub age: f64,
    pub mode: Mode,
    pub purpose: Purpose,
    pub distance_mi: f64,
    pub state: String,
    pub bracket: IncomeBracket,
    pub travel_date: Option<NaiveDate>,

    // Derived covariates.
    pub is_bike: bool,
    pub has_vehicle: bool,
    pub is_worker: bool,
    pub unsafe_traffic: bool,
    pub unsafe_crime: bool,

    /// Bracket-median imputed household income (annual dollars).
    pub income: Option<f64>,
}

/// One observation from the external reference microdata sample.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceRecord {
    /// Annual household income (dollars, non-negative after filtering).
    pub income: f64,
    /// Respondent age (years).
    pub age: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub trips_path: PathBuf,
    pub persons_path: PathBuf,

    pub distance_min: f64,
    pub distance_max: f64,

    /// ACS 1-year PUMS survey year for the reference pull.
    pub pums_year: u16,
    /// Local reference extract used instead of the PUMS API when set.
    pub reference_csv: Option<PathBuf>,

    /// How many row-level ingest errors to echo in the summary.
    pub show_row_errors: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub plot_dir: Option<PathBuf>,

    pub export_results: Option<PathBuf>,
    pub export_model: Option<PathBuf>,
}

/// One fitted coefficient with its robust inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub robust_se: f64,
    pub z: f64,
    pub p_value: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub n: usize,
    pub k: usize,
    pub iterations: usize,
    pub converged: bool,
    pub log_likelihood: f64,
    pub null_deviance: f64,
    pub deviance: f64,
    pub mcfadden_r2: f64,
}

/// Fitted model: terms, point estimates, robust inference, diagnostics,
/// and the covariate means used to draw effect curves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub terms: Vec<String>,
    pub betas: Vec<f64>,
    pub coefficients: Vec<Coefficient>,
    pub diagnostics: FitDiagnostics,
    /// Column means of the design matrix (intercept included, = 1.0).
    pub means: Vec<f64>,
    /// Observed distance range, for plotting.
    pub distance_range: (f64, f64),
}

/// A saved model file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub fitted_date: NaiveDate,
    pub pums_year: u16,
    pub summary: FitSummary,
    /// Precomputed base curve (all covariates at their means) for quick
    /// plotting; split curves are recomputed from `summary`.
    pub grid: ProbGrid,
}

/// A sampled probability-vs-distance curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbGrid {
    pub distance_mi: Vec<f64>,
    pub p_bike: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_sentinels_decode_to_none() {
        assert_eq!(Mode::from_code(-7), None);
        assert_eq!(Mode::from_code(-8), None);
        assert_eq!(Mode::from_code(0), None);
        assert_eq!(Mode::from_code(2), Some(Mode::Bike));
        assert_eq!(Mode::from_code(5), Some(Mode::Auto));
    }

    #[test]
    fn bracket_codes_round_trip() {
        for bracket in IncomeBracket::ALL {
            assert_eq!(IncomeBracket::from_code(i64::from(bracket.code())), Some(bracket));
        }
        assert_eq!(IncomeBracket::from_code(0), None);
        assert_eq!(IncomeBracket::from_code(12), None);
        assert_eq!(IncomeBracket::from_code(-9), None);
    }

    #[test]
    fn brackets_are_ordered() {
        let codes: Vec<u8> = IncomeBracket::ALL.iter().map(|b| b.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
    }
}
