//! Survey CSV ingest and normalization.
//!
//! This module turns the trip and person extracts into a clean set of
//! `TripRecord`s that are safe to impute and fit.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip malformed rows, but report what happened)
//! - **Accounted exclusions**: sentinel codes and out-of-population rows are
//!   dropped declaratively, and every drop increments a per-reason counter
//!   so the report can reconcile `rows_read = used + excluded + errors`
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no imputation or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{
    AGE_MAX, AGE_MIN, IncomeBracket, Mode, PersonRow, Purpose, ReferenceRecord, RunConfig,
    TripRecord, TripRow,
};
use crate::error::AppError;

/// Likert codes at or above this level count as "feels unsafe".
const LIKERT_UNSAFE_MIN: i64 = 4;
const LIKERT_MAX: i64 = 5;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Why a structurally valid trip row was excluded from the population.
///
/// Exactly one reason is recorded per excluded row (the first failing
/// check, in the order below).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    MissingPerson,
    AgeRange,
    ModeSentinel,
    PurposeSentinel,
    DistanceInvalid,
    DistanceRange,
    WorkerSentinel,
    VehicleSentinel,
    IncomeSentinel,
    SafetySentinel,
}

impl ExclusionReason {
    pub const ALL: [ExclusionReason; 10] = [
        ExclusionReason::MissingPerson,
        ExclusionReason::AgeRange,
        ExclusionReason::ModeSentinel,
        ExclusionReason::PurposeSentinel,
        ExclusionReason::DistanceInvalid,
        ExclusionReason::DistanceRange,
        ExclusionReason::WorkerSentinel,
        ExclusionReason::VehicleSentinel,
        ExclusionReason::IncomeSentinel,
        ExclusionReason::SafetySentinel,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ExclusionReason::MissingPerson => "no matching person record",
            ExclusionReason::AgeRange => "age outside 18-35",
            ExclusionReason::ModeSentinel => "mode code missing/sentinel",
            ExclusionReason::PurposeSentinel => "purpose code missing/sentinel",
            ExclusionReason::DistanceInvalid => "distance not positive/finite",
            ExclusionReason::DistanceRange => "distance outside configured range",
            ExclusionReason::WorkerSentinel => "worker code missing/sentinel",
            ExclusionReason::VehicleSentinel => "vehicle count missing/sentinel",
            ExclusionReason::IncomeSentinel => "income bracket missing/sentinel",
            ExclusionReason::SafetySentinel => "safety perception missing/sentinel",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|r| *r == self).unwrap_or(0)
    }
}

/// Per-reason exclusion counts.
#[derive(Debug, Clone, Default)]
pub struct ExclusionTally {
    counts: [usize; 10],
}

impl ExclusionTally {
    pub fn record(&mut self, reason: ExclusionReason) {
        self.counts[reason.index()] += 1;
    }

    pub fn count(&self, reason: ExclusionReason) -> usize {
        self.counts[reason.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Non-zero reasons in declaration order.
    pub fn entries(&self) -> Vec<(ExclusionReason, usize)> {
        ExclusionReason::ALL
            .iter()
            .map(|r| (*r, self.count(*r)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Summary stats about the records actually used for fitting.
#[derive(Debug, Clone)]
pub struct DatasetStats {
    pub n_records: usize,
    pub n_bike: usize,
    pub distance_min: f64,
    pub distance_max: f64,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
}

/// Ingest output: normalized records + stats + exclusion accounting.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<TripRecord>,
    pub stats: DatasetStats,
    pub exclusions: ExclusionTally,
    pub row_errors: Vec<RowError>,
    pub trip_rows_read: usize,
    pub person_rows_read: usize,
    pub rows_used: usize,
    /// Distinct state FIPS codes in the final population, sorted. Scopes
    /// the PUMS reference pull.
    pub states: Vec<String>,
}

/// Load both survey files and produce the filtered analysis population.
pub fn load_survey(config: &RunConfig) -> Result<IngestedData, AppError> {
    let (persons, person_rows_read, mut row_errors) = load_persons(&config.persons_path)?;

    let file = File::open(&config.trips_path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open trip CSV '{}': {e}", config.trips_path.display()),
        )
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read trip CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    ensure_columns_exist(
        &header_map,
        &[
            "house_id",
            "person_id",
            "age",
            "mode",
            "purpose",
            "distance_mi",
            "state",
            "veh_count",
            "worker",
            "income_bracket",
        ],
        "trip",
    )?;

    let mut records = Vec::new();
    let mut exclusions = ExclusionTally::default();
    let mut trip_rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because records() starts after the header row and CSV line
        // numbers are 1-based.
        let line = idx + 2;
        trip_rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_trip_row(&record, &header_map) {
            Ok(row) => match normalize_trip(&row, &persons, config) {
                RowOutcome::Kept(rec) => records.push(rec),
                RowOutcome::Excluded(reason) => exclusions.record(reason),
            },
            Err(e) => row_errors.push(RowError {
                line,
                id: None,
                message: e,
            }),
        }
    }

    let rows_used = records.len();
    if rows_used == 0 {
        return Err(AppError::new(
            3,
            "No trips remain after filtering; nothing to analyze.",
        ));
    }

    let stats = compute_stats(&records).ok_or_else(|| {
        AppError::new(3, "No valid trips remain after filtering; nothing to analyze.")
    })?;

    let mut states: Vec<String> = records.iter().map(|r| r.state.clone()).collect();
    states.sort_unstable();
    states.dedup();

    Ok(IngestedData {
        records,
        stats,
        exclusions,
        row_errors,
        trip_rows_read,
        person_rows_read,
        rows_used,
        states,
    })
}

type PersonKey = (String, String);

/// Load the person file into a join map keyed on (house_id, person_id).
///
/// Duplicate keys keep the first row and report the rest as row errors.
pub fn load_persons(
    path: &Path,
) -> Result<(HashMap<PersonKey, PersonRow>, usize, Vec<RowError>), AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open person CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read person CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    ensure_columns_exist(
        &header_map,
        &["house_id", "person_id", "safe_traffic", "safe_crime"],
        "person",
    )?;

    let mut persons = HashMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_person_row(&record, &header_map) {
            Ok(row) => {
                let key = (row.house_id.clone(), row.person_id.clone());
                if persons.contains_key(&key) {
                    row_errors.push(RowError {
                        line,
                        id: Some(format!("{}/{}", key.0, key.1)),
                        message: "Duplicate person record; keeping the first.".to_string(),
                    });
                } else {
                    persons.insert(key, row);
                }
            }
            Err(e) => row_errors.push(RowError {
                line,
                id: None,
                message: e,
            }),
        }
    }

    Ok((persons, rows_read, row_errors))
}

/// Load a local reference extract (`income`, `age` columns).
///
/// Same semantics as the PUMS pull: every parseable observation is
/// returned; population restriction happens downstream.
pub fn load_reference_csv(path: &Path) -> Result<Vec<ReferenceRecord>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open reference CSV '{}': {e}", path.display()),
        )
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read reference CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_columns_exist(&header_map, &["income", "age"], "reference")?;

    let mut out = Vec::new();
    for result in reader.records() {
        let Ok(record) = result else { continue };
        let income = parse_opt_f64(get_optional(&record, &header_map, "income"));
        let age = parse_opt_f64(get_optional(&record, &header_map, "age"));
        if let (Some(income), Some(age)) = (income, age) {
            out.push(ReferenceRecord { income, age });
        }
    }

    if out.is_empty() {
        return Err(AppError::new(
            3,
            format!("Reference CSV '{}' contains no usable rows.", path.display()),
        ));
    }
    Ok(out)
}

enum RowOutcome {
    Kept(TripRecord),
    Excluded(ExclusionReason),
}

/// Apply the population filter and derive covariates.
///
/// Checks run in a fixed order and the first failure wins, so each dropped
/// row is counted exactly once.
fn normalize_trip(
    row: &TripRow,
    persons: &HashMap<PersonKey, PersonRow>,
    config: &RunConfig,
) -> RowOutcome {
    let key = (row.house_id.clone(), row.person_id.clone());
    let Some(person) = persons.get(&key) else {
        return RowOutcome::Excluded(ExclusionReason::MissingPerson);
    };

    if row.age < AGE_MIN || row.age > AGE_MAX {
        return RowOutcome::Excluded(ExclusionReason::AgeRange);
    }

    let Some(mode) = Mode::from_code(row.mode_code) else {
        return RowOutcome::Excluded(ExclusionReason::ModeSentinel);
    };

    let Some(purpose) = Purpose::from_code(row.purpose_code) else {
        return RowOutcome::Excluded(ExclusionReason::PurposeSentinel);
    };

    if !row.distance_mi.is_finite() || row.distance_mi <= 0.0 {
        return RowOutcome::Excluded(ExclusionReason::DistanceInvalid);
    }
    if row.distance_mi < config.distance_min || row.distance_mi > config.distance_max {
        return RowOutcome::Excluded(ExclusionReason::DistanceRange);
    }

    if !matches!(row.worker_code, 1 | 2) {
        return RowOutcome::Excluded(ExclusionReason::WorkerSentinel);
    }

    if row.veh_count < 0 {
        return RowOutcome::Excluded(ExclusionReason::VehicleSentinel);
    }

    let Some(bracket) = IncomeBracket::from_code(row.income_code) else {
        return RowOutcome::Excluded(ExclusionReason::IncomeSentinel);
    };

    if !likert_valid(person.safe_traffic_code) || !likert_valid(person.safe_crime_code) {
        return RowOutcome::Excluded(ExclusionReason::SafetySentinel);
    }

    RowOutcome::Kept(TripRecord {
        house_id: row.house_id.clone(),
        person_id: row.person_id.clone(),
        age: row.age as f64,
        mode,
        purpose,
        distance_mi: row.distance_mi,
        state: row.state.clone(),
        bracket,
        travel_date: row.travel_date,
        is_bike: mode == Mode::Bike,
        has_vehicle: row.veh_count > 0,
        is_worker: row.worker_code == 1,
        unsafe_traffic: person.safe_traffic_code >= LIKERT_UNSAFE_MIN,
        unsafe_crime: person.safe_crime_code >= LIKERT_UNSAFE_MIN,
        income: None,
    })
}

fn likert_valid(code: i64) -> bool {
    (1..=LIKERT_MAX).contains(&code)
}

fn parse_trip_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<TripRow, String> {
    let house_id = get_required(record, header_map, "house_id")?.to_string();
    let person_id = get_required(record, header_map, "person_id")?.to_string();
    let age = parse_i64(get_required(record, header_map, "age")?, "age")?;
    let mode_code = parse_i64(get_required(record, header_map, "mode")?, "mode")?;
    let purpose_code = parse_i64(get_required(record, header_map, "purpose")?, "purpose")?;
    let distance_mi = parse_f64(get_required(record, header_map, "distance_mi")?, "distance_mi")?;
    let state = normalize_state(get_required(record, header_map, "state")?)?;
    let veh_count = parse_i64(get_required(record, header_map, "veh_count")?, "veh_count")?;
    let worker_code = parse_i64(get_required(record, header_map, "worker")?, "worker")?;
    let income_code = parse_i64(
        get_required(record, header_map, "income_bracket")?,
        "income_bracket",
    )?;
    let travel_date =
        get_optional(record, header_map, "travel_date").and_then(|s| parse_date(s).ok());

    Ok(TripRow {
        house_id,
        person_id,
        age,
        mode_code,
        purpose_code,
        distance_mi,
        state,
        veh_count,
        worker_code,
        income_code,
        travel_date,
    })
}

fn parse_person_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<PersonRow, String> {
    Ok(PersonRow {
        house_id: get_required(record, header_map, "house_id")?.to_string(),
        person_id: get_required(record, header_map, "person_id")?.to_string(),
        safe_traffic_code: parse_i64(
            get_required(record, header_map, "safe_traffic")?,
            "safe_traffic",
        )?,
        safe_crime_code: parse_i64(
            get_required(record, header_map, "safe_crime")?,
            "safe_crime",
        )?,
    })
}

fn compute_stats(records: &[TripRecord]) -> Option<DatasetStats> {
    let mut distance_min = f64::INFINITY;
    let mut distance_max = f64::NEG_INFINITY;
    let mut n_bike = 0usize;
    let mut date_min: Option<NaiveDate> = None;
    let mut date_max: Option<NaiveDate> = None;

    for r in records {
        distance_min = distance_min.min(r.distance_mi);
        distance_max = distance_max.max(r.distance_mi);
        if r.is_bike {
            n_bike += 1;
        }
        if let Some(d) = r.travel_date {
            date_min = Some(date_min.map_or(d, |m| m.min(d)));
            date_max = Some(date_max.map_or(d, |m| m.max(d)));
        }
    }

    if !distance_min.is_finite() || !distance_max.is_finite() {
        return None;
    }

    Some(DatasetStats {
        n_records: records.len(),
        n_bike,
        distance_min,
        distance_max,
        date_min,
        date_max,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header. If we don't strip it, schema validation will
    // incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_columns_exist(
    header_map: &HashMap<String, usize>,
    required: &[&str],
    file_kind: &str,
) -> Result<(), AppError> {
    for name in required {
        if !header_map.contains_key(*name) {
            return Err(AppError::new(
                2,
                format!("Missing required column in {file_kind} CSV: `{name}`"),
            ));
        }
    }
    Ok(())
}

/// Normalize a state identifier to a two-digit FIPS code.
fn normalize_state(raw: &str) -> Result<String, String> {
    match raw.parse::<u32>() {
        Ok(v) if v <= 99 => Ok(format!("{v:02}")),
        _ => Err(format!("Invalid state FIPS code '{raw}'.")),
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_i64(s: &str, name: &str) -> Result<i64, String> {
    s.parse::<i64>()
        .map_err(|_| format!("Invalid integer for `{name}`: '{s}'."))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number for `{name}`: '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite number for `{name}`."))
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // ISO dates are recommended, but survey extracts in the wild use a few
    // other orderings; accept a small deterministic set.
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn temp_csv(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mode_odds_{name}_{}.csv", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn test_config(trips: PathBuf, persons: PathBuf) -> RunConfig {
        RunConfig {
            trips_path: trips,
            persons_path: persons,
            distance_min: 0.05,
            distance_max: 50.0,
            pums_year: 2023,
            reference_csv: None,
            show_row_errors: 5,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            plot_dir: None,
            export_results: None,
            export_model: None,
        }
    }

    const PERSONS: &str = "\
house_id,person_id,safe_traffic,safe_crime
H1,1,2,1
H2,1,4,5
H3,1,-9,1
";

    #[test]
    fn loads_and_filters_with_accounting() {
        let trips = temp_csv(
            "trips_ok",
            "\
house_id,person_id,age,mode,purpose,distance_mi,state,veh_count,worker,income_bracket,travel_date
H1,1,25,2,2,1.5,06,1,1,5,2023-05-02
H1,1,25,-8,2,1.5,06,1,1,5,2023-05-02
H2,1,40,2,2,1.5,06,1,1,5,
H2,1,30,3,4,2.5,17,2,2,7,
H3,1,25,2,2,1.5,06,1,1,5,
H9,1,25,2,2,1.5,06,1,1,5,
",
        );
        let persons = temp_csv("persons_ok", PERSONS);
        let data = load_survey(&test_config(trips, persons)).unwrap();

        assert_eq!(data.trip_rows_read, 6);
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.exclusions.total(), 4);
        assert_eq!(data.exclusions.count(ExclusionReason::ModeSentinel), 1);
        assert_eq!(data.exclusions.count(ExclusionReason::AgeRange), 1);
        assert_eq!(data.exclusions.count(ExclusionReason::SafetySentinel), 1);
        assert_eq!(data.exclusions.count(ExclusionReason::MissingPerson), 1);

        // rows_read reconciles with used + excluded + parse errors.
        assert_eq!(
            data.trip_rows_read,
            data.rows_used + data.exclusions.total() + data.row_errors.len()
        );

        assert_eq!(data.states, vec!["06".to_string(), "17".to_string()]);

        let bike = &data.records[0];
        assert!(bike.is_bike);
        assert!(!bike.unsafe_traffic);
        let auto = &data.records[1];
        assert_eq!(auto.mode, Mode::Auto);
        assert!(auto.unsafe_traffic);
        assert!(auto.unsafe_crime);
        assert!(!auto.is_worker);
        assert_eq!(auto.bracket, IncomeBracket::Under100k);
    }

    #[test]
    fn missing_column_is_schema_error() {
        let trips = temp_csv(
            "trips_missing_col",
            "house_id,person_id,age,mode,purpose,distance_mi,state,veh_count,worker\nH1,1,25,2,2,1.5,06,1,1\n",
        );
        let persons = temp_csv("persons_missing_col", PERSONS);
        let err = load_survey(&test_config(trips, persons)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("income_bracket"));
    }

    #[test]
    fn empty_population_is_exit_code_3() {
        let trips = temp_csv(
            "trips_empty_pop",
            "\
house_id,person_id,age,mode,purpose,distance_mi,state,veh_count,worker,income_bracket
H1,1,50,2,2,1.5,06,1,1,5
",
        );
        let persons = temp_csv("persons_empty_pop", PERSONS);
        let err = load_survey(&test_config(trips, persons)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn state_codes_are_zero_padded() {
        assert_eq!(normalize_state("6").unwrap(), "06");
        assert_eq!(normalize_state("36").unwrap(), "36");
        assert!(normalize_state("CA").is_err());
    }

    #[test]
    fn reference_csv_round_trip() {
        let path = temp_csv("reference", "income,age\n42000,25\n-100,30\nbad,40\n");
        let records = load_reference_csv(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].income, 42_000.0);
        assert_eq!(records[1].income, -100.0);
    }

    #[test]
    fn date_parsing_accepts_common_formats() {
        assert!(parse_date("2023-05-01").is_ok());
        assert!(parse_date("05/01/2023").is_ok());
        assert!(parse_date("2023/05/01").is_ok());
        assert!(parse_date("May 1").is_err());
    }
}
