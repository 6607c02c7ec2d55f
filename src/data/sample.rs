//! Synthetic survey generation for demos and offline runs.
//!
//! `modo sample` writes a trip file, a person file, and a reference-sample
//! extract with a known ground-truth coefficient vector, so the full
//! pipeline can be exercised without the real survey files or a network
//! connection:
//!
//! ```text
//! modo sample --out demo --seed 7
//! modo run --trips demo/trips.csv --persons demo/persons.csv \
//!     --reference-csv demo/reference.csv
//! ```
//!
//! Generation is deterministic given the seed.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;

use crate::domain::{PersonRow, ReferenceRecord, TripRow};
use crate::error::AppError;
use crate::income::assign_bracket;

/// Ground-truth logit coefficients, in the model's term order:
/// intercept, distance_mi, income_10k, age, has_vehicle, worker,
/// unsafe_traffic, unsafe_crime.
const TRUE_BETAS: [f64; 8] = [1.6, -0.45, -0.08, -0.04, -1.1, 0.2, -0.8, -0.3];

/// Fraction of rows carrying a sentinel code, to exercise the exclusion
/// accounting downstream.
const SENTINEL_RATE: f64 = 0.03;

const STATES: [&str; 3] = ["06", "17", "36"];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub out_dir: PathBuf,
    pub n_persons: usize,
    pub n_reference: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct SyntheticSurvey {
    pub trips: Vec<TripRow>,
    pub persons: Vec<PersonRow>,
    pub reference: Vec<ReferenceRecord>,
}

pub fn generate_survey(config: &SampleConfig) -> Result<SyntheticSurvey, AppError> {
    if config.n_persons == 0 {
        return Err(AppError::new(2, "Sample person count must be > 0."));
    }
    if config.n_reference == 0 {
        return Err(AppError::new(2, "Sample reference count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);

    let income_dist = LogNormal::new(60_000.0_f64.ln(), 0.7)
        .map_err(|e| AppError::new(4, format!("Income distribution error: {e}")))?;
    let distance_dist = LogNormal::new(0.7, 1.0)
        .map_err(|e| AppError::new(4, format!("Distance distribution error: {e}")))?;

    let week_start = NaiveDate::from_ymd_opt(2023, 5, 1)
        .ok_or_else(|| AppError::new(4, "Invalid sample week start date."))?;

    let mut trips = Vec::new();
    let mut persons = Vec::with_capacity(config.n_persons);

    for i in 0..config.n_persons {
        let house_id = format!("H{:05}", i + 1);
        let person_id = "1".to_string();

        // Mostly in the study window, with a tail outside it so the age
        // filter has something to drop.
        let age: i64 = if rng.gen_bool(0.9) {
            rng.gen_range(18..=35)
        } else {
            *[16, 17, 36, 38, 40].choose(&mut rng).unwrap_or(&40)
        };

        let household_income = income_dist.sample(&mut rng);
        let income_code = if rng.gen_bool(SENTINEL_RATE) {
            -7
        } else {
            assign_bracket(household_income).map_or(-7, |b| i64::from(b.code()))
        };

        let safe_traffic_code = likert(&mut rng, 0.35);
        let safe_crime_code = likert(&mut rng, 0.2);
        let unsafe_traffic = safe_traffic_code >= 4;
        let unsafe_crime = safe_crime_code >= 4;

        let veh_count: i64 = if household_income < 25_000.0 {
            rng.gen_range(0..=1)
        } else {
            rng.gen_range(0..=3)
        };
        let worker_code: i64 = if rng.gen_bool(0.75) { 1 } else { 2 };
        let state = (*STATES.choose(&mut rng).unwrap_or(&"06")).to_string();

        persons.push(PersonRow {
            house_id: house_id.clone(),
            person_id: person_id.clone(),
            safe_traffic_code,
            safe_crime_code,
        });

        let n_trips = rng.gen_range(1..=3);
        for _ in 0..n_trips {
            let distance_raw: f64 = distance_dist.sample(&mut rng);
            let distance_mi = distance_raw.clamp(0.1, 40.0);

            let logit = TRUE_BETAS[0]
                + TRUE_BETAS[1] * distance_mi
                + TRUE_BETAS[2] * (household_income / 10_000.0)
                + TRUE_BETAS[3] * age as f64
                + TRUE_BETAS[4] * f64::from(u8::from(veh_count > 0))
                + TRUE_BETAS[5] * f64::from(u8::from(worker_code == 1))
                + TRUE_BETAS[6] * f64::from(u8::from(unsafe_traffic))
                + TRUE_BETAS[7] * f64::from(u8::from(unsafe_crime));
            let p_bike = 1.0 / (1.0 + (-logit).exp());

            let mode_code = if rng.gen_bool(SENTINEL_RATE) {
                -8
            } else if rng.gen_bool(p_bike.clamp(0.0, 1.0)) {
                2
            } else {
                *[1, 3, 4, 5, 6, 7, 8].choose(&mut rng).unwrap_or(&3)
            };

            let purpose_code = if rng.gen_bool(SENTINEL_RATE) {
                -9
            } else {
                *[1, 2, 3, 4, 5, 97].choose(&mut rng).unwrap_or(&1)
            };

            let travel_date = week_start + Duration::days(rng.gen_range(0..7));

            trips.push(TripRow {
                house_id: house_id.clone(),
                person_id: person_id.clone(),
                age,
                mode_code,
                purpose_code,
                distance_mi,
                state: state.clone(),
                veh_count,
                worker_code,
                income_code,
                travel_date: Some(travel_date),
            });
        }
    }

    let reference = generate_reference(&mut rng, config.n_reference)?;

    Ok(SyntheticSurvey {
        trips,
        persons,
        reference,
    })
}

/// Draw the reference population: ages spill outside the study window and a
/// few incomes are negative, so the reference filter has work to do.
///
/// A deterministic spine of three records per bracket is appended so every
/// bracket resolves regardless of how the random draws land.
fn generate_reference(rng: &mut StdRng, n: usize) -> Result<Vec<ReferenceRecord>, AppError> {
    let income_dist = LogNormal::new(45_000.0_f64.ln(), 0.8)
        .map_err(|e| AppError::new(4, format!("Reference income distribution error: {e}")))?;

    let mut out = Vec::with_capacity(n + 33);
    for _ in 0..n {
        let age = f64::from(rng.gen_range(16..=40));
        let income = if rng.gen_bool(0.01) {
            -rng.gen_range(100.0..5_000.0)
        } else {
            income_dist.sample(rng)
        };
        out.push(ReferenceRecord { income, age });
    }

    let spine: [f64; 11] = [
        5_000.0, 12_000.0, 20_000.0, 30_000.0, 42_000.0, 62_000.0, 85_000.0, 110_000.0, 135_000.0,
        170_000.0, 240_000.0,
    ];
    for base in spine {
        for off in [-500.0f64, 0.0, 500.0] {
            out.push(ReferenceRecord {
                income: (base + off).max(0.0),
                age: 26.0,
            });
        }
    }

    Ok(out)
}

fn likert(rng: &mut StdRng, p_unsafe: f64) -> i64 {
    if rng.gen_bool(SENTINEL_RATE) {
        return -9;
    }
    if rng.gen_bool(p_unsafe) {
        rng.gen_range(4..=5)
    } else {
        rng.gen_range(1..=3)
    }
}

/// Write the three CSVs (`trips.csv`, `persons.csv`, `reference.csv`) into
/// `dir`, creating it if needed.
pub fn write_survey(dir: &Path, survey: &SyntheticSurvey) -> Result<(), AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

    let trips_path = dir.join("trips.csv");
    let mut w = csv::Writer::from_path(&trips_path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", trips_path.display())))?;
    w.write_record([
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
        "travel_date",
    ])
    .map_err(|e| AppError::new(2, format!("Failed to write trips header: {e}")))?;
    for t in &survey.trips {
        w.write_record([
            t.house_id.clone(),
            t.person_id.clone(),
            t.age.to_string(),
            t.mode_code.to_string(),
            t.purpose_code.to_string(),
            format!("{:.3}", t.distance_mi),
            t.state.clone(),
            t.veh_count.to_string(),
            t.worker_code.to_string(),
            t.income_code.to_string(),
            t.travel_date.map(|d| d.to_string()).unwrap_or_default(),
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write trips row: {e}")))?;
    }
    w.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush trips CSV: {e}")))?;

    let persons_path = dir.join("persons.csv");
    let mut w = csv::Writer::from_path(&persons_path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", persons_path.display())))?;
    w.write_record(["house_id", "person_id", "safe_traffic", "safe_crime"])
        .map_err(|e| AppError::new(2, format!("Failed to write persons header: {e}")))?;
    for p in &survey.persons {
        w.write_record([
            p.house_id.clone(),
            p.person_id.clone(),
            p.safe_traffic_code.to_string(),
            p.safe_crime_code.to_string(),
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write persons row: {e}")))?;
    }
    w.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush persons CSV: {e}")))?;

    let reference_path = dir.join("reference.csv");
    let mut w = csv::Writer::from_path(&reference_path).map_err(|e| {
        AppError::new(2, format!("Failed to create '{}': {e}", reference_path.display()))
    })?;
    w.write_record(["income", "age"])
        .map_err(|e| AppError::new(2, format!("Failed to write reference header: {e}")))?;
    for r in &survey.reference {
        w.write_record([&format!("{:.2}", r.income), &format!("{:.0}", r.age)])
            .map_err(|e| AppError::new(2, format!("Failed to write reference row: {e}")))?;
    }
    w.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush reference CSV: {e}")))?;

    Ok(())
}
