//! Census ACS PUMS integration for the reference income sample.
//!
//! One request per run: person-level income (`PINCP`) and age (`AGEP`) from
//! the ACS 1-year public-use microdata sample, restricted to the state FIPS
//! codes observed in the trip population. Retrieval failure is fatal to the
//! run; a single-shot batch job has nothing sensible to retry into.

use reqwest::blocking::Client;

use crate::domain::ReferenceRecord;
use crate::error::AppError;

const BASE_URL: &str = "https://api.census.gov/data";

pub struct PumsClient {
    client: Client,
    api_key: Option<String>,
}

impl PumsClient {
    /// Build a client, picking up `CENSUS_API_KEY` from the environment
    /// (`.env` supported). The key is optional; the API serves keyless
    /// low-volume queries.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("CENSUS_API_KEY").ok().filter(|k| !k.is_empty());
        Ok(Self {
            client: Client::new(),
            api_key,
        })
    }

    /// Fetch the raw reference sample for the given survey year and states.
    ///
    /// Age/income restriction happens downstream in
    /// [`crate::income::filter_reference`]; this returns every parseable
    /// observation so the report can account for what was dropped.
    pub fn fetch_reference(
        &self,
        year: u16,
        states: &[String],
    ) -> Result<Vec<ReferenceRecord>, AppError> {
        if states.is_empty() {
            return Err(AppError::new(
                2,
                "No state codes in the trip population; cannot scope the PUMS query.",
            ));
        }

        let url = format!("{BASE_URL}/{year}/acs/acs1/pums");
        let state_list = states.join(",");
        let scope = format!("state:{state_list}");

        let mut req = self
            .client
            .get(&url)
            .query(&[("get", "PINCP,AGEP"), ("for", scope.as_str())]);
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let resp = req
            .send()
            .map_err(|e| AppError::new(4, format!("PUMS request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("PUMS request failed with status {}.", resp.status()),
            ));
        }

        // The Census API returns an array of arrays: a header row of column
        // names followed by one row of strings per person record.
        let body: Vec<Vec<Option<String>>> = resp
            .json()
            .map_err(|e| AppError::new(4, format!("Failed to parse PUMS response: {e}")))?;

        let records = parse_pums_rows(&body)?;
        if records.is_empty() {
            return Err(AppError::new(
                4,
                format!("No PUMS observations returned for year {year}, states {state_list}."),
            ));
        }
        Ok(records)
    }
}

fn parse_pums_rows(body: &[Vec<Option<String>>]) -> Result<Vec<ReferenceRecord>, AppError> {
    let Some(header) = body.first() else {
        return Err(AppError::new(4, "Empty PUMS response body."));
    };

    let income_idx = find_column(header, "PINCP")
        .ok_or_else(|| AppError::new(4, "PUMS response is missing the PINCP column."))?;
    let age_idx = find_column(header, "AGEP")
        .ok_or_else(|| AppError::new(4, "PUMS response is missing the AGEP column."))?;

    let mut out = Vec::with_capacity(body.len().saturating_sub(1));
    for row in &body[1..] {
        // Suppressed or not-in-universe cells come back null, blank, or as
        // "b"-filled placeholders; skip the record rather than failing the
        // whole pull.
        let Some(income) = cell_value(row, income_idx) else {
            continue;
        };
        let Some(age) = cell_value(row, age_idx) else {
            continue;
        };
        out.push(ReferenceRecord { income, age });
    }
    Ok(out)
}

fn find_column(header: &[Option<String>], name: &str) -> Option<usize> {
    header.iter().position(|cell| {
        cell.as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(name))
    })
}

fn cell_value(row: &[Option<String>], idx: usize) -> Option<f64> {
    let raw = row.get(idx)?.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    let v = raw.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[Option<&str>]]) -> Vec<Vec<Option<String>>> {
        data.iter()
            .map(|row| row.iter().map(|c| c.map(str::to_string)).collect())
            .collect()
    }

    #[test]
    fn parses_header_and_rows() {
        let body = rows(&[
            &[Some("PINCP"), Some("AGEP"), Some("state")],
            &[Some("52000"), Some("25"), Some("06")],
            &[Some("-900"), Some("31"), Some("06")],
        ]);
        let records = parse_pums_rows(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].income, 52_000.0);
        assert_eq!(records[1].income, -900.0);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let body = rows(&[
            &[Some("pincp"), Some("agep")],
            &[Some("1000"), Some("20")],
        ]);
        assert_eq!(parse_pums_rows(&body).unwrap().len(), 1);
    }

    #[test]
    fn skips_unparseable_cells() {
        let body = rows(&[
            &[Some("PINCP"), Some("AGEP")],
            &[None, Some("25")],
            &[Some("bbbbbbb"), Some("25")],
            &[Some("42000"), Some("")],
            &[Some("42000"), Some("25")],
        ]);
        let records = parse_pums_rows(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].age, 25.0);
    }

    #[test]
    fn missing_column_is_an_error() {
        let body = rows(&[&[Some("AGEP")], &[Some("25")]]);
        let err = parse_pums_rows(&body).unwrap_err();
        assert!(err.to_string().contains("PINCP"));
    }
}
