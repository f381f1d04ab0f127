//! Recorded monthly dengue case counts
//!
//! Loaded once from a CSV with `region,year,month,cases` columns. Region
//! names are matched case-insensitively against a region's canonical or
//! display name.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use shared::{Month, Region, MAX_LAGS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("case history file '{0}' not found")]
    NotFound(String),

    #[error("failed to read case history: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

#[derive(Debug, Deserialize)]
struct CaseRecord {
    region: String,
    year: i32,
    month: u32,
    cases: f64,
}

/// Case counts keyed by normalized region name, then `(year, month)`
#[derive(Debug, Clone, Default)]
pub struct CaseHistoryStore {
    by_region: HashMap<String, BTreeMap<(i32, u32), f64>>,
    rows: usize,
}

impl CaseHistoryStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HistoryError::NotFound(path.display().to_string()));
        }
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HistoryError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut store = Self::default();
        for (idx, result) in rdr.deserialize::<CaseRecord>().enumerate() {
            let row = idx + 2;
            let record = result?;
            if Month::new(record.month).is_none() {
                return Err(HistoryError::InvalidRow {
                    row,
                    message: format!("month {} is not in 1..=12", record.month),
                });
            }
            if !record.cases.is_finite() || record.cases < 0.0 {
                return Err(HistoryError::InvalidRow {
                    row,
                    message: format!("cases must be a non-negative number, got {}", record.cases),
                });
            }
            store.insert(&record.region, record.year, record.month, record.cases);
        }

        Ok(store)
    }

    /// Later rows for the same month overwrite earlier ones.
    pub fn insert(&mut self, region: &str, year: i32, month: u32, cases: f64) {
        let previous = self
            .by_region
            .entry(normalize(region))
            .or_default()
            .insert((year, month), cases);
        if previous.is_none() {
            self.rows += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Up to six consecutive monthly counts preceding `year`/`month`, most
    /// recent first. Stops at the first gap.
    pub fn recent(&self, region: &Region, year: i32, month: Month) -> Vec<f64> {
        let Some(series) = self
            .by_region
            .get(&normalize(&region.canonical_name))
            .or_else(|| self.by_region.get(&normalize(&region.display_name)))
        else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(MAX_LAGS);
        let (mut y, mut m) = (year, month.number());
        for _ in 0..MAX_LAGS {
            if m == 1 {
                y -= 1;
                m = 12;
            } else {
                m -= 1;
            }
            match series.get(&(y, m)) {
                Some(cases) => out.push(*cases),
                None => break,
            }
        }
        out
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
