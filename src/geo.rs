// 🗺️ Zip code → coordinates
// Postal table uses the GeoNames dump layout (tab separated, no header):
// country, postal code, place, admin1 name, admin1 code, admin2 name, admin2 code,
// admin3 name, admin3 code, latitude, longitude, accuracy

use crate::ledger::TransactionTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const POSTAL_CODE_COL: usize = 1;
const LATITUDE_COL: usize = 9;
const LONGITUDE_COL: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ZipLookup {
    entries: HashMap<String, Coordinates>,
}

impl ZipLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open postal code table: {}", path.display()))?;
        let lookup = Self::from_reader(file)
            .with_context(|| format!("Failed to read postal code table: {}", path.display()))?;
        tracing::info!(path = %path.display(), entries = lookup.len(), "loaded postal codes");
        Ok(lookup)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut lookup = Self::new();
        let mut skipped = 0usize;
        for result in rdr.records() {
            let record = result?;
            let parsed = (
                record.get(POSTAL_CODE_COL),
                record.get(LATITUDE_COL).and_then(|s| s.trim().parse::<f64>().ok()),
                record.get(LONGITUDE_COL).and_then(|s| s.trim().parse::<f64>().ok()),
            );
            match parsed {
                (Some(code), Some(latitude), Some(longitude)) => {
                    lookup.insert(code, Coordinates { latitude, longitude });
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "postal table rows without coordinates");
        }
        Ok(lookup)
    }

    pub fn insert(&mut self, zip: &str, coordinates: Coordinates) {
        self.entries.insert(normalize_zip(zip), coordinates);
    }

    pub fn get(&self, zip: &str) -> Option<Coordinates> {
        self.entries.get(&normalize_zip(zip)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// "78701-1234" → "78701"; numeric zips that lost leading zeros are padded back.
pub fn normalize_zip(zip: &str) -> String {
    let base = zip.trim().split('-').next().unwrap_or("").trim();
    let base = base.strip_suffix(".0").unwrap_or(base);
    if !base.is_empty() && base.len() < 5 && base.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>5}", base)
    } else {
        base.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub amount: f64,
}

/// Transactions with a known zip code, plus how many had none.
pub fn geo_points(table: &TransactionTable, lookup: &ZipLookup) -> (Vec<GeoPoint>, usize) {
    let mut points = Vec::new();
    let mut missing = 0;
    for tx in table.iter() {
        match lookup.get(&tx.zip_code) {
            Some(c) => points.push(GeoPoint {
                latitude: c.latitude,
                longitude: c.longitude,
                label: tx.city_state.clone(),
                amount: tx.amount,
            }),
            None => missing += 1,
        }
    }
    if missing > 0 {
        tracing::debug!(missing, "transactions without coordinates");
    }
    (points, missing)
}
