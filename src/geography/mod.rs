// src/geography/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::fetch::table::load_text;

pub mod states;

/// One entry of a country-levels style `fips.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FipsRecord {
    pub state_code_iso: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub countrylevel_id: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
}

/// Canonical identifiers for one county.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountyLocation {
    /// `fips:<code>`
    pub county: String,
    /// `iso2:<XX>`
    pub state: String,
}

/// Lookup from a 5-digit FIPS code to its record.
#[derive(Debug, Clone, Default)]
pub struct FipsTable {
    records: HashMap<String, FipsRecord>,
}

impl FipsTable {
    pub fn from_json(text: &str) -> Result<Self> {
        let records: HashMap<String, FipsRecord> =
            serde_json::from_str(text).context("parsing FIPS lookup JSON")?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, fips: &str) -> Option<&FipsRecord> {
        self.records.get(fips)
    }

    /// Translate a normalized FIPS code, or `None` if the table doesn't know it.
    pub fn locate(&self, fips: &str) -> Option<CountyLocation> {
        self.get(fips).map(|record| CountyLocation {
            county: format!("fips:{}", fips),
            state: format!("iso2:{}", record.state_code_iso),
        })
    }
}

impl FromIterator<(String, FipsRecord)> for FipsTable {
    fn from_iter<I: IntoIterator<Item = (String, FipsRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Load the FIPS lookup from a local path or an `http(s)` URL.
#[instrument(level = "info", skip(client))]
pub async fn load_fips_table(client: &Client, source: &str) -> Result<FipsTable> {
    let text = load_text(client, source)
        .await
        .with_context(|| format!("loading FIPS table from {}", source))?;
    let table = FipsTable::from_json(&text)?;
    info!(entries = table.len(), "loaded FIPS table");
    Ok(table)
}
