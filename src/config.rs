// src/config.rs

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate};
use std::env;

use crate::{fetch::urls, process::date::parse_label};

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    pub cases_url: String,
    pub deaths_url: String,
    /// Path or URL of the FIPS lookup JSON.
    pub fips_table: String,
    /// Day to extract instead of the newest column.
    pub scrape_date: Option<NaiveDate>,
    pub log_level: String,
}

impl ScrapeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let scrape_date = match get("SCRAPE_DATE") {
            Some(raw) => Some(parse_scrape_date(&raw)?),
            None => None,
        };

        Ok(Self {
            cases_url: get("JHU_CASES_URL").unwrap_or_else(|| urls::CASES_URL.to_string()),
            deaths_url: get("JHU_DEATHS_URL").unwrap_or_else(|| urls::DEATHS_URL.to_string()),
            fips_table: get("FIPS_TABLE").unwrap_or_else(|| "fips.json".to_string()),
            scrape_date,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `M/D/YYYY`, `M/D/YY` or RFC 3339.
pub fn parse_scrape_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    // Before `%m/%d/%Y`, which would read `22` as year 22.
    if let Some(date) = parse_label(raw) {
        return Ok(date);
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    bail!("unrecognised SCRAPE_DATE {:?}", raw)
}
