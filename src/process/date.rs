use anyhow::{bail, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2}$").expect("date label regex is valid"));

/// The column a run extracts, and whether the table actually has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSelection {
    pub label: String,
    pub present: bool,
}

/// True for time-series headers such as `9/1/22`.
pub fn is_date_label(header: &str) -> bool {
    DATE_LABEL.is_match(header)
}

/// Format as the table's column label: `M/D/YY`, no zero padding.
pub fn format_label(date: NaiveDate) -> String {
    date.format("%-m/%-d/%y").to_string()
}

/// Inverse of [`format_label`]; two-digit years are 20xx.
pub fn parse_label(label: &str) -> Option<NaiveDate> {
    if !is_date_label(label) {
        return None;
    }
    let mut parts = label.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + year, month, day)
}

/// Pick the date column to extract.
///
/// Without an override this is the last date label in column order, since
/// the source appends one column per day. An override is formatted as a
/// label and used even when the table lacks it; `present` tells the caller.
pub fn select_date<'a, I>(labels: I, override_date: Option<NaiveDate>) -> Result<DateSelection>
where
    I: IntoIterator<Item = &'a str>,
{
    let labels: Vec<&str> = labels.into_iter().filter(|h| is_date_label(h)).collect();

    if let Some(date) = override_date {
        let label = format_label(date);
        let present = labels.iter().any(|l| *l == label);
        return Ok(DateSelection { label, present });
    }

    match labels.last() {
        Some(last) => Ok(DateSelection {
            label: (*last).to_string(),
            present: true,
        }),
        None => bail!("cases table has no date columns"),
    }
}
