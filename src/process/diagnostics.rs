use serde::Serialize;
use std::fmt;
use tracing::warn;

/// A recoverable anomaly met while normalizing. Each one is logged when
/// recorded and handed back to the caller with the regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The requested date has no column; every count reads as zero.
    MissingDate { date: String },
    /// The cases table has the date but the deaths table doesn't; deaths read as zero.
    MissingDeathsDate { date: String },
    /// Reserved FIPS code (`00000`, `88888`).
    InvalidFips { combined_key: String, fips: String },
    /// "Out of <state>" pseudo-county.
    OutOfState { combined_key: String },
    /// FIPS code not in the lookup table.
    UnmappedFips { combined_key: String, fips: String },
    /// Unassigned row whose state name has no abbreviation.
    UnknownState { combined_key: String, state: String },
    /// Count cell that isn't a non-negative number; read as zero.
    BadCount {
        combined_key: String,
        table: &'static str,
        raw: String,
    },
    /// Case row with no death row of the same combined key.
    MissingDeaths { combined_key: String },
    /// Death row never matched by a case row.
    UnmatchedDeaths { combined_key: String },
}

impl Diagnostic {
    /// Same string as the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::MissingDate { .. } => "missing_date",
            Diagnostic::MissingDeathsDate { .. } => "missing_deaths_date",
            Diagnostic::InvalidFips { .. } => "invalid_fips",
            Diagnostic::OutOfState { .. } => "out_of_state",
            Diagnostic::UnmappedFips { .. } => "unmapped_fips",
            Diagnostic::UnknownState { .. } => "unknown_state",
            Diagnostic::BadCount { .. } => "bad_count",
            Diagnostic::MissingDeaths { .. } => "missing_deaths",
            Diagnostic::UnmatchedDeaths { .. } => "unmatched_deaths",
        }
    }

    /// True for the reasons that drop a row from the output.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Diagnostic::InvalidFips { .. }
                | Diagnostic::OutOfState { .. }
                | Diagnostic::UnmappedFips { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingDate { date } => {
                write!(f, "No data present for {}, output will be empty", date)
            }
            Diagnostic::MissingDeathsDate { date } => {
                write!(f, "Deaths table has no column for {}, deaths will be 0", date)
            }
            Diagnostic::InvalidFips { combined_key, fips } => {
                write!(f, "Skipping incorrect FIPS code {} for {}", fips, combined_key)
            }
            Diagnostic::OutOfState { combined_key } => {
                write!(f, "Skipping out of state data for {}", combined_key)
            }
            Diagnostic::UnmappedFips { combined_key, fips } => {
                write!(f, "Skipping {} at (FIPS {})", combined_key, fips)
            }
            Diagnostic::UnknownState {
                combined_key,
                state,
            } => write!(
                f,
                "No abbreviation for state {:?} ({}), keeping full name",
                state, combined_key
            ),
            Diagnostic::BadCount {
                combined_key,
                table,
                raw,
            } => write!(
                f,
                "Unparseable {} count {:?} for {}, using 0",
                table, raw, combined_key
            ),
            Diagnostic::MissingDeaths { combined_key } => {
                write!(f, "No deaths row for {}, using 0", combined_key)
            }
            Diagnostic::UnmatchedDeaths { combined_key } => {
                write!(f, "Deaths row {} has no cases row, ignored", combined_key)
            }
        }
    }
}

/// Collects diagnostics for one run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn record(&mut self, diagnostic: Diagnostic) {
        warn!("⚠️  {}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
