use super::{table::SourceRow, utils::normalize_fips};

/// FIPS codes the source uses for rows that aren't real places.
pub const INVALID_FIPS: [&str; 2] = ["00000", "88888"];

pub const OUT_OF_STATE_PREFIX: &str = "Out of ";
pub const UNASSIGNED_COUNTY: &str = "Unassigned";

/// What to do with one source row. Checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClass {
    /// Reserved code; dropped.
    InvalidFips(String),
    /// Non-resident aggregate; dropped.
    OutOfState,
    /// State-level only; summed into the state's aggregate.
    Unassigned,
    /// A county, to be translated through the FIPS table.
    County(String),
}

pub fn classify(row: &SourceRow<'_>) -> RowClass {
    let fips = normalize_fips(row.fips());
    if INVALID_FIPS.contains(&fips.as_str()) {
        return RowClass::InvalidFips(fips);
    }

    let county = row.county_name();
    if county.starts_with(OUT_OF_STATE_PREFIX) {
        return RowClass::OutOfState;
    }
    if county == UNASSIGNED_COUNTY {
        return RowClass::Unassigned;
    }

    RowClass::County(fips)
}
