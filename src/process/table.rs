use anyhow::{bail, Result};

use crate::fetch::RawTable;

pub const FIPS: &str = "FIPS";
pub const ADMIN2: &str = "Admin2";
pub const PROVINCE_STATE: &str = "Province_State";
pub const COMBINED_KEY: &str = "Combined_Key";

/// Identifying columns. Only `Combined_Key` is always present; the lookup
/// side of the join may omit the rest.
#[derive(Debug, Clone, Copy)]
struct KeyColumns {
    fips: Option<usize>,
    admin2: Option<usize>,
    province_state: Option<usize>,
    combined_key: usize,
}

/// A JHU time-series CSV with its identifying columns resolved.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    raw: RawTable,
    keys: KeyColumns,
}

impl TimeSeriesTable {
    /// Table whose rows are classified: fails when any of `FIPS`, `Admin2`,
    /// `Province_State` or `Combined_Key` is missing from the header.
    pub fn new(raw: RawTable) -> Result<Self> {
        let keys = KeyColumns {
            fips: Some(require(&raw, FIPS)?),
            admin2: Some(require(&raw, ADMIN2)?),
            province_state: Some(require(&raw, PROVINCE_STATE)?),
            combined_key: require(&raw, COMBINED_KEY)?,
        };
        Ok(Self { raw, keys })
    }

    /// Table only looked up by `Combined_Key`; the other identifying
    /// columns are optional and read as empty when absent.
    pub fn keyed(raw: RawTable) -> Result<Self> {
        let keys = KeyColumns {
            fips: raw.column(FIPS),
            admin2: raw.column(ADMIN2),
            province_state: raw.column(PROVINCE_STATE),
            combined_key: require(&raw, COMBINED_KEY)?,
        };
        Ok(Self { raw, keys })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.raw.headers.iter().map(String::as_str)
    }

    /// Position of the column headed `label`.
    pub fn column(&self, label: &str) -> Option<usize> {
        self.raw.column(label)
    }

    pub fn len(&self) -> usize {
        self.raw.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = SourceRow<'_>> {
        self.raw.rows.iter().map(move |cells| SourceRow {
            table: self,
            cells,
        })
    }
}

fn require(raw: &RawTable, name: &str) -> Result<usize> {
    match raw.column(name) {
        Some(idx) => Ok(idx),
        None => bail!("table is missing required column {}", name),
    }
}

/// A borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    table: &'a TimeSeriesTable,
    cells: &'a [String],
}

impl<'a> SourceRow<'a> {
    fn cell(&self, idx: Option<usize>) -> &'a str {
        self.value(idx).unwrap_or("")
    }

    pub fn fips(&self) -> &'a str {
        self.cell(self.table.keys.fips)
    }

    pub fn county_name(&self) -> &'a str {
        self.cell(self.table.keys.admin2)
    }

    pub fn state_name(&self) -> &'a str {
        self.cell(self.table.keys.province_state)
    }

    pub fn combined_key(&self) -> &'a str {
        self.cell(Some(self.table.keys.combined_key))
    }

    /// Raw text in `column` (from [`TimeSeriesTable::column`]); `None` if
    /// the column or the cell is missing.
    pub fn value(&self, column: Option<usize>) -> Option<&'a str> {
        self.cells.get(column?).map(String::as_str)
    }
}
