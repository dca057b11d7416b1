// src/process/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, instrument};

use crate::{
    fetch::{urls::SourceInfo, RawTable},
    geography::{states, FipsTable},
};

pub mod classify;
pub mod date;
pub mod diagnostics;
pub mod table;
pub mod unassigned;
pub mod utils;

use classify::{classify, RowClass};
use diagnostics::{Diagnostic, Diagnostics};
use table::{SourceRow, TimeSeriesTable};
use unassigned::UnassignedAccumulator;
use utils::{parse_count, parse_string};

/// County value for counts known only at state level. Resolved downstream.
pub const UNASSIGNED: &str = "(unassigned)";

/// Case and death counts of one location on the selected date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub cases: u64,
    pub deaths: u64,
    /// `fips:<code>` or [`UNASSIGNED`].
    pub county: String,
    /// `iso2:<XX>` for counties, the bare abbreviation for unassigned sums.
    pub state: String,
}

/// Output of one normalization run.
#[derive(Debug, Clone, Serialize)]
pub struct Normalized {
    /// Column label the counts were read from.
    pub date: String,
    /// Counties in source order, then one unassigned sum per state.
    pub regions: Vec<Region>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Normalized {
    /// Rows dropped from the output, by any reason.
    pub fn skipped(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_skip()).count()
    }

    /// The regions tagged with the source they came from, as printed by the binary.
    pub fn report<'a>(&'a self, source: &'a SourceInfo) -> Report<'a> {
        Report {
            source,
            date: &self.date,
            regions: &self.regions,
        }
    }
}

/// What the merge stage consumes: source metadata, the date and the regions.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub source: &'a SourceInfo,
    pub date: &'a str,
    pub regions: &'a [Region],
}

/// Normalize the JHU cases/deaths tables into regions for one date.
///
/// Death rows are paired with case rows by `Combined_Key`, the only
/// identifying column the deaths table needs. `override_date`
/// replaces the default of the newest column; a date the table doesn't have is
/// reported and yields zero counts.
#[instrument(level = "info", skip(cases, deaths, fips))]
pub fn normalize(
    cases: RawTable,
    deaths: RawTable,
    fips: &FipsTable,
    override_date: Option<NaiveDate>,
) -> Result<Normalized> {
    let cases = TimeSeriesTable::new(cases).context("cases table")?;
    let deaths = TimeSeriesTable::keyed(deaths).context("deaths table")?;
    let mut diagnostics = Diagnostics::default();

    let selection = date::select_date(cases.headers(), override_date)?;
    if !selection.present {
        diagnostics.record(Diagnostic::MissingDate {
            date: selection.label.clone(),
        });
    }
    let label = selection.label;
    debug!(date = %label, "selected date column");

    let case_col = cases.column(&label);
    let death_col = deaths.column(&label);
    if selection.present && death_col.is_none() {
        diagnostics.record(Diagnostic::MissingDeathsDate {
            date: label.clone(),
        });
    }
    // Repeated keys pair up in order of appearance.
    let death_rows: Vec<SourceRow<'_>> = deaths.rows().collect();
    let mut death_index: HashMap<&str, VecDeque<usize>> = HashMap::with_capacity(death_rows.len());
    for (i, row) in death_rows.iter().enumerate() {
        death_index.entry(row.combined_key()).or_default().push_back(i);
    }
    let mut matched = vec![false; death_rows.len()];

    let mut regions = Vec::with_capacity(cases.len());
    let mut unassigned = UnassignedAccumulator::default();

    for case_row in cases.rows() {
        let combined_key = case_row.combined_key();
        let death_row = death_index
            .get_mut(combined_key)
            .and_then(VecDeque::pop_front)
            .map(|i| {
                matched[i] = true;
                death_rows[i]
            });

        let class = classify(&case_row);
        let location = match class {
            RowClass::InvalidFips(code) => {
                diagnostics.record(Diagnostic::InvalidFips {
                    combined_key: combined_key.to_string(),
                    fips: code,
                });
                continue;
            }
            RowClass::OutOfState => {
                diagnostics.record(Diagnostic::OutOfState {
                    combined_key: combined_key.to_string(),
                });
                continue;
            }
            RowClass::Unassigned => None,
            RowClass::County(code) => match fips.locate(&code) {
                Some(location) => Some(location),
                None => {
                    diagnostics.record(Diagnostic::UnmappedFips {
                        combined_key: combined_key.to_string(),
                        fips: code,
                    });
                    continue;
                }
            },
        };

        let case_count = read_count(&case_row, case_col, "cases", &mut diagnostics);
        let death_count = match death_row {
            Some(row) => read_count(&row, death_col, "deaths", &mut diagnostics),
            None => {
                diagnostics.record(Diagnostic::MissingDeaths {
                    combined_key: combined_key.to_string(),
                });
                0
            }
        };

        match location {
            Some(location) => regions.push(Region {
                cases: case_count,
                deaths: death_count,
                county: location.county,
                state: location.state,
            }),
            None => {
                let state_name = parse_string(case_row.state_name());
                let state = match states::abbreviation(&state_name) {
                    Some(abbr) => abbr.to_string(),
                    None => {
                        diagnostics.record(Diagnostic::UnknownState {
                            combined_key: combined_key.to_string(),
                            state: state_name.clone(),
                        });
                        state_name
                    }
                };
                unassigned.add(&state, case_count, death_count);
            }
        }
    }

    for (row, _) in death_rows.iter().zip(&matched).filter(|(_, m)| !**m) {
        diagnostics.record(Diagnostic::UnmatchedDeaths {
            combined_key: row.combined_key().to_string(),
        });
    }

    let counties = regions.len();
    let unassigned_states = unassigned.len();
    regions.extend(unassigned.into_regions());

    let diagnostics = diagnostics.into_vec();
    info!(
        date = %label,
        counties,
        unassigned_states,
        diagnostics = diagnostics.len(),
        "normalized"
    );

    Ok(Normalized {
        date: label,
        regions,
        diagnostics,
    })
}

fn read_count(
    row: &SourceRow<'_>,
    column: Option<usize>,
    table: &'static str,
    diagnostics: &mut Diagnostics,
) -> u64 {
    let raw = row.value(column).unwrap_or("");
    parse_count(raw).unwrap_or_else(|| {
        diagnostics.record(Diagnostic::BadCount {
            combined_key: row.combined_key().to_string(),
            table,
            raw: raw.to_string(),
        });
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetch::table::parse_csv, geography::FipsRecord};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    const CASES_HEADER: &str =
        "UID,iso2,FIPS,Admin2,Province_State,Country_Region,Combined_Key,8/31/22,9/1/22";
    const DEATHS_HEADER: &str =
        "UID,iso2,FIPS,Admin2,Province_State,Country_Region,Combined_Key,Population,8/31/22,9/1/22";

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,jhuscraper::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn fips_table() -> FipsTable {
        [("04013", "AZ"), ("48201", "TX"), ("01001", "AL")]
            .into_iter()
            .map(|(code, state)| {
                (
                    code.to_string(),
                    FipsRecord {
                        state_code_iso: state.to_string(),
                        name: None,
                        countrylevel_id: None,
                        population: None,
                    },
                )
            })
            .collect()
    }

    /// `rows`: (fips, admin2, state, cases 8/31, cases 9/1, deaths 8/31, deaths 9/1)
    fn tables(rows: &[(&str, &str, &str, &str, &str, &str, &str)]) -> Result<(RawTable, RawTable)> {
        let mut cases = format!("{}\n", CASES_HEADER);
        let mut deaths = format!("{}\n", DEATHS_HEADER);
        for (i, (fips, admin2, state, c0, c1, d0, d1)) in rows.iter().enumerate() {
            let key = format!("\"{}, {}, US\"", admin2, state);
            cases.push_str(&format!(
                "{},US,{},{},{},US,{},{},{}\n",
                i, fips, admin2, state, key, c0, c1
            ));
            deaths.push_str(&format!(
                "{},US,{},{},{},US,{},1000,{},{}\n",
                i, fips, admin2, state, key, d0, d1
            ));
        }
        Ok((parse_csv(&cases)?, parse_csv(&deaths)?))
    }

    fn county(cases: u64, deaths: u64, fips: &str, state: &str) -> Region {
        Region {
            cases,
            deaths,
            county: format!("fips:{}", fips),
            state: format!("iso2:{}", state),
        }
    }

    #[test]
    fn test_single_county() -> Result<()> {
        init_test_logging();
        let (cases, deaths) = tables(&[("04013", "Maricopa", "Arizona", "98", "100", "1", "2")])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(out.date, "9/1/22");
        assert_eq!(out.regions, vec![county(100, 2, "04013", "AZ")]);
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_float_fips_is_normalized() -> Result<()> {
        let (cases, deaths) = tables(&[("4013.0", "Maricopa", "Arizona", "0", "7", "0", "0")])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;
        assert_eq!(out.regions, vec![county(7, 0, "04013", "AZ")]);
        Ok(())
    }

    #[test]
    fn test_unassigned_rows_sum_per_state() -> Result<()> {
        let (cases, deaths) = tables(&[
            ("90048", "Unassigned", "Texas", "0", "5", "0", "0"),
            ("48201", "Harris", "Texas", "0", "40", "0", "4"),
            ("90048", "Unassigned", "Texas", "0", "3", "0", "1"),
        ])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(
            out.regions,
            vec![
                county(40, 4, "48201", "TX"),
                Region {
                    cases: 8,
                    deaths: 1,
                    county: UNASSIGNED.into(),
                    state: "TX".into(),
                },
            ]
        );
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_fips_is_skipped_with_one_warning() -> Result<()> {
        let (cases, deaths) = tables(&[("00000", "Somewhere", "Texas", "1", "9", "0", "0")])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert!(out.regions.is_empty());
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::InvalidFips {
                combined_key: "Somewhere, Texas, US".into(),
                fips: "00000".into(),
            }]
        );
        assert_eq!(out.skipped(), 1);
        Ok(())
    }

    #[test]
    fn test_skips_sentinels_out_of_state_and_unmapped() -> Result<()> {
        let (cases, deaths) = tables(&[
            ("88888", "", "Diamond Princess", "1", "1", "0", "0"),
            ("80001", "Out of AL", "Alabama", "1", "2", "0", "0"),
            ("99999", "Nowhere", "Alabama", "1", "2", "0", "0"),
            ("01001", "Autauga", "Alabama", "10", "11", "0", "1"),
        ])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(out.regions, vec![county(11, 1, "01001", "AL")]);
        assert_eq!(out.skipped(), 3);
        assert!(matches!(out.diagnostics[0], Diagnostic::InvalidFips { .. }));
        assert!(matches!(out.diagnostics[1], Diagnostic::OutOfState { .. }));
        assert_eq!(
            out.diagnostics[2],
            Diagnostic::UnmappedFips {
                combined_key: "Nowhere, Alabama, US".into(),
                fips: "99999".into(),
            }
        );
        Ok(())
    }

    #[test]
    fn test_override_date() -> Result<()> {
        let (cases, deaths) = tables(&[("04013", "Maricopa", "Arizona", "98", "100", "1", "2")])?;
        let day = NaiveDate::from_ymd_opt(2022, 8, 31).unwrap();
        let out = normalize(cases, deaths, &fips_table(), Some(day))?;

        assert_eq!(out.date, "8/31/22");
        assert_eq!(out.regions, vec![county(98, 1, "04013", "AZ")]);
        Ok(())
    }

    #[test]
    fn test_absent_override_date_reads_zero() -> Result<()> {
        let (cases, deaths) = tables(&[
            ("04013", "Maricopa", "Arizona", "98", "100", "1", "2"),
            ("90048", "Unassigned", "Texas", "0", "5", "0", "0"),
        ])?;
        let day = NaiveDate::from_ymd_opt(2022, 9, 2).unwrap();
        let out = normalize(cases, deaths, &fips_table(), Some(day))?;

        assert_eq!(out.date, "9/2/22");
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::MissingDate {
                date: "9/2/22".into()
            }]
        );
        assert!(out.regions.iter().all(|r| r.cases == 0 && r.deaths == 0));
        assert_eq!(out.regions.len(), 2);
        Ok(())
    }

    #[test]
    fn test_rows_joined_by_combined_key_not_position() -> Result<()> {
        let cases = parse_csv(&format!(
            "{}\n1,US,04013,Maricopa,Arizona,US,\"Maricopa, Arizona, US\",0,100\n\
             2,US,48201,Harris,Texas,US,\"Harris, Texas, US\",0,40\n",
            CASES_HEADER
        ))?;
        let deaths = parse_csv(&format!(
            "{}\n2,US,48201,Harris,Texas,US,\"Harris, Texas, US\",1,0,4\n\
             1,US,04013,Maricopa,Arizona,US,\"Maricopa, Arizona, US\",1,0,2\n",
            DEATHS_HEADER
        ))?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(
            out.regions,
            vec![county(100, 2, "04013", "AZ"), county(40, 4, "48201", "TX")]
        );
        Ok(())
    }

    #[test]
    fn test_mismatched_tables_degrade() -> Result<()> {
        let cases = parse_csv(&format!(
            "{}\n1,US,04013,Maricopa,Arizona,US,\"Maricopa, Arizona, US\",0,100\n",
            CASES_HEADER
        ))?;
        let deaths = parse_csv(&format!(
            "{}\n2,US,48201,Harris,Texas,US,\"Harris, Texas, US\",1,0,4\n",
            DEATHS_HEADER
        ))?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(out.regions, vec![county(100, 0, "04013", "AZ")]);
        assert_eq!(
            out.diagnostics,
            vec![
                Diagnostic::MissingDeaths {
                    combined_key: "Maricopa, Arizona, US".into()
                },
                Diagnostic::UnmatchedDeaths {
                    combined_key: "Harris, Texas, US".into()
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unknown_state_keeps_full_name() -> Result<()> {
        let (cases, deaths) = tables(&[("90099", "Unassigned", "Atlantis", "0", "2", "0", "1")])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(out.regions[0].state, "Atlantis");
        assert_eq!(out.regions[0].county, UNASSIGNED);
        assert!(matches!(
            out.diagnostics[0],
            Diagnostic::UnknownState { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_bad_and_empty_counts() -> Result<()> {
        let (cases, deaths) = tables(&[
            ("04013", "Maricopa", "Arizona", "0", "", "0", "2"),
            ("48201", "Harris", "Texas", "0", "oops", "0", "1"),
        ])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(
            out.regions,
            vec![county(0, 2, "04013", "AZ"), county(0, 1, "48201", "TX")]
        );
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::BadCount {
                combined_key: "Harris, Texas, US".into(),
                table: "cases",
                raw: "oops".into(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let rows = [
            ("90048", "Unassigned", "Texas", "0", "5", "0", "0"),
            ("04013", "Maricopa", "Arizona", "98", "100", "1", "2"),
            ("90001", "Unassigned", "Alabama", "0", "3", "0", "0"),
            ("90048", "Unassigned", "Texas", "0", "3", "0", "1"),
        ];
        let (c1, d1) = tables(&rows)?;
        let (c2, d2) = tables(&rows)?;
        let first = normalize(c1, d1, &fips_table(), None)?;
        let second = normalize(c2, d2, &fips_table(), None)?;

        assert_eq!(first.regions, second.regions);
        let states: Vec<_> = first.regions.iter().map(|r| r.state.as_str()).collect();
        assert_eq!(states, vec!["iso2:AZ", "TX", "AL"]);
        Ok(())
    }

    #[test]
    fn test_missing_required_column_is_fatal() -> Result<()> {
        let cases = parse_csv("FIPS,Admin2,Combined_Key,9/1/22\n")?;
        let deaths = parse_csv(&format!("{}\n", DEATHS_HEADER))?;
        assert!(normalize(cases, deaths, &fips_table(), None).is_err());
        Ok(())
    }

    #[test]
    fn test_deaths_table_without_selected_date() -> Result<()> {
        let cases = parse_csv(&format!(
            "{}\n1,US,04013,Maricopa,Arizona,US,\"Maricopa, Arizona, US\",98,100\n",
            CASES_HEADER
        ))?;
        let deaths = parse_csv(
            "FIPS,Admin2,Province_State,Combined_Key,8/31/22\n\
             04013,Maricopa,Arizona,\"Maricopa, Arizona, US\",1\n",
        )?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(out.regions, vec![county(100, 0, "04013", "AZ")]);
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::MissingDeathsDate {
                date: "9/1/22".into()
            }]
        );
        Ok(())
    }

    #[test]
    fn test_deaths_table_keyed_only_by_combined_key() -> Result<()> {
        let (cases, _) = tables(&[("04013", "Maricopa", "Arizona", "98", "100", "1", "2")])?;
        let deaths = parse_csv("Combined_Key,9/1/22\n\"Maricopa, Arizona, US\",2\n")?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        assert_eq!(out.regions, vec![county(100, 2, "04013", "AZ")]);
        assert!(out.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_huge_unassigned_counts_do_not_overflow() -> Result<()> {
        let (cases, deaths) = tables(&[
            ("90048", "Unassigned", "Texas", "0", "1e20", "0", "0"),
            ("90048", "Unassigned", "Texas", "0", "1e20", "0", "0"),
            ("90001", "Unassigned", "Alabama", "0", "18446744073709551615", "0", "0"),
            ("90001", "Unassigned", "Alabama", "0", "18446744073709551615", "0", "0"),
        ])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        let sums: Vec<_> = out
            .regions
            .iter()
            .map(|r| (r.state.as_str(), r.cases))
            .collect();
        assert_eq!(sums, vec![("TX", 0), ("AL", u64::MAX)]);
        let bad = out
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::BadCount { raw, .. } if raw == "1e20"))
            .count();
        assert_eq!(bad, 2);
        Ok(())
    }

    #[test]
    fn test_report_carries_source_metadata() -> Result<()> {
        let (cases, deaths) = tables(&[("04013", "Maricopa", "Arizona", "98", "100", "1", "2")])?;
        let out = normalize(cases, deaths, &fips_table(), None)?;

        let json = serde_json::to_value(out.report(&crate::fetch::urls::SOURCE))?;
        assert_eq!(json["source"]["name"], "JHU-USA");
        assert_eq!(json["source"]["priority"], -1);
        assert_eq!(json["source"]["curators"][0]["name"], "JHU CSSE");
        assert_eq!(json["date"], "9/1/22");
        assert_eq!(json["regions"][0]["county"], "fips:04013");
        assert_eq!(json["regions"][0]["cases"], 100);
        Ok(())
    }
}
