// src/fetch/urls.rs
use serde::Serialize;

/// JHU CSSE county-level confirmed cases time series.
pub static CASES_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_US.csv";

/// JHU CSSE county-level deaths time series.
pub static DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_US.csv";

#[derive(Debug, Clone, Serialize)]
pub struct Curator {
    pub name: &'static str,
    pub url: &'static str,
}

/// Descriptive metadata printed with the regions (see `process::Report`) for the
/// downstream merge stage.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: &'static str,
    pub url: &'static str,
    pub country: &'static str,
    /// Finest level this source reports at.
    pub aggregate: &'static str,
    pub timeseries: bool,
    /// Negative: other sources for the same location win during merge.
    pub priority: i32,
    pub curators: &'static [Curator],
}

pub static SOURCE: SourceInfo = SourceInfo {
    name: "JHU-USA",
    url: "https://github.com/CSSEGISandData/COVID-19",
    country: "USA",
    aggregate: "county",
    timeseries: true,
    priority: -1,
    curators: &[Curator {
        name: "JHU CSSE",
        url: "https://systems.jhu.edu/research/public-health/ncov/",
    }],
};
