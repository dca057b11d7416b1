// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::instrument;

pub mod table;
pub mod urls;

pub use table::{load_table, RawTable};

/// Both time series of one pull, as fetched.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub cases: RawTable,
    pub deaths: RawTable,
}

/// Load the cases and deaths tables concurrently. Both must succeed.
#[instrument(level = "info", skip(client))]
pub async fn load_sources(client: &Client, cases: &str, deaths: &str) -> Result<SourceTables> {
    let (cases, deaths) = tokio::try_join!(
        async {
            load_table(client, cases)
                .await
                .context("loading cases table")
        },
        async {
            load_table(client, deaths)
                .await
                .context("loading deaths table")
        },
    )?;
    Ok(SourceTables { cases, deaths })
}
