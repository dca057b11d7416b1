use anyhow::{Context, Result};
use jhuscraper::{
    config::ScrapeConfig,
    fetch::{self, urls::SOURCE},
    geography,
    process,
};
use reqwest::Client;
use std::{
    collections::BTreeMap,
    io::{self, Write},
    time::Instant,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) config + logging ────────────────────────────────────────
    let config = ScrapeConfig::from_env()?;
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();
    info!(source = SOURCE.name, date = ?config.scrape_date, "startup");

    // ─── 2) lookup table + both time series ─────────────────────────
    let start = Instant::now();
    let client = Client::new();
    let (fips, tables) = futures::try_join!(
        geography::load_fips_table(&client, &config.fips_table),
        fetch::load_sources(&client, &config.cases_url, &config.deaths_url),
    )?;
    info!(elapsed = ?start.elapsed(), "inputs loaded");

    // ─── 3) normalize ───────────────────────────────────────────────
    let out = process::normalize(tables.cases, tables.deaths, &fips, config.scrape_date)?;

    let mut reasons: BTreeMap<&str, usize> = BTreeMap::new();
    for d in &out.diagnostics {
        *reasons.entry(d.kind()).or_default() += 1;
    }
    info!(
        date = %out.date,
        regions = out.regions.len(),
        skipped = out.skipped(),
        ?reasons,
        "done"
    );

    // ─── 4) hand regions + source metadata downstream ───────────────
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    serde_json::to_writer_pretty(&mut lock, &out.report(&SOURCE)).context("writing regions")?;
    writeln!(lock)?;
    Ok(())
}

