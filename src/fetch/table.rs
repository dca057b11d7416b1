// src/fetch/table.rs

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use reqwest::Client;
use std::{path::Path, time::Duration};
use tokio::{fs, time::sleep};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// A CSV file held in memory: the header row plus every data row as strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of `name` in the header row.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Tokenize CSV text. Rows shorter than the header are kept; the missing
/// trailing cells read as absent.
pub fn parse_csv(text: &str) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Retry schedule for remote reads: `retries` extra attempts, the n-th one
/// delayed by `initial_ms * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Backoff {
    retries: u32,
    initial_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: MAX_RETRIES,
            initial_ms: INITIAL_BACKOFF_MS,
        }
    }
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_ms.saturating_mul(factor))
    }
}

async fn get_csv_text(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "requesting table");
    let resp = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {}", url))?;
    let resp = resp
        .error_for_status()
        .with_context(|| format!("bad status from {}", url))?;
    resp.text()
        .await
        .with_context(|| format!("reading body of {}", url))
}

async fn get_csv_text_retrying(client: &Client, url: &Url, backoff: Backoff) -> Result<String> {
    let mut attempt = 0;
    loop {
        let err = match get_csv_text(client, url).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };
        if attempt >= backoff.retries {
            error!(%url, attempts = attempt + 1, error = %err, "giving up on table download");
            return Err(err);
        }
        attempt += 1;
        let delay = backoff.delay(attempt);
        warn!(%url, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying table download");
        sleep(delay).await;
    }
}

/// GET `url` as text, retrying with exponential backoff.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let url = Url::parse(url).with_context(|| format!("invalid URL {}", url))?;
    get_csv_text_retrying(client, &url, Backoff::default()).await
}

/// Read text from `source`, which is either an `http(s)` URL or a local path.
pub async fn load_text(client: &Client, source: &str) -> Result<String> {
    if is_remote(source) {
        return fetch_text(client, source).await;
    }
    let path = Path::new(source);
    fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {:?}", path))
}

/// Read and tokenize a CSV from a URL or a local path.
#[instrument(level = "info", skip(client))]
pub async fn load_table(client: &Client, source: &str) -> Result<RawTable> {
    let text = load_text(client, source).await?;
    let table = parse_csv(&text).with_context(|| format!("parsing CSV {}", source))?;
    info!(rows = table.rows.len(), columns = table.headers.len(), "loaded table");
    Ok(table)
}

pub(crate) fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
