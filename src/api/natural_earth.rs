use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::DatasetConfig;
use crate::dataset::{CountryDataset, parse_countries};

const USER_AGENT: &str = concat!("montearea/", env!("CARGO_PKG_VERSION"));
const CACHE_DIR: &str = "montearea";

/// Where the dataset came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Download,
    Cache(PathBuf),
    File(PathBuf),
}

/// Load the country dataset from a local file, the cache, or the network
///
/// # Arguments
/// * `config` - Dataset URL, retry and cache settings
/// * `local` - Read this GeoJSON file instead of downloading
/// * `refresh` - Ignore any cached copy
pub fn load_countries(
    config: &DatasetConfig,
    local: Option<&Path>,
    refresh: bool,
) -> Result<(CountryDataset, DatasetSource)> {
    if let Some(path) = local {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;
        let dataset = parse_countries(&text, &config.name_property)?;
        return Ok((dataset, DatasetSource::File(path.to_path_buf())));
    }

    let cache_path = config
        .cache
        .then(|| cache_file(&config.url))
        .flatten();

    if !refresh
        && let Some(path) = cache_path.as_deref()
        && path.exists()
    {
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|text| parse_countries(&text, &config.name_property))
        {
            Ok(dataset) => return Ok((dataset, DatasetSource::Cache(path.to_path_buf()))),
            Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable cache"),
        }
    }

    let text = fetch_dataset(config)?;
    let dataset = parse_countries(&text, &config.name_property)?;

    if let Some(path) = cache_path.as_deref() {
        if let Err(e) = write_cache(path, &text) {
            warn!(path = %path.display(), error = %e, "could not cache dataset");
        } else {
            debug!(path = %path.display(), "cached dataset");
        }
    }

    Ok((dataset, DatasetSource::Download))
}

/// Download the raw GeoJSON, retrying on rate limiting and server errors
#[instrument(skip(config), fields(url = %config.url))]
pub fn fetch_dataset(config: &DatasetConfig) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;

    let max_retries = config.max_retries.max(1);
    let mut last_error = None;

    for attempt in 0..max_retries {
        if attempt > 0 {
            let wait_secs = 2 * attempt as u64;
            warn!(
                wait_secs,
                attempt = attempt + 1,
                max_retries,
                "dataset download failed, retrying"
            );
            std::thread::sleep(Duration::from_secs(wait_secs));
        }

        let response = match client.get(&config.url).send() {
            Ok(response) => response,
            Err(e) => {
                last_error = Some(format!("request failed: {}", e));
                continue;
            }
        };

        match response.status().as_u16() {
            200 => {
                let text = response
                    .text()
                    .context("Failed to read dataset response body")?;
                info!(bytes = text.len(), "downloaded dataset");
                return Ok(text);
            }
            429 | 500..=599 => {
                last_error = Some(format!(
                    "server returned status {} (attempt {})",
                    response.status(),
                    attempt + 1
                ));
                continue;
            }
            status => {
                bail!("Dataset server returned error status: {}", status);
            }
        }
    }

    bail!(
        "Dataset download failed after {} attempts: {}",
        max_retries,
        last_error.unwrap_or_else(|| "Unknown error".to_string())
    )
}

/// Cache location for a dataset URL, named after its last path segment
pub fn cache_file(url: &str) -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join(CACHE_DIR);
    Some(dir.join(cache_file_name(url)))
}

fn cache_file_name(url: &str) -> String {
    let name = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("countries.geojson");

    let name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.ends_with(".geojson") || name.ends_with(".json") {
        name
    } else {
        format!("{}.geojson", name)
    }
}

fn write_cache(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("Failed to write cache: {}", path.display()))
}
