use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::geometry::projection::{SOUTH_AMERICA_ALBERS, UTM_18_SOUTH};
use crate::simulation::EstimatorConfig;
use crate::simulation::estimator::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INSIDE_CAP, DEFAULT_MILESTONES, DEFAULT_OUTSIDE_CAP,
};

pub const NATURAL_EARTH_URL: &str = "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson";

/// Reference areas in km² (World Bank)
const SOUTH_AMERICA: [(&str, f64); 12] = [
    ("Argentina", 2_780_400.0),
    ("Bolivia", 1_098_581.0),
    ("Brazil", 8_515_770.0),
    ("Chile", 756_102.0),
    ("Colombia", 1_138_910.0),
    ("Ecuador", 283_561.0),
    ("Guyana", 214_969.0),
    ("Paraguay", 406_752.0),
    ("Peru", 1_285_216.0),
    ("Suriname", 165_940.0),
    ("Uruguay", 176_215.0),
    ("Venezuela", 916_445.0),
];

fn default_url() -> String {
    NATURAL_EARTH_URL.to_string()
}
fn default_name_property() -> String {
    "NAME".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}
fn default_cache() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Feature property holding the country name
    #[serde(default = "default_name_property")]
    pub name_property: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Keep a copy of the download in the user cache directory
    #[serde(default = "default_cache")]
    pub cache: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            name_property: default_name_property(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            cache: default_cache(),
        }
    }
}

fn default_primary_projection() -> String {
    SOUTH_AMERICA_ALBERS.to_string()
}
fn default_fallback_projection() -> String {
    UTM_18_SOUTH.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectionConfig {
    #[serde(default = "default_primary_projection")]
    pub primary: String,
    #[serde(default = "default_fallback_projection")]
    pub fallback: String,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_projection(),
            fallback: default_fallback_projection(),
        }
    }
}

fn default_inside_cap() -> usize {
    DEFAULT_INSIDE_CAP
}
fn default_outside_cap() -> usize {
    DEFAULT_OUTSIDE_CAP
}
fn default_milestones() -> u32 {
    DEFAULT_MILESTONES
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default = "default_inside_cap")]
    pub inside_cap: usize,
    #[serde(default = "default_outside_cap")]
    pub outside_cap: usize,
    #[serde(default = "default_milestones")]
    pub progress_milestones: u32,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            inside_cap: default_inside_cap(),
            outside_cap: default_outside_cap(),
            progress_milestones: default_milestones(),
            parallel: false,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            inside_cap: self.inside_cap,
            outside_cap: self.outside_cap,
            milestones: self.progress_milestones,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A selectable country and its published area
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CountryEntry {
    pub name: String,
    /// Official area in km²; absent or 0 means unknown
    #[serde(default)]
    pub reference_area_km2: Option<f64>,
}

fn default_countries() -> Vec<CountryEntry> {
    SOUTH_AMERICA
        .iter()
        .map(|&(name, area)| CountryEntry {
            name: name.to_string(),
            reference_area_km2: Some(area),
        })
        .collect()
}

/// Application settings, loaded once at startup and read-only afterwards
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_countries")]
    pub countries: Vec<CountryEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            projection: ProjectionConfig::default(),
            simulation: SimulationConfig::default(),
            countries: default_countries(),
        }
    }
}

impl AppConfig {
    /// Load an explicit config file; a missing or malformed file is an error
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {:?}", path);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.countries.is_empty() {
            bail!("Config must list at least one country");
        }
        Ok(config)
    }

    /// Search the usual locations; fall back to defaults if none parse
    pub fn load() -> Self {
        Self::load_first(&get_config_paths())
    }

    /// First candidate that exists and parses; unparsable files are skipped
    fn load_first(paths: &[PathBuf]) -> Self {
        for path in paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(path)
            {
                match Self::from_toml(&contents) {
                    Ok(config) => {
                        tracing::debug!(path = %path.display(), "loaded config");
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "ignoring unparsable config file"
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Published area of a configured country, if known and positive
    pub fn reference_area_km2(&self, country: &str) -> Option<f64> {
        self.countries
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(country))
            .and_then(|c| c.reference_area_km2)
            .filter(|a| *a > 0.0)
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("montearea.toml"));
    paths.push(PathBuf::from(".montearea.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("montearea").join("config.toml"));
        paths.push(config_dir.join("montearea.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".montearea.toml"));
    }

    paths
}
