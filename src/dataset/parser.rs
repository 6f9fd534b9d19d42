use anyhow::{Context, Result, bail};
use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use tracing::debug;

use crate::domain::CountryBoundary;
use crate::error::Error;

/// Country boundaries keyed by name
#[derive(Debug, Clone, Default)]
pub struct CountryDataset {
    countries: Vec<CountryBoundary>,
}

impl CountryDataset {
    pub fn new(countries: Vec<CountryBoundary>) -> Self {
        Self { countries }
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Case-insensitive lookup by country name
    pub fn get(&self, name: &str) -> crate::error::Result<&CountryBoundary> {
        self.countries
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| Error::CountryNotFound(name.to_string()))
    }
}

/// Parse a GeoJSON FeatureCollection of country boundaries
///
/// # Algorithm
/// 1. Read the name from the `name_property` of each feature
/// 2. Convert Polygon / MultiPolygon geometry into a `MultiPolygon`
/// 3. Skip features with no name or with non-areal geometry
pub fn parse_countries(text: &str, name_property: &str) -> Result<CountryDataset> {
    let geojson: GeoJson = text.parse().context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => bail!("GeoJSON must be a FeatureCollection"),
    };

    let mut countries = Vec::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let name = match feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name_property))
        {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geometry) => {
                let value: Geometry<f64> = geometry
                    .value
                    .try_into()
                    .with_context(|| format!("Failed to convert geometry of {}", name))?;
                match value {
                    Geometry::MultiPolygon(mp) => mp,
                    Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        skipped += 1;
                        continue;
                    }
                }
            }
            None => {
                skipped += 1;
                continue;
            }
        };

        countries.push(CountryBoundary::new(name, geometry));
    }

    debug!(countries = countries.len(), skipped, "parsed country dataset");

    if countries.is_empty() {
        bail!(
            "No country boundaries with a '{}' property found in dataset",
            name_property
        );
    }

    Ok(CountryDataset::new(countries))
}
