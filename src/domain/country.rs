use geo::{BoundingRect, MultiPolygon};

use crate::error::Result;
use crate::geometry::Polygon;

/// Extent of a boundary in geographic degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeographicExtent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// A named country boundary in WGS84, x = longitude and y = latitude
#[derive(Debug, Clone)]
pub struct CountryBoundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl CountryBoundary {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    pub fn part_count(&self) -> usize {
        self.geometry.0.len()
    }

    pub fn extent(&self) -> Option<GeographicExtent> {
        self.geometry.bounding_rect().map(|rect| GeographicExtent {
            min_lon: rect.min().x,
            min_lat: rect.min().y,
            max_lon: rect.max().x,
            max_lat: rect.max().y,
        })
    }

    /// The boundary as ring geometry, still in degrees
    pub fn to_polygon(&self) -> Result<Polygon> {
        Polygon::try_from(&self.geometry)
    }
}
