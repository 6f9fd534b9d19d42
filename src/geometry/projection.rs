//! Geographic (lon/lat, degrees) to planar meters
//!
//! Two projection families are supported, selected by identifier:
//! - `ESRI:102033` South America Albers Equal Area Conic
//! - `EPSG:326zz` / `EPSG:327zz` WGS84 UTM zone zz, north / south
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual" (USGS 1987).

use std::f64::consts::PI;

use tracing::{debug, warn};

use super::Polygon;
use crate::error::{Error, Result};

pub const SOUTH_AMERICA_ALBERS: &str = "ESRI:102033";
pub const UTM_18_SOUTH: &str = "EPSG:32718";

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in meters
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// GRS 1967 (truncated), used by the South American Datum 1969
    pub const GRS67_MODIFIED: Ellipsoid = Ellipsoid {
        a: 6_378_160.0,
        f: 1.0 / 298.25,
    };

    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlbersEqualArea {
    ellipsoid: Ellipsoid,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    n: f64,
    c: f64,
    rho0: f64,
}

impl AlbersEqualArea {
    /// All angles in degrees
    pub fn new(
        ellipsoid: Ellipsoid,
        lat0: f64,
        lon0: f64,
        lat1: f64,
        lat2: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let e2 = ellipsoid.e2();
        let (phi0, phi1, phi2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());

        let m1 = authalic_m(phi1, e2);
        let m2 = authalic_m(phi2, e2);
        let q0 = authalic_q(phi0, e2);
        let q1 = authalic_q(phi1, e2);
        let q2 = authalic_q(phi2, e2);

        let n = if (phi1 - phi2).abs() < 1e-12 {
            phi1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = ellipsoid.a * (c - n * q0).max(0.0).sqrt() / n;

        Self {
            ellipsoid,
            lon0: lon0.to_radians(),
            false_easting,
            false_northing,
            n,
            c,
            rho0,
        }
    }

    pub fn south_america() -> Self {
        Self::new(Ellipsoid::GRS67_MODIFIED, -32.0, -60.0, -5.0, -42.0, 0.0, 0.0)
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2();
        let q = authalic_q(lat.to_radians(), e2);
        let rho = self.ellipsoid.a * (self.c - self.n * q).sqrt() / self.n;
        let theta = self.n * wrap_longitude(lon.to_radians() - self.lon0);

        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + self.rho0 - rho * theta.cos();
        (x, y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    /// WGS84 UTM zone (1..=60)
    pub fn utm(zone: u8, south: bool) -> Self {
        let lon0 = -183.0 + 6.0 * zone as f64;
        Self {
            ellipsoid: Ellipsoid::WGS84,
            lon0: lon0.to_radians(),
            k0: 0.9996,
            false_easting: 500_000.0,
            false_northing: if south { 10_000_000.0 } else { 0.0 },
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = e2 / (1.0 - e2);
        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * cos_phi * cos_phi;
        let big_a = wrap_longitude(lon.to_radians() - self.lon0) * cos_phi;
        let m = meridian_arc(phi, a, e2);

        let x = self.k0
            * n
            * (big_a
                + (1.0 - t + c) * big_a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0);
        let y = self.k0
            * (m + n
                * phi.tan()
                * (big_a.powi(2) / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * big_a.powi(6)
                        / 720.0));

        (self.false_easting + x, self.false_northing + y)
    }
}

/// A supported planar projection
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    AlbersEqualArea(AlbersEqualArea),
    TransverseMercator(TransverseMercator),
}

impl Projection {
    /// Resolve a projection from its `AUTHORITY:CODE` identifier
    pub fn from_id(id: &str) -> Result<Self> {
        let normalized = id.trim().to_ascii_uppercase();

        if normalized == SOUTH_AMERICA_ALBERS {
            return Ok(Projection::AlbersEqualArea(AlbersEqualArea::south_america()));
        }

        if let Some(code) = normalized.strip_prefix("EPSG:")
            && code.len() == 5
            && let Ok(zone) = code[3..].parse::<u8>()
            && (1..=60).contains(&zone)
        {
            let south = match &code[..3] {
                "326" => Some(false),
                "327" => Some(true),
                _ => None,
            };
            if let Some(south) = south {
                return Ok(Projection::TransverseMercator(TransverseMercator::utm(
                    zone, south,
                )));
            }
        }

        Err(Error::UnknownProjection(id.to_string()))
    }

    /// Project a geographic coordinate given as (lon, lat) in degrees
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::AlbersEqualArea(p) => p.project(lon, lat),
            Projection::TransverseMercator(p) => p.project(lon, lat),
        }
    }

    pub fn is_equal_area(&self) -> bool {
        matches!(self, Projection::AlbersEqualArea(_))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Projection::AlbersEqualArea(_) => "Albers Equal Area Conic",
            Projection::TransverseMercator(_) => "Transverse Mercator (UTM)",
        }
    }
}

/// A polygon expressed in planar meters, with the projection that produced it
#[derive(Debug, Clone)]
pub struct ProjectedGeometry {
    pub polygon: Polygon,
    pub projection_id: String,
    pub description: &'static str,
    pub used_fallback: bool,
    /// False when areas are only approximately preserved (UTM)
    pub equal_area: bool,
}

/// Projects geographic polygons, falling back to a second projection when
/// the preferred one is unknown or produces non-finite coordinates
#[derive(Debug, Clone)]
pub struct ProjectionProvider {
    primary: String,
    fallback: String,
}

impl ProjectionProvider {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Project a polygon whose points are (lon, lat) in degrees
    pub fn project(&self, geographic: &Polygon) -> Result<ProjectedGeometry> {
        match try_project(&self.primary, geographic) {
            Ok((polygon, projection)) => {
                debug!(projection = %self.primary, "projected with primary projection");
                return Ok(ProjectedGeometry {
                    polygon,
                    projection_id: self.primary.clone(),
                    description: projection.describe(),
                    used_fallback: false,
                    equal_area: projection.is_equal_area(),
                });
            }
            Err(e) => {
                warn!(primary = %self.primary, fallback = %self.fallback, error = %e,
                    "primary projection unusable, trying fallback");
            }
        }

        let (polygon, projection) =
            try_project(&self.fallback, geographic).map_err(|_| Error::ProjectionUnavailable {
                primary: self.primary.clone(),
                fallback: self.fallback.clone(),
            })?;

        Ok(ProjectedGeometry {
            polygon,
            projection_id: self.fallback.clone(),
            description: projection.describe(),
            used_fallback: true,
            equal_area: projection.is_equal_area(),
        })
    }
}

fn try_project(id: &str, geographic: &Polygon) -> Result<(Polygon, Projection)> {
    let projection = Projection::from_id(id)?;
    let polygon = geographic.map_points(|(lon, lat)| projection.project(lon, lat))?;

    let all_finite = polygon
        .rings()
        .iter()
        .flat_map(|r| r.points())
        .all(|&(x, y)| x.is_finite() && y.is_finite());
    if !all_finite {
        return Err(Error::UnknownProjection(format!(
            "{} produced non-finite coordinates",
            id
        )));
    }

    Ok((polygon, projection))
}

fn wrap_longitude(mut lambda: f64) -> f64 {
    while lambda > PI {
        lambda -= 2.0 * PI;
    }
    while lambda < -PI {
        lambda += 2.0 * PI;
    }
    lambda
}

/// Snyder eq. 14-15
fn authalic_m(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e2 * s * s).sqrt()
}

/// Snyder eq. 3-12
fn authalic_q(phi: f64, e2: f64) -> f64 {
    let s = phi.sin();
    if e2 == 0.0 {
        return 2.0 * s;
    }
    let e = e2.sqrt();
    let log_term = ((1.0 - e * s) / (1.0 + e * s)).ln();
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - log_term / (2.0 * e))
}

/// Snyder eq. 3-21
fn meridian_arc(phi: f64, a: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}
