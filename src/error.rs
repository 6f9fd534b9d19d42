/// Errors raised by the geometry and simulation core.
///
/// Network and file I/O at the application boundary use `anyhow` instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("point count {count} is outside the allowed range {min}..={max}")]
    InvalidPointCount { count: u64, min: u64, max: u64 },

    #[error("cannot run a simulation with zero points")]
    ZeroPoints,

    #[error("bounding box has no area (width {width}, height {height})")]
    DegenerateBoundingBox { width: f64, height: f64 },

    #[error("ring needs at least 3 distinct points, got {points}")]
    InvalidRing { points: usize },

    #[error("polygon has no rings")]
    EmptyPolygon,

    #[error("unknown projection identifier: {0}")]
    UnknownProjection(String),

    #[error("no usable projection (tried {primary} and {fallback})")]
    ProjectionUnavailable { primary: String, fallback: String },

    #[error("country not found in dataset: {0}")]
    CountryNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
