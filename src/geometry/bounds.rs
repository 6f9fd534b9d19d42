use crate::error::{Error, Result};

/// Axis-aligned bounding box in projected coordinates (meters)
///
/// Always has a strictly positive width and height; the constructors reject
/// anything else so the estimator never divides by a zero area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let width = max_x - min_x;
        let height = max_y - min_y;

        // NaN fails both comparisons, so non-finite extents are rejected too
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(Error::DegenerateBoundingBox { width, height });
        }

        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Create bounds from a set of points
    pub fn from_points<'a, I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a (f64, f64)>,
    {
        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        let mut seen = false;

        for &(x, y) in points {
            seen = true;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        if !seen {
            return Err(Error::DegenerateBoundingBox {
                width: 0.0,
                height: 0.0,
            });
        }

        Self::new(min_x, min_y, max_x, max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area in squared planar units
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Inclusive on all four edges
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
