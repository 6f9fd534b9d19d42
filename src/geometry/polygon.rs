use super::BoundingBox;
use crate::error::{Error, Result};

const CLOSURE_EPSILON: f64 = 1e-12;

/// A closed ring of planar points
///
/// The closing point is implied: if the input repeats its first point at
/// the end, the duplicate is dropped on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    points: Vec<(f64, f64)>,
    bounds: (f64, f64, f64, f64),
}

impl Ring {
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self> {
        if points.len() >= 2 && is_same_point(points[0], points[points.len() - 1]) {
            points.pop();
        }

        if points.len() < 3 {
            return Err(Error::InvalidRing {
                points: points.len(),
            });
        }

        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        for &(x, y) in &points {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        Ok(Self {
            points,
            bounds: (min_x, min_y, max_x, max_y),
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges as (start, end) pairs, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Extent as (min_x, min_y, max_x, max_y); may be flat for a collinear ring
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        self.bounds
    }
}

fn is_same_point(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < CLOSURE_EPSILON && (a.1 - b.1).abs() < CLOSURE_EPSILON
}

/// A planar region described as a collection of closed rings
///
/// Outer boundaries, holes and separate land masses are all just rings;
/// membership follows the even-odd rule across the whole collection
/// (see [`Polygon::locate`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    rings: Vec<Ring>,
}

impl Polygon {
    pub fn new(rings: Vec<Ring>) -> Result<Self> {
        if rings.is_empty() {
            return Err(Error::EmptyPolygon);
        }
        Ok(Self { rings })
    }

    /// Build a polygon from raw point lists, one per ring
    pub fn from_rings(rings: Vec<Vec<(f64, f64)>>) -> Result<Self> {
        let rings = rings
            .into_iter()
            .map(Ring::new)
            .collect::<Result<Vec<_>>>()?;
        Self::new(rings)
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn vertex_count(&self) -> usize {
        self.rings.iter().map(Ring::len).sum()
    }

    /// Smallest axis-aligned box containing every ring
    pub fn bounding_box(&self) -> Result<BoundingBox> {
        BoundingBox::from_points(self.rings.iter().flat_map(|r| r.points()))
    }

    /// Produce a new polygon with every vertex transformed by `f`
    pub fn map_points<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut((f64, f64)) -> (f64, f64),
    {
        let rings = self
            .rings
            .iter()
            .map(|ring| Ring::new(ring.points().iter().map(|&p| f(p)).collect()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(rings)
    }
}

impl TryFrom<&geo::Polygon<f64>> for Polygon {
    type Error = Error;

    fn try_from(polygon: &geo::Polygon<f64>) -> Result<Self> {
        Self::new(rings_of(polygon)?)
    }
}

impl TryFrom<&geo::MultiPolygon<f64>> for Polygon {
    type Error = Error;

    fn try_from(multi: &geo::MultiPolygon<f64>) -> Result<Self> {
        let mut rings = Vec::new();
        for polygon in &multi.0 {
            rings.extend(rings_of(polygon)?);
        }
        Self::new(rings)
    }
}

fn rings_of(polygon: &geo::Polygon<f64>) -> Result<Vec<Ring>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|line| Ring::new(line.coords().map(|c| (c.x, c.y)).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon};

    #[test]
    fn test_ring_strips_closing_point() {
        let ring = Ring::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.edges().count(), 3);
        assert_eq!(ring.edges().last().unwrap(), ((1.0, 1.0), (0.0, 0.0)));
    }

    #[test]
    fn test_ring_requires_three_points() {
        assert_eq!(
            Ring::new(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            Err(Error::InvalidRing { points: 2 })
        );
    }

    #[test]
    fn test_empty_polygon_rejected() {
        assert_eq!(Polygon::new(vec![]), Err(Error::EmptyPolygon));
    }

    #[test]
    fn test_bounding_box_spans_all_parts() {
        let polygon = Polygon::from_rings(vec![
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            vec![(5.0, 5.0), (6.0, 5.0), (6.0, 6.0), (5.0, 6.0)],
        ])
        .unwrap();

        let bbox = polygon.bounding_box().unwrap();
        assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (0.0, 0.0, 6.0, 6.0));
    }

    #[test]
    fn test_map_points_returns_new_polygon() {
        let polygon = Polygon::from_rings(vec![vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]]).unwrap();
        let scaled = polygon.map_points(|(x, y)| (x * 10.0, y * 10.0)).unwrap();

        assert_eq!(polygon.rings()[0].points()[1], (1.0, 0.0));
        assert_eq!(scaled.rings()[0].points()[1], (10.0, 0.0));
    }

    #[test]
    fn test_from_geo_multipolygon_keeps_holes() {
        let outer = LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let hole = LineString::from(vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]);
        let island = LineString::from(vec![(20.0, 20.0), (21.0, 20.0), (21.0, 21.0)]);
        let multi = MultiPolygon::new(vec![
            geo::Polygon::new(outer, vec![hole]),
            geo::Polygon::new(island, vec![]),
        ]);

        let polygon = Polygon::try_from(&multi).unwrap();
        assert_eq!(polygon.rings().len(), 3);
        // geo closes rings; the duplicate closing point is dropped again
        assert_eq!(polygon.rings()[0].len(), 4);
        assert_eq!(polygon.vertex_count(), 11);
    }
}
