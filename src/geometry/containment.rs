//! Point-in-polygon classification
//!
//! Crossing-number test with a ray cast toward +x, evaluated per ring and
//! combined with the even-odd rule over every ring of the polygon. Holes
//! and disjoint parts need no special casing: a hole adds one more
//! crossing, a separate island contributes its own independent parity.
//!
//! Points on an edge are [`PointLocation::Boundary`] and count as inside.

use super::{Polygon, Ring};

/// Relative tolerance for deciding that a point lies on an edge
const COLLINEAR_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Outside,
    Boundary,
}

impl PointLocation {
    /// Inclusive membership: boundary points count as inside
    pub fn is_covered(self) -> bool {
        !matches!(self, PointLocation::Outside)
    }
}

enum RingHit {
    Boundary,
    Crossings(bool),
}

impl Polygon {
    /// Locate a point relative to the polygon's filled region
    pub fn locate(&self, point: (f64, f64)) -> PointLocation {
        let mut inside = false;

        for ring in self.rings() {
            match ring_hit(ring, point) {
                RingHit::Boundary => return PointLocation::Boundary,
                RingHit::Crossings(odd) => inside ^= odd,
            }
        }

        if inside {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// True iff the point is inside the polygon or on its boundary
    pub fn contains_point(&self, point: (f64, f64)) -> bool {
        self.locate(point).is_covered()
    }
}

fn ring_hit(ring: &Ring, (px, py): (f64, f64)) -> RingHit {
    let (_, min_y, max_x, max_y) = ring.extent();

    // The ray runs toward +x, so it can only meet this ring if the point is
    // within its vertical span and not right of it
    if py < min_y || py > max_y || px > max_x {
        return RingHit::Crossings(false);
    }

    let mut odd = false;
    for ((ax, ay), (bx, by)) in ring.edges() {
        if on_segment((ax, ay), (bx, by), (px, py)) {
            return RingHit::Boundary;
        }

        // Half-open rule on y: each vertex is counted for exactly one of the
        // two edges that meet there
        if (ay > py) != (by > py) {
            let x_cross = ax + (py - ay) * (bx - ax) / (by - ay);
            if px < x_cross {
                odd = !odd;
            }
        }
    }

    RingHit::Crossings(odd)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let (ax, ay) = a;
    let (bx, by) = b;
    let (px, py) = p;

    if px < ax.min(bx) || px > ax.max(bx) || py < ay.min(by) || py > ay.max(by) {
        return false;
    }

    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    let scale = ((bx - ax).abs() + (by - ay).abs()) * ((px - ax).abs() + (py - ay).abs());

    cross.abs() <= COLLINEAR_EPSILON * scale
}
