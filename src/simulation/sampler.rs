use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::error::{Error, Result};
use crate::geometry::BoundingBox;

/// Draws independent uniform points inside a bounding box
///
/// Each axis has its own distribution over the closed interval
/// `[min, max]`; x and y are only paired by draw order.
#[derive(Debug, Clone)]
pub struct PointSampler {
    x: Uniform<f64>,
    y: Uniform<f64>,
}

impl PointSampler {
    pub fn new(bbox: &BoundingBox) -> Self {
        // BoundingBox guarantees finite, strictly ordered extents
        Self {
            x: Uniform::new_inclusive(bbox.min_x, bbox.max_x),
            y: Uniform::new_inclusive(bbox.min_y, bbox.max_y),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, f64) {
        let x = self.x.sample(rng);
        let y = self.y.sample(rng);
        (x, y)
    }

    /// Lazily yield `count` points; nothing is materialized up front
    pub fn points<R: Rng>(&self, rng: R, count: u64) -> Result<SampleIter<R>> {
        if count == 0 {
            return Err(Error::ZeroPoints);
        }
        Ok(SampleIter {
            sampler: self.clone(),
            rng,
            remaining: count,
        })
    }
}

pub struct SampleIter<R> {
    sampler: PointSampler,
    rng: R,
    remaining: u64,
}

impl<R: Rng> Iterator for SampleIter<R> {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.sampler.sample(&mut self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_rejects_zero_points() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let sampler = PointSampler::new(&bbox);
        assert!(matches!(
            sampler.points(StdRng::seed_from_u64(1), 0),
            Err(Error::ZeroPoints)
        ));
    }

    #[test]
    fn test_yields_exact_count_within_bounds() {
        let bbox = BoundingBox::new(-500.0, 2_000.0, 1_500.0, 2_100.0).unwrap();
        let sampler = PointSampler::new(&bbox);

        let points: Vec<_> = sampler
            .points(StdRng::seed_from_u64(7), 10_000)
            .unwrap()
            .collect();

        assert_eq!(points.len(), 10_000);
        assert!(points.iter().all(|&(x, y)| bbox.contains(x, y)));
    }

    #[test]
    fn test_covers_both_axes() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 10.0).unwrap();
        let sampler = PointSampler::new(&bbox);
        let points: Vec<_> = sampler
            .points(StdRng::seed_from_u64(3), 20_000)
            .unwrap()
            .collect();

        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / points.len() as f64;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / points.len() as f64;
        assert!((mean_x - 50.0).abs() < 1.5);
        assert!((mean_y - 5.0).abs() < 0.15);

        // Each quadrant of the box gets roughly a quarter of the points
        let lower_left = points.iter().filter(|p| p.0 < 50.0 && p.1 < 5.0).count();
        assert!((4_500..5_500).contains(&lower_left));
    }
}
