use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use super::buffer::CappedBuffer;
use super::sampler::PointSampler;
use crate::error::{Error, Result};
use crate::geometry::{BoundingBox, Polygon};

pub const MIN_POINTS: u64 = 100;
pub const MAX_POINTS: u64 = 10_000_000;

pub const DEFAULT_INSIDE_CAP: usize = 5000;
pub const DEFAULT_OUTSIDE_CAP: usize = 2500;
pub const DEFAULT_MILESTONES: u32 = 10;
pub const DEFAULT_CHUNK_SIZE: u64 = 65_536;

pub const SQ_METERS_PER_SQ_KM: f64 = 1_000_000.0;

/// z value for a two-sided 95% confidence interval
const Z_95: f64 = 1.96;

/// Check a requested point count against the interactive range
pub fn validate_point_count(count: u64) -> Result<u64> {
    if (MIN_POINTS..=MAX_POINTS).contains(&count) {
        Ok(count)
    } else {
        Err(Error::InvalidPointCount {
            count,
            min: MIN_POINTS,
            max: MAX_POINTS,
        })
    }
}

/// Receives progress at fixed milestones of a run
///
/// Purely informational; observers cannot influence counts or timing.
pub trait ProgressObserver: Sync {
    fn on_progress(&self, completed: u64, total: u64);
}

impl<F> ProgressObserver for F
where
    F: Fn(u64, u64) + Sync,
{
    fn on_progress(&self, completed: u64, total: u64) {
        self(completed, total)
    }
}

#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Maximum number of inside points kept for display
    pub inside_cap: usize,
    /// Maximum number of outside points kept for display
    pub outside_cap: usize,
    /// Number of progress notifications per run; 0 disables them
    pub milestones: u32,
    /// Points per work item in parallel runs
    pub chunk_size: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            inside_cap: DEFAULT_INSIDE_CAP,
            outside_cap: DEFAULT_OUTSIDE_CAP,
            milestones: DEFAULT_MILESTONES,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Outcome of one Monte Carlo run
///
/// Built once by the estimator and read-only afterwards.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    total_points: u64,
    inside_count: u64,
    outside_count: u64,
    bbox: BoundingBox,
    estimated_area: f64,
    elapsed: Duration,
    inside_samples: Vec<(f64, f64)>,
    outside_samples: Vec<(f64, f64)>,
}

impl SimulationResult {
    pub fn total_points(&self) -> u64 {
        self.total_points
    }

    pub fn inside_count(&self) -> u64 {
        self.inside_count
    }

    pub fn outside_count(&self) -> u64 {
        self.outside_count
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Bounding box area in squared planar units
    pub fn bbox_area(&self) -> f64 {
        self.bbox.area()
    }

    pub fn bbox_area_km2(&self) -> f64 {
        self.bbox_area() / SQ_METERS_PER_SQ_KM
    }

    /// Fraction of points classified inside
    pub fn inside_ratio(&self) -> f64 {
        self.inside_count as f64 / self.total_points as f64
    }

    /// Estimated area in squared planar units
    pub fn estimated_area(&self) -> f64 {
        self.estimated_area
    }

    /// Estimated area assuming the planar unit is meters
    pub fn estimated_area_km2(&self) -> f64 {
        self.estimated_area / SQ_METERS_PER_SQ_KM
    }

    /// Standard error of the estimate: `bbox_area * sqrt(p (1 - p) / N)`
    pub fn standard_error(&self) -> f64 {
        let p = self.inside_ratio();
        self.bbox_area() * (p * (1.0 - p) / self.total_points as f64).sqrt()
    }

    pub fn standard_error_km2(&self) -> f64 {
        self.standard_error() / SQ_METERS_PER_SQ_KM
    }

    /// 95% confidence interval of the estimate, in km²
    pub fn confidence_interval_95_km2(&self) -> (f64, f64) {
        let half = Z_95 * self.standard_error_km2();
        let estimate = self.estimated_area_km2();
        ((estimate - half).max(0.0), estimate + half)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn inside_samples(&self) -> &[(f64, f64)] {
        &self.inside_samples
    }

    pub fn outside_samples(&self) -> &[(f64, f64)] {
        &self.outside_samples
    }
}

/// Running counts and retained samples for a run or a slice of one
#[derive(Debug)]
struct Tally {
    inside: u64,
    outside: u64,
    inside_samples: CappedBuffer<(f64, f64)>,
    outside_samples: CappedBuffer<(f64, f64)>,
}

impl Tally {
    fn new(config: &EstimatorConfig) -> Self {
        Self {
            inside: 0,
            outside: 0,
            inside_samples: CappedBuffer::new(config.inside_cap),
            outside_samples: CappedBuffer::new(config.outside_cap),
        }
    }

    fn record(&mut self, point: (f64, f64), inside: bool) {
        if inside {
            self.inside += 1;
            self.inside_samples.push(point);
        } else {
            self.outside += 1;
            self.outside_samples.push(point);
        }
    }

    /// Combine with a tally that covers later trials
    fn merge(mut self, later: Tally) -> Tally {
        self.inside += later.inside;
        self.outside += later.outside;
        self.inside_samples.absorb(later.inside_samples);
        self.outside_samples.absorb(later.outside_samples);
        self
    }
}

/// Estimates polygon area by uniform sampling over its bounding box
#[derive(Debug, Clone, Default)]
pub struct MonteCarloEstimator {
    config: EstimatorConfig,
}

impl MonteCarloEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Run `count` trials sequentially on the caller's thread
    #[instrument(skip_all, fields(points = count))]
    pub fn run<R: Rng + ?Sized>(
        &self,
        polygon: &Polygon,
        bbox: &BoundingBox,
        count: u64,
        rng: &mut R,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<SimulationResult> {
        let sampler = PointSampler::new(bbox);
        let points = sampler.points(&mut *rng, count)?;
        let step = milestone_step(count, self.config.milestones);

        let start = Instant::now();
        let mut tally = Tally::new(&self.config);
        for (done, point) in (1..=count).zip(points) {
            tally.record(point, polygon.contains_point(point));

            if let Some(observer) = observer
                && (done % step == 0 || done == count)
            {
                observer.on_progress(done, count);
            }
        }
        let elapsed = start.elapsed();

        Ok(self.finish(bbox, count, tally, elapsed))
    }

    /// Run `count` trials on the rayon pool
    ///
    /// Trials are split into chunks, each with its own generator seeded from
    /// `seed` (or from entropy). Chunk tallies are reduced in chunk order so
    /// retained samples are still first-come with respect to chunk order.
    #[instrument(skip_all, fields(points = count))]
    pub fn run_parallel(
        &self,
        polygon: &Polygon,
        bbox: &BoundingBox,
        count: u64,
        seed: Option<u64>,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<SimulationResult> {
        if count == 0 {
            return Err(Error::ZeroPoints);
        }
        let sampler = PointSampler::new(bbox);
        let chunk_size = self.config.chunk_size.max(1);
        let step = milestone_step(count, self.config.milestones);

        let mut master = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let chunks: Vec<(u64, u64)> = (0..count.div_ceil(chunk_size))
            .map(|i| {
                let len = chunk_size.min(count - i * chunk_size);
                (len, master.r#gen::<u64>())
            })
            .collect();
        debug!(chunks = chunks.len(), chunk_size, "partitioned trials");

        let completed = AtomicU64::new(0);
        let start = Instant::now();
        let tally = chunks
            .par_iter()
            .map(|&(len, chunk_seed)| {
                let rng = StdRng::seed_from_u64(chunk_seed);
                let mut tally = Tally::new(&self.config);
                // Chunks are never empty
                for point in sampler.points(rng, len).into_iter().flatten() {
                    tally.record(point, polygon.contains_point(point));
                }

                let before = completed.fetch_add(len, Ordering::Relaxed);
                let after = before + len;
                if let Some(observer) = observer
                    && (before / step != after / step || after == count)
                {
                    observer.on_progress(after, count);
                }
                tally
            })
            .reduce(|| Tally::new(&self.config), Tally::merge);
        let elapsed = start.elapsed();

        Ok(self.finish(bbox, count, tally, elapsed))
    }

    fn finish(
        &self,
        bbox: &BoundingBox,
        count: u64,
        tally: Tally,
        elapsed: Duration,
    ) -> SimulationResult {
        debug_assert_eq!(tally.inside + tally.outside, count);

        let estimated_area = bbox.area() * (tally.inside as f64 / count as f64);
        info!(
            inside = tally.inside,
            outside = tally.outside,
            estimated_area,
            elapsed_ms = elapsed.as_millis() as u64,
            "simulation finished"
        );

        SimulationResult {
            total_points: count,
            inside_count: tally.inside,
            outside_count: tally.outside,
            bbox: *bbox,
            estimated_area,
            elapsed,
            inside_samples: tally.inside_samples.into_vec(),
            outside_samples: tally.outside_samples.into_vec(),
        }
    }
}

fn milestone_step(count: u64, milestones: u32) -> u64 {
    if milestones == 0 {
        return u64::MAX;
    }
    (count / milestones as u64).max(1)
}
