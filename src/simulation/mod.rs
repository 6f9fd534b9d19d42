pub mod accuracy;
pub mod buffer;
pub mod estimator;
pub mod sampler;

pub use accuracy::{AccuracyBand, ErrorReport, evaluate};
pub use buffer::CappedBuffer;
pub use estimator::{
    EstimatorConfig, MAX_POINTS, MIN_POINTS, MonteCarloEstimator, ProgressObserver,
    SimulationResult, validate_point_count,
};
pub use sampler::PointSampler;
