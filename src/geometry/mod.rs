pub mod bounds;
pub mod containment;
pub mod polygon;
pub mod projection;
pub mod scaling;

pub use bounds::BoundingBox;
pub use containment::PointLocation;
pub use polygon::{Polygon, Ring};
pub use projection::{ProjectedGeometry, Projection, ProjectionProvider};
pub use scaling::Scaler;
