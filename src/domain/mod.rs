pub mod country;

pub use country::{CountryBoundary, GeographicExtent};
