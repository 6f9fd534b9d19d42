pub mod natural_earth;

pub use natural_earth::{DatasetSource, load_countries};
