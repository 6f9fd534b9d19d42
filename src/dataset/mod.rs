pub mod parser;

pub use parser::{CountryDataset, parse_countries};
