//! montearea - Estimate country areas by Monte Carlo sampling

pub mod api;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod report;
pub mod simulation;

pub use error::{Error, Result};
