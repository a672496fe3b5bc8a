//! # geoseries core
//!
//! Data model shared by the geoseries processing crates:
//! - `Raster<T>` and `RasterStack<T>`: single- and multi-band grids
//! - `GeoTransform` / `GeoReference`: pixel ↔ coordinate mapping
//! - `Domain`: numeric ranges and item classes attached to outputs
//! - `FeatureCollection` and `AttributeTable`: polygons with attributes
//! - `Progress`: injected progress / cancellation sink
//! - `Algorithm`: uniform entry point for operations

pub mod crs;
pub mod error;
pub mod progress;
pub mod raster;
pub mod vector;

pub use crs::Crs;
pub use error::{Error, Result};
pub use progress::{NoProgress, Progress, ProgressCounter};
pub use raster::{
    Domain, GeoReference, GeoTransform, ItemDomain, NumericRange, Raster, RasterElement,
    RasterStack,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::progress::{NoProgress, Progress};
    pub use crate::raster::{
        Domain, GeoReference, GeoTransform, ItemDomain, NumericRange, Raster, RasterElement,
        RasterStack,
    };
    pub use crate::vector::{AttributeTable, AttributeValue, Feature, FeatureCollection};
    pub use crate::Algorithm;
}

/// Core trait for all operations.
///
/// Operations are pure functions of their input and parameters; validation
/// happens before any output cell is written.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
