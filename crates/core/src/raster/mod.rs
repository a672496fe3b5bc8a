//! Raster data structures: grids, band stacks, georeferencing and domains

mod domain;
mod element;
mod georef;
mod grid;
mod stack;

pub use domain::{Domain, ItemDomain, NumericRange};
pub use element::RasterElement;
pub use georef::{GeoReference, GeoTransform};
pub use grid::{Raster, RasterStatistics};
pub use stack::RasterStack;
