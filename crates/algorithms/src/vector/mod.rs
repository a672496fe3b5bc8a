//! Vector to raster operations
//!
//! - **bresenham**: line tracing of coordinate paths onto grid cells
//! - **polygon_to_raster**: polygon features to a key raster plus attribute table

pub mod bresenham;
pub mod polygon_to_raster;

pub use bresenham::{line_cells, Bresenham};
pub use polygon_to_raster::{
    polygon_to_raster, polygon_to_raster_with_progress, PolygonRasterInput, PolygonRasterParams,
    PolygonRasterization, PolygonToRaster, BOUNDARY_MARK, DEFAULT_KEY_COLUMN,
};
