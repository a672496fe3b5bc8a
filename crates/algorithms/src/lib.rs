//! # geoseries algorithms
//!
//! Per-pixel time-series processing and vector rasterization.
//!
//! ## Available Algorithm Categories
//!
//! - **statistics**: summary statistics, medians, Mann–Kendall trend significance
//! - **timeseries**: spike detection, adaptive Savitzky–Golay fitting, TIMESAT filtering
//! - **vector**: Bresenham tracing, polygon to raster

pub(crate) mod maybe_rayon;

pub mod statistics;
pub mod timeseries;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::statistics::{
        mann_kendall, mann_kendall_significance, mann_kendall_statistics, MannKendallParams,
        MannKendallTest, NumericStatistics, SignificanceRule,
    };
    pub use crate::timeseries::{
        filter_profile, timesat_filter, AdaptiveWindowFitter, SpikeDetector, Timesat,
        TimesatParams, WindowSchedule,
    };
    pub use crate::vector::{
        polygon_to_raster, PolygonRasterParams, PolygonRasterization, PolygonToRaster,
    };
    pub use geoseries_core::prelude::*;
}
