//! Statistical analysis of pixel time series
//!
//! - **numeric**: one-pass summary statistics and medians
//! - **mann_kendall**: Mann–Kendall trend significance per pixel

pub mod mann_kendall;
pub mod numeric;

pub use mann_kendall::{
    mann_kendall, mann_kendall_significance, mann_kendall_significance_with_progress,
    mann_kendall_statistics, MannKendallInput, MannKendallParams, MannKendallRasters,
    MannKendallResult, MannKendallTest, SignificanceRule,
};
pub use numeric::{upper_median, NumericStatistics};
