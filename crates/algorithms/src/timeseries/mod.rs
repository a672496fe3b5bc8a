//! Per-pixel time-series filtering
//!
//! Iterative Savitzky–Golay style smoothing of multi-temporal stacks, after
//! the adaptive filter of TIMESAT:
//! - **spikes**: flag isolated outliers against a local median
//! - **savgol**: adaptive-window weighted quadratic fitting
//! - **timesat**: per-column pipeline over a whole stack
//!
//! Reference:
//! Jönsson, P. & Eklundh, L. (2004). TIMESAT: a program for analyzing
//! time-series of satellite sensor data. Computers & Geosciences 30.

pub mod savgol;
pub mod spikes;
pub mod timesat;

pub use savgol::{compute_window, AdaptiveWindowFitter, FitWindow, WindowState};
pub use spikes::SpikeDetector;
pub use timesat::{
    filter_profile, timesat_filter, timesat_filter_with_progress, ProfileOutcome, Timesat,
    TimesatFilter, TimesatParams,
};

use geoseries_core::{Error, Result};

/// Fewest scheduled fitting iterations
pub const MIN_ITERATIONS: usize = 2;
/// Most scheduled fitting iterations
pub const MAX_ITERATIONS: usize = 5;

/// Increasing half-window sizes, one per fitting iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSchedule {
    windows: Vec<usize>,
}

impl WindowSchedule {
    /// Half-windows `1, 2, …, n` with `n` clamped to
    /// [`MIN_ITERATIONS`]..=[`MAX_ITERATIONS`]
    pub fn from_iterations(iterations: usize) -> Self {
        let n = iterations.clamp(MIN_ITERATIONS, MAX_ITERATIONS);
        Self {
            windows: (1..=n).collect(),
        }
    }

    /// Explicit schedule; must be non-empty and strictly increasing from 1 up
    pub fn new(windows: Vec<usize>) -> Result<Self> {
        let increasing = windows.windows(2).all(|w| w[0] < w[1]);
        if windows.is_empty() || windows[0] == 0 || !increasing {
            return Err(Error::InvalidParameter {
                name: "windows",
                value: format!("{:?}", windows),
                reason: "half-windows must be positive and strictly increasing".into(),
            });
        }
        Ok(Self { windows })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Largest half-window
    pub fn max(&self) -> usize {
        self.windows.last().copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.windows.iter().copied()
    }
}

/// Pad a series with `pad` samples on each side, taken from the opposite
/// end (the tail goes in front, the head goes behind).
///
/// `pad` must not exceed the series length.
pub fn extend_series(series: &[f64], pad: usize) -> Vec<f64> {
    let n = series.len();
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend_from_slice(&series[n - pad..]);
    out.extend_from_slice(series);
    out.extend_from_slice(&series[..pad]);
    out
}

/// `true` where a sample is at or above the validity floor
pub fn validity_mask(series: &[f64], floor: f64) -> Vec<bool> {
    series.iter().map(|&v| v >= floor).collect()
}

/// Length of the longest run of `false` in a mask
pub fn longest_invalid_run(mask: &[bool]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for &valid in mask {
        if valid {
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

/// Population standard deviation, `NaN` for fewer than two values
pub(crate) fn biased_std_dev<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    crate::statistics::NumericStatistics::calculate(values).biased_std_dev()
}
