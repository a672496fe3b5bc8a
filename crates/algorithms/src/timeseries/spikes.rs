//! Single-spike detection against a moving median

use super::biased_std_dev;
use crate::statistics::upper_median;
use std::ops::Range;

/// Flags samples that stand out from their neighbourhood.
///
/// With `σ` the population deviation of the defined samples and
/// `d = cutoff · σ`, sample `i` is a spike when
///
/// ```text
/// |yᵢ − median(window)| ≥ d  and  (yᵢ < mean(yᵢ₋₁, yᵢ₊₁) − d  or  yᵢ > max(yᵢ₋₁, yᵢ₊₁) + d)
/// ```
///
/// where the window spans `half_width` samples on either side and only
/// positive values enter the median.
#[derive(Debug, Clone, Copy)]
pub struct SpikeDetector {
    pub cutoff: f64,
    /// Samples above this value enter `σ`
    pub validity_floor: f64,
    /// Half-width of the median window, the largest scheduled half-window
    pub half_width: usize,
}

impl SpikeDetector {
    pub fn new(cutoff: f64, validity_floor: f64, half_width: usize) -> Self {
        Self {
            cutoff,
            validity_floor,
            half_width,
        }
    }

    /// Return `valid` with detected spikes set to `false`.
    ///
    /// `series` is the extended series; `data` is the index range holding
    /// the actual (unpadded) samples and is used for `σ` only. Samples in
    /// the first and last `half_width` positions are never tested.
    pub fn detect(&self, series: &[f64], valid: &[bool], data: Range<usize>) -> Vec<bool> {
        let mut valid = valid.to_vec();
        let w = self.half_width;
        let len = series.len();
        if w == 0 || len < 2 * w + 1 {
            return valid;
        }

        let floor = self.validity_floor;
        let ystd = biased_std_dev(series[data].iter().copied().filter(|&v| v > floor));
        // NaN when fewer than two samples are defined; every comparison below
        // is then false and nothing is flagged
        let distance = self.cutoff * ystd;

        let mut window = Vec::with_capacity(2 * w + 1);
        for i in w..len - w {
            window.clear();
            window.extend(series[i - w..=i + w].iter().copied().filter(|&v| v > 0.0));
            let Some(median) = upper_median(&mut window) else {
                valid[i] = false;
                continue;
            };

            let y = series[i];
            let (prev, next) = (series[i - 1], series[i + 1]);
            let avg = (prev + next) / 2.0;
            let max = prev.max(next);
            if (y - median).abs() >= distance && (y < avg - distance || y > max + distance) {
                valid[i] = false;
            }
        }
        valid
    }
}
