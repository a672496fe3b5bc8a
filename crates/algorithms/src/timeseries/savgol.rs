//! Adaptive-window weighted quadratic fitting
//!
//! Each iteration of the schedule sweeps the series once, replacing every
//! interior sample with the value of a local quadratic fitted over a window
//! whose bounds adapt to the local spread and to the number of valid
//! samples around it. Updates happen in place, so later samples in a sweep
//! see the fitted values of earlier ones.

use super::{biased_std_dev, WindowSchedule};
use crate::statistics::upper_median;

/// Valid samples required on each side of a fit position
const MIN_SIDE_SAMPLES: usize = 3;

/// Window threshold as a multiple of the series deviation (1.2 · 2σ)
const WINDOW_THRESHOLD_FACTOR: f64 = 2.4;

const PIVOT_EPSILON: f64 = 1e-12;

/// Inputs for choosing the fit window around one sample
#[derive(Debug, Clone, Copy)]
pub struct WindowState<'a> {
    /// Position of the sample being fitted
    pub index: usize,
    /// Scheduled half-width for this iteration
    pub half_width: usize,
    /// Current fit state
    pub values: &'a [f64],
    pub weights: &'a [bool],
    /// Spread above which the window is narrowed
    pub threshold: f64,
}

/// Half-open window `[start, end)` over the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitWindow {
    pub start: usize,
    pub end: usize,
    /// `false` when either side lacks enough valid samples
    pub robust: bool,
}

impl FitWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Choose the fit window for one sample.
///
/// Starts symmetric, `[i - w, i + w + 1)`. When the value range inside
/// exceeds the threshold both sides move in by `w / 3`. The window then
/// grows until it holds [`MIN_SIDE_SAMPLES`] valid samples counting from
/// `i` on each side (the sample itself counts for both). When the left side
/// runs out of series the window starts at index 1; when the right side does
/// it ends at the series end. Either failure makes the window not robust.
pub fn compute_window(state: &WindowState<'_>) -> FitWindow {
    let len = state.values.len();
    let i = state.index;
    let w = state.half_width;

    let mut start = i.saturating_sub(w);
    let mut end = (i + w + 1).min(len);

    let (lo, hi) = state.values[start..end]
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi - lo > state.threshold {
        start += w / 3;
        end -= w / 3;
    }

    let left = (0..=i)
        .rev()
        .filter(|&k| state.weights[k])
        .nth(MIN_SIDE_SAMPLES - 1);
    let right = (i..len)
        .filter(|&k| state.weights[k])
        .nth(MIN_SIDE_SAMPLES - 1);

    start = match left {
        Some(k) => start.min(k),
        None => 1,
    };
    end = match right {
        Some(k) => end.max(k + 1),
        None => len,
    };

    FitWindow {
        start,
        end,
        robust: left.is_some() && right.is_some(),
    }
}

/// Iterative Savitzky–Golay style fitter over an extended series
#[derive(Debug, Clone)]
pub struct AdaptiveWindowFitter {
    schedule: WindowSchedule,
    upper_envelope: bool,
    fit_last_iteration: bool,
}

impl AdaptiveWindowFitter {
    pub fn new(schedule: WindowSchedule) -> Self {
        Self {
            schedule,
            upper_envelope: false,
            fit_last_iteration: false,
        }
    }

    /// Lift fitted values back up to valid observations they undershoot
    pub fn with_upper_envelope(mut self, enabled: bool) -> Self {
        self.upper_envelope = enabled;
        self
    }

    /// Leave the final iteration unforced by the upper envelope
    pub fn with_fit_last_iteration(mut self, enabled: bool) -> Self {
        self.fit_last_iteration = enabled;
        self
    }

    pub fn schedule(&self) -> &WindowSchedule {
        &self.schedule
    }

    /// Fit `series` (already extended by the largest half-window on each
    /// side) using `weights` as the validity mask.
    ///
    /// Returns the fitted series with the same length as the input. Only
    /// positions `[winmax, len - winmax)` are rewritten.
    pub fn fit(&self, series: &[f64], weights: &[bool]) -> Vec<f64> {
        debug_assert_eq!(series.len(), weights.len());
        let mut yfit = series.to_vec();
        let winmax = self.schedule.max();
        let len = series.len();
        if winmax == 0 || len < 2 * winmax + 1 {
            return yfit;
        }

        let iterations = self.schedule.len();
        let last = if self.fit_last_iteration { iterations - 1 } else { iterations };

        for (k, w) in self.schedule.iter().enumerate() {
            let threshold = WINDOW_THRESHOLD_FACTOR * biased_std_dev(yfit.iter().copied());

            for i in winmax..len - winmax {
                let window = compute_window(&WindowState {
                    index: i,
                    half_width: w,
                    values: &yfit,
                    weights,
                    threshold,
                });

                let fitted = if window.robust {
                    quadratic_fit(&yfit, weights, i, window)
                } else if !window.is_empty() {
                    median(&yfit[window.start..window.end])
                } else {
                    median(&series[i - w..=i + w])
                };

                // Singular or otherwise undefined fits keep the current value
                if let Some(v) = fitted.filter(|v| v.is_finite()) {
                    yfit[i] = v.floor();
                }

                if self.upper_envelope && k < last && weights[i] && yfit[i] < series[i] {
                    yfit[i] = series[i];
                }
            }
        }
        yfit
    }
}

fn median(values: &[f64]) -> Option<f64> {
    let mut buf = values.to_vec();
    upper_median(&mut buf)
}

/// Weighted least-squares quadratic through the valid samples of `window`,
/// evaluated at `center`.
///
/// Abscissae are offsets from `center` and ordinates are taken about the
/// mean of the valid samples, so constant and linear data come back exact.
fn quadratic_fit(values: &[f64], weights: &[bool], center: usize, window: FitWindow) -> Option<f64> {
    let samples = (window.start..window.end).filter(|&k| weights[k]);

    let (mut n, mut sum) = (0usize, 0.0);
    for k in samples.clone() {
        n += 1;
        sum += values[k];
    }
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;

    // Power sums of t and cross terms with the residual r
    let mut st = [0.0f64; 5];
    let mut sr = [0.0f64; 3];
    for k in samples {
        let t = k as f64 - center as f64;
        let r = values[k] - mean;
        let mut tp = 1.0;
        for p in 0..5 {
            st[p] += tp;
            if p < 3 {
                sr[p] += tp * r;
            }
            tp *= t;
        }
    }

    let mut mat = [
        st[0], st[1], st[2], //
        st[1], st[2], st[3], //
        st[2], st[3], st[4],
    ];
    let coeffs = solve3(&mut mat, &mut sr)?;
    Some(mean + coeffs[0])
}

/// Gaussian elimination with partial pivoting on a row-major 3×3 system.
/// `None` when the system is singular.
fn solve3(mat: &mut [f64; 9], rhs: &mut [f64; 3]) -> Option<[f64; 3]> {
    const N: usize = 3;
    for col in 0..N {
        let mut max_val = mat[col * N + col].abs();
        let mut max_row = col;
        for row in (col + 1)..N {
            let val = mat[row * N + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val < PIVOT_EPSILON {
            return None;
        }

        if max_row != col {
            for j in 0..N {
                mat.swap(col * N + j, max_row * N + j);
            }
            rhs.swap(col, max_row);
        }

        let pivot = mat[col * N + col];
        for row in (col + 1)..N {
            let factor = mat[row * N + col] / pivot;
            mat[row * N + col] = 0.0;
            for j in (col + 1)..N {
                mat[row * N + j] -= factor * mat[col * N + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f64; N];
    for col in (0..N).rev() {
        let mut sum = rhs[col];
        for j in (col + 1)..N {
            sum -= mat[col * N + j] * x[j];
        }
        x[col] = sum / mat[col * N + col];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn state<'a>(index: usize, half_width: usize, values: &'a [f64], weights: &'a [bool], threshold: f64) -> WindowState<'a> {
        WindowState {
            index,
            half_width,
            values,
            weights,
            threshold,
        }
    }

    #[test]
    fn test_window_symmetric() {
        let values = vec![100.0; 15];
        let weights = vec![true; 15];
        let window = compute_window(&state(7, 2, &values, &weights, 10.0));
        assert_eq!(window, FitWindow { start: 5, end: 10, robust: true });
    }

    #[test]
    fn test_window_shrinks_on_large_spread() {
        let mut values = vec![100.0; 15];
        values[8] = 200.0;
        let weights = vec![true; 15];
        let window = compute_window(&state(7, 3, &values, &weights, 50.0));
        // [4, 11) narrowed by one on each side
        assert_eq!(window, FitWindow { start: 5, end: 10, robust: true });

        let wide = compute_window(&state(7, 3, &values, &weights, 500.0));
        assert_eq!(wide, FitWindow { start: 4, end: 11, robust: true });
    }

    #[test]
    fn test_window_expands_over_invalid_samples() {
        let values = vec![100.0; 15];
        let mut weights = vec![true; 15];
        weights[5] = false;
        weights[6] = false;
        weights[9] = false;
        let window = compute_window(&state(7, 2, &values, &weights, 10.0));
        assert_eq!(window, FitWindow { start: 3, end: 11, robust: true });
    }

    #[test]
    fn test_window_left_failure() {
        let values = vec![100.0; 15];
        let mut weights = vec![true; 15];
        weights[0] = false;
        let window = compute_window(&state(2, 1, &values, &weights, 10.0));
        assert!(!window.robust);
        assert_eq!(window.start, 1);
        assert_eq!(window.end, 5);

        // the left bound moves to 1 even when the scheduled window started at 0
        let mut weights = vec![true; 15];
        weights[1] = false;
        weights[2] = false;
        let window = compute_window(&state(3, 3, &values, &weights, 10.0));
        assert_eq!(window, FitWindow { start: 1, end: 7, robust: false });
    }

    #[test]
    fn test_window_right_failure() {
        let values = vec![100.0; 15];
        let mut weights = vec![true; 15];
        weights[14] = false;
        let window = compute_window(&state(12, 1, &values, &weights, 10.0));
        assert!(!window.robust);
        assert_eq!(window.end, 15);
        assert_eq!(window.start, 10);
    }

    #[test]
    fn test_flat_series_passes_through() {
        let series = vec![100.0; 26];
        let weights = vec![true; 26];
        let fitter = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(3));
        assert_eq!(fitter.fit(&series, &weights), series);
    }

    #[test]
    fn test_parabola_passes_through() {
        let series: Vec<f64> = (0..30).map(|k| ((k as f64 - 15.0).powi(2)) + 20.0).collect();
        let weights = vec![true; 30];
        let fitter = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(3));
        let fitted = fitter.fit(&series, &weights);
        for (a, b) in fitted.iter().zip(&series) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_smooth_ramp_is_stable_under_more_iterations() {
        let series: Vec<f64> = (0..30).map(|k| 10.0 + 3.0 * k as f64).collect();
        let weights = vec![true; 30];
        let three = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(3)).fit(&series, &weights);
        let four = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(4)).fit(&series, &weights);
        for k in 4..26 {
            assert_abs_diff_eq!(three[k], four[k], epsilon = 1e-9);
            assert_abs_diff_eq!(three[k], series[k], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_sample_is_filled_from_neighbours() {
        let mut series = vec![100.0; 26];
        series[10] = 0.0;
        let mut weights = vec![true; 26];
        weights[10] = false;
        let fitter = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(3));
        let fitted = fitter.fit(&series, &weights);
        assert_eq!(fitted[10], 100.0);
        assert!(fitted[3..23].iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_upper_envelope_keeps_peak() {
        let mut series = vec![100.0; 26];
        series[10] = 110.0;
        let weights = vec![true; 26];
        let schedule = WindowSchedule::from_iterations(3);

        let plain = AdaptiveWindowFitter::new(schedule.clone()).fit(&series, &weights);
        assert!(plain[10] < 110.0);

        let envelope = AdaptiveWindowFitter::new(schedule)
            .with_upper_envelope(true)
            .fit(&series, &weights);
        assert_eq!(envelope[10], 110.0);
    }

    #[test]
    fn test_short_series_is_unchanged() {
        let series = vec![5.0, 6.0, 7.0];
        let fitter = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(3));
        assert_eq!(fitter.fit(&series, &[true; 3]), series);
    }

    #[test]
    fn test_singular_system() {
        let mut mat = [1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 1.0, 1.0];
        let mut rhs = [1.0, 2.0, 3.0];
        assert!(solve3(&mut mat, &mut rhs).is_none());

        let mut mat = [2.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 8.0];
        let mut rhs = [2.0, 8.0, 4.0];
        assert_eq!(solve3(&mut mat, &mut rhs), Some([1.0, 2.0, 0.5]));
    }

    #[test]
    fn test_fitted_values_are_floored() {
        let mut series = vec![100.0; 26];
        series[10] = 110.0;
        let weights = vec![true; 26];
        let fitted = AdaptiveWindowFitter::new(WindowSchedule::from_iterations(3)).fit(&series, &weights);
        assert!(fitted.iter().all(|v| v.fract() == 0.0));
        // a single sweep fits 105.97 at the peak
        let first = AdaptiveWindowFitter::new(WindowSchedule::new(vec![1]).unwrap()).fit(&series, &weights);
        assert_eq!(first[10], 105.0);
    }

    #[test]
    fn test_last_iteration_is_not_forced() {
        let mut series = vec![100.0; 26];
        series[10] = 110.0;
        let weights = vec![true; 26];
        let schedule = WindowSchedule::from_iterations(3);

        let plain = AdaptiveWindowFitter::new(schedule.clone()).fit(&series, &weights);
        let forced_until_last = AdaptiveWindowFitter::new(schedule)
            .with_upper_envelope(true)
            .with_fit_last_iteration(true)
            .fit(&series, &weights);

        // the final sweep smooths the peak again
        assert!(forced_until_last[10] < 110.0);
        // earlier sweeps kept it, so it stays above the unforced fit
        assert!(forced_until_last[10] > plain[10]);
        // unforced samples may end below their observation
        assert!(forced_until_last.iter().zip(&series).any(|(f, s)| f < s));
    }
}
