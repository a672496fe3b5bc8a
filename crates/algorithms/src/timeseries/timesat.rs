//! Stack-wide TIMESAT filtering
//!
//! Every pixel's z-profile is copied out, padded, screened for gaps and
//! spikes, fitted, clamped to the output range and written back. Pixels are
//! independent of each other.

use super::{
    extend_series, longest_invalid_run, validity_mask, AdaptiveWindowFitter, SpikeDetector,
    WindowSchedule,
};
use crate::maybe_rayon::*;
use geoseries_core::progress::{NoProgress, Progress};
use geoseries_core::raster::{Domain, NumericRange, RasterElement, RasterStack};
use geoseries_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters for the TIMESAT filter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimesatParams {
    /// Number of fitting iterations, clamped to 2..=5; iteration `k` uses
    /// half-window `k`
    pub iterations: usize,
    /// Force fitted values up to valid observations they undershoot
    pub upper_envelope: bool,
    /// Do not force the upper envelope on the last iteration
    pub fit_last_iteration: bool,
    /// Pad each profile cyclically so edge samples are fitted too
    pub extend_window: bool,
    /// Spike distance as a multiple of the profile deviation
    pub spike_cutoff: f64,
    /// Samples below this value are missing
    pub validity_floor: f64,
    /// Profiles with a run of this many missing samples are zero-filled
    pub max_gap: usize,
    /// Profiles with at least this share of missing samples are zero-filled
    pub max_invalid_fraction: f64,
    /// Upper bound of the output range (lower bound is 0)
    pub output_max: f64,
}

impl Default for TimesatParams {
    fn default() -> Self {
        Self {
            iterations: 3,
            upper_envelope: false,
            fit_last_iteration: false,
            extend_window: true,
            spike_cutoff: 2.0,
            validity_floor: 2.0,
            max_gap: 12,
            max_invalid_fraction: 0.75,
            output_max: 255.0,
        }
    }
}

impl TimesatParams {
    pub fn schedule(&self) -> WindowSchedule {
        WindowSchedule::from_iterations(self.iterations)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, value: String, reason: &str| Error::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        };
        if !(self.spike_cutoff.is_finite() && self.spike_cutoff > 0.0) {
            return Err(invalid("spike_cutoff", self.spike_cutoff.to_string(), "must be positive"));
        }
        if !self.validity_floor.is_finite() {
            return Err(invalid("validity_floor", self.validity_floor.to_string(), "must be finite"));
        }
        if self.max_gap == 0 {
            return Err(invalid("max_gap", "0".into(), "must be at least 1"));
        }
        if !(self.max_invalid_fraction > 0.0 && self.max_invalid_fraction <= 1.0) {
            return Err(invalid(
                "max_invalid_fraction",
                self.max_invalid_fraction.to_string(),
                "must lie in (0, 1]",
            ));
        }
        if !(self.output_max.is_finite() && self.output_max > 0.0) {
            return Err(invalid("output_max", self.output_max.to_string(), "must be positive"));
        }
        Ok(())
    }
}

/// Result of filtering one z-profile
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    /// Fitted values clamped to `0..=output_max`
    Fitted(Vec<f64>),
    /// Too many missing samples; the output column is all zeros
    TooSparse,
}

impl ProfileOutcome {
    /// Values to write for a profile of `bands` samples
    pub fn into_values(self, bands: usize) -> Vec<f64> {
        match self {
            ProfileOutcome::Fitted(values) => values,
            ProfileOutcome::TooSparse => vec![0.0; bands],
        }
    }
}

/// Filter configured for a fixed band count
#[derive(Debug, Clone)]
pub struct TimesatFilter {
    bands: usize,
    pad: usize,
    params: TimesatParams,
    detector: SpikeDetector,
    fitter: AdaptiveWindowFitter,
}

impl TimesatFilter {
    /// Validate parameters against the band count.
    ///
    /// Padded profiles need at least as many bands as the largest scheduled
    /// half-width; unpadded ones must span one full window of it.
    pub fn new(params: &TimesatParams, bands: usize) -> Result<Self> {
        params.validate()?;
        let schedule = params.schedule();
        let winmax = schedule.max();
        let required = if params.extend_window { winmax } else { 2 * winmax + 1 };
        if bands < required {
            return Err(Error::InsufficientBands {
                required,
                actual: bands,
            });
        }

        let detector = SpikeDetector::new(params.spike_cutoff, params.validity_floor, winmax);
        let fitter = AdaptiveWindowFitter::new(schedule)
            .with_upper_envelope(params.upper_envelope)
            .with_fit_last_iteration(params.fit_last_iteration);

        Ok(Self {
            bands,
            pad: if params.extend_window { winmax } else { 0 },
            params: params.clone(),
            detector,
            fitter,
        })
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Filter one z-profile. `NaN` samples are treated as missing.
    pub fn apply(&self, profile: &[f64]) -> ProfileOutcome {
        debug_assert_eq!(profile.len(), self.bands);
        let nb = profile.len();
        let pad = self.pad;
        let data = pad..pad + nb;

        let series: Vec<f64> = profile
            .iter()
            .map(|&v| if v.is_nan() { 0.0 } else { v })
            .collect();
        let extended = extend_series(&series, pad);
        let valid = validity_mask(&extended, self.params.validity_floor);

        // counted over the padded series, compared against the band count
        let missing = valid.iter().filter(|v| !**v).count();
        if missing as f64 >= self.params.max_invalid_fraction * nb as f64 {
            return ProfileOutcome::TooSparse;
        }
        if longest_invalid_run(&valid) >= self.params.max_gap {
            return ProfileOutcome::TooSparse;
        }

        let valid = self.detector.detect(&extended, &valid, data.clone());
        let fitted = self.fitter.fit(&extended, &valid);

        let max = self.params.output_max;
        ProfileOutcome::Fitted(fitted[data].iter().map(|v| v.clamp(0.0, max)).collect())
    }
}

/// Filter a single z-profile with `params`
pub fn filter_profile(profile: &[f64], params: &TimesatParams) -> Result<ProfileOutcome> {
    Ok(TimesatFilter::new(params, profile.len())?.apply(profile))
}

/// Filter every pixel of a multi-temporal stack.
///
/// The output has the input's grid and band count, `f64` cells and a
/// numeric `0..=output_max` domain with resolution 1.
pub fn timesat_filter<T: RasterElement>(
    stack: &RasterStack<T>,
    params: &TimesatParams,
) -> Result<RasterStack<f64>> {
    timesat_filter_with_progress(stack, params, &NoProgress)
}

pub fn timesat_filter_with_progress<T: RasterElement>(
    stack: &RasterStack<T>,
    params: &TimesatParams,
    progress: &dyn Progress,
) -> Result<RasterStack<f64>> {
    let (bands, rows, cols) = stack.shape();
    let filter = TimesatFilter::new(params, bands)?;
    debug!(
        bands,
        rows,
        cols,
        windows = filter.fitter.schedule().len(),
        upper_envelope = params.upper_envelope,
        extend_window = params.extend_window,
        "timesat prepared"
    );

    progress.start(rows as u64);
    let per_row: Vec<Vec<ProfileOutcome>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            if progress.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let mut out = Vec::with_capacity(cols);
            for col in 0..cols {
                let profile = stack.z_profile(row, col)?;
                out.push(filter.apply(&profile));
            }
            progress.update(1);
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut output: RasterStack<f64> = stack.with_same_meta();
    let mut zero_filled = 0usize;
    for (row, outcomes) in per_row.into_iter().enumerate() {
        for (col, outcome) in outcomes.into_iter().enumerate() {
            if outcome == ProfileOutcome::TooSparse {
                zero_filled += 1;
            }
            output.set_z_profile(row, col, &outcome.into_values(bands))?;
        }
    }
    output.set_domain(Some(Domain::Numeric(NumericRange::new(
        0.0,
        params.output_max,
        1.0,
    ))));

    info!(
        pixels = rows * cols,
        fitted = rows * cols - zero_filled,
        zero_filled,
        "timesat finished"
    );
    Ok(output)
}

/// [`Algorithm`] wrapper around [`timesat_filter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Timesat;

impl Algorithm for Timesat {
    type Input = RasterStack<f64>;
    type Output = RasterStack<f64>;
    type Params = TimesatParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Timesat"
    }

    fn description(&self) -> &'static str {
        "Iterative adaptive Savitzky-Golay filtering of a multi-temporal stack"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        timesat_filter(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoseries_core::ProgressCounter;

    fn stack_of(profile: &[f64], rows: usize, cols: usize) -> RasterStack<f64> {
        let bands = profile.len();
        let mut stack = RasterStack::new(bands, rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                stack.set_z_profile(row, col, profile).unwrap();
            }
        }
        stack
    }

    #[test]
    fn test_constant_profile_is_unchanged() {
        let profile = vec![100.0; 20];
        let outcome = filter_profile(&profile, &TimesatParams::default()).unwrap();
        assert_eq!(outcome, ProfileOutcome::Fitted(profile));
    }

    #[test]
    fn test_constant_profile_without_extension() {
        let profile = vec![100.0; 20];
        let params = TimesatParams {
            extend_window: false,
            ..Default::default()
        };
        let outcome = filter_profile(&profile, &params).unwrap();
        assert_eq!(outcome, ProfileOutcome::Fitted(profile));
    }

    #[test]
    fn test_spike_is_removed() {
        let mut profile = vec![100.0; 20];
        profile[10] = 250.0;
        let values = filter_profile(&profile, &TimesatParams::default())
            .unwrap()
            .into_values(20);
        assert_eq!(values, vec![100.0; 20]);
    }

    #[test]
    fn test_long_gap_is_zero_filled() {
        let mut profile = vec![100.0; 30];
        for v in &mut profile[8..20] {
            *v = 0.0;
        }
        let outcome = filter_profile(&profile, &TimesatParams::default()).unwrap();
        assert_eq!(outcome, ProfileOutcome::TooSparse);

        // one sample shorter than the gap limit still gets fitted
        profile[19] = 100.0;
        let outcome = filter_profile(&profile, &TimesatParams::default()).unwrap();
        assert!(matches!(outcome, ProfileOutcome::Fitted(_)));
    }

    #[test]
    fn test_mostly_missing_is_zero_filled() {
        let profile: Vec<f64> = (0..20).map(|i| if i % 4 == 0 { 100.0 } else { 0.0 }).collect();
        let outcome = filter_profile(&profile, &TimesatParams::default()).unwrap();
        assert_eq!(outcome, ProfileOutcome::TooSparse);
    }

    #[test]
    fn test_nan_samples_are_missing() {
        let mut profile = vec![100.0; 20];
        profile[4] = f64::NAN;
        let values = filter_profile(&profile, &TimesatParams::default())
            .unwrap()
            .into_values(20);
        assert_eq!(values, vec![100.0; 20]);
    }

    #[test]
    fn test_output_is_clamped() {
        let values = filter_profile(&[300.0; 20], &TimesatParams::default())
            .unwrap()
            .into_values(20);
        assert!(values.iter().all(|&v| v == 255.0));
    }

    #[test]
    fn test_padding_counts_towards_missing_share() {
        // 14 of 20 samples missing stays under 0.75 on its own, but the pad
        // copies two more missing samples in front and three behind
        let mut profile = vec![0.0; 20];
        for i in [4, 9, 14, 15, 16, 17] {
            profile[i] = 100.0;
        }
        let outcome = filter_profile(&profile, &TimesatParams::default()).unwrap();
        assert_eq!(outcome, ProfileOutcome::TooSparse);

        let params = TimesatParams {
            extend_window: false,
            ..Default::default()
        };
        let outcome = filter_profile(&profile, &params).unwrap();
        assert!(matches!(outcome, ProfileOutcome::Fitted(_)));
    }

    #[test]
    fn test_too_few_bands() {
        let err = filter_profile(&[100.0; 2], &TimesatParams::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientBands { required: 3, actual: 2 }));

        let params = TimesatParams {
            extend_window: false,
            ..Default::default()
        };
        let err = filter_profile(&[100.0; 6], &params).unwrap_err();
        assert!(matches!(err, Error::InsufficientBands { required: 7, actual: 6 }));
    }

    #[test]
    fn test_short_padded_profile() {
        let outcome = filter_profile(&[100.0; 3], &TimesatParams::default()).unwrap();
        assert_eq!(outcome, ProfileOutcome::Fitted(vec![100.0; 3]));
        let outcome = filter_profile(&[100.0; 6], &TimesatParams::default()).unwrap();
        assert_eq!(outcome, ProfileOutcome::Fitted(vec![100.0; 6]));
    }

    #[test]
    fn test_invalid_params() {
        let params = TimesatParams {
            max_invalid_fraction: 0.0,
            ..Default::default()
        };
        assert!(filter_profile(&[100.0; 20], &params).is_err());

        let params = TimesatParams {
            spike_cutoff: -1.0,
            ..Default::default()
        };
        assert!(filter_profile(&[100.0; 20], &params).is_err());
    }

    #[test]
    fn test_stack_filter() {
        let mut profile = vec![100.0; 20];
        profile[10] = 250.0;
        let mut stack = stack_of(&profile, 3, 4);
        stack.set_z_profile(1, 2, &[0.0; 20]).unwrap();

        let out = timesat_filter(&stack, &TimesatParams::default()).unwrap();
        assert_eq!(out.shape(), (20, 3, 4));
        assert_eq!(out.z_profile(0, 0).unwrap(), vec![100.0; 20]);
        assert_eq!(out.z_profile(1, 2).unwrap(), vec![0.0; 20]);
        assert!(matches!(out.domain(), Some(Domain::Numeric(r)) if r.max == 255.0));
    }

    #[test]
    fn test_cancelled_run() {
        let stack = stack_of(&[100.0; 20], 4, 2);
        let progress = ProgressCounter::new();
        progress.cancel();
        let err = timesat_filter_with_progress(&stack, &TimesatParams::default(), &progress).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_progress_counts_rows() {
        let stack = stack_of(&[100.0; 20], 5, 2);
        let progress = ProgressCounter::new();
        timesat_filter_with_progress(&stack, &TimesatParams::default(), &progress).unwrap();
        assert_eq!(progress.total(), 5);
        assert_eq!(progress.done(), 5);
    }
}
