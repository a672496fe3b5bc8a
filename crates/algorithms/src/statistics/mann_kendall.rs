//! Mann–Kendall trend significance test
//!
//! For every pixel the z-profile `x₀ … xₙ₋₁` (one value per band) is tested
//! for a monotonic trend:
//!
//! ```text
//! S    = Σᵢ Σⱼ>ᵢ sign(xⱼ − xᵢ)
//! varS = (n(n−1)(2n+5) − Σₜ t(t−1)(2t+5)) / 18
//! Z    = (S−1)/√varS  if S > 0
//!        0            if S = 0
//!        (S+1)/√varS  if S < 0
//! p    = Φ(Z)
//! ```
//!
//! A comparison involving an undefined (`NaN`) sample contributes 0 to `S`
//! and is counted as a tie; for each `i` the number of such comparisons forms
//! one tie group `t` in the variance correction.
//!
//! Reference:
//! Mann, H.B. (1945). Nonparametric tests against trend. Econometrica 13.
//! Kendall, M.G. (1975). Rank Correlation Methods. Griffin.

use crate::maybe_rayon::*;
use geoseries_core::progress::{NoProgress, Progress};
use geoseries_core::raster::{Domain, ItemDomain, Raster, RasterStack};
use geoseries_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};

/// Fewest bands the test accepts
pub const MIN_BANDS: usize = 2;

/// How the per-pixel probability becomes the output class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceRule {
    /// Class 1 whenever `Φ(Z) > 0`.
    ///
    /// `Φ` is strictly positive for every finite `Z`, so this marks every
    /// pixel with a finite score. Kept as the default because existing
    /// products were generated with it.
    #[default]
    PositiveProbability,
    /// Class 1 when the two-sided p-value `2·(1 − Φ(|Z|))` is below the
    /// significance level.
    TwoSided,
}

/// Parameters for the significance test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MannKendallParams {
    /// Significance level α, in (0, 1)
    pub significance_level: f64,
    pub rule: SignificanceRule,
}

impl Default for MannKendallParams {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            rule: SignificanceRule::default(),
        }
    }
}

/// Test statistics of one z-profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannKendallResult {
    pub s: f64,
    pub var_s: f64,
    pub z: f64,
    pub probability: f64,
}

/// `S` and the tie groups of a series
pub fn trend_value(series: &[f64]) -> (f64, Vec<usize>) {
    let mut s = 0i64;
    let mut ties = Vec::new();

    for (i, &xi) in series.iter().enumerate() {
        let mut repeats = 0usize;
        for &xj in &series[i + 1..] {
            if xi.is_nan() || xj.is_nan() {
                repeats += 1;
                continue;
            }
            if xj > xi {
                s += 1;
            } else if xj < xi {
                s -= 1;
            }
        }
        if repeats > 0 {
            ties.push(repeats);
        }
    }

    (s as f64, ties)
}

fn cubic_term(v: usize) -> f64 {
    let v = v as f64;
    v * (v - 1.0) * (2.0 * v + 5.0)
}

/// Variance of `S` for `n` samples with tie correction
pub fn variance_s(n: usize, ties: &[usize]) -> f64 {
    let tie_factor: f64 = ties.iter().map(|&t| cubic_term(t)).sum();
    (cubic_term(n) - tie_factor) / 18.0
}

/// Continuity-corrected normal score; 0 when `S = 0` or `varS ≤ 0`
pub fn z_score(s: f64, var_s: f64) -> f64 {
    if s == 0.0 || !(var_s > 0.0) {
        return 0.0;
    }
    let sd = var_s.sqrt();
    if s > 0.0 {
        (s - 1.0) / sd
    } else {
        (s + 1.0) / sd
    }
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| Error::Algorithm(e.to_string()))
}

/// Full test on one series
pub fn mann_kendall(series: &[f64]) -> Result<MannKendallResult> {
    let normal = standard_normal()?;
    Ok(evaluate(series, &normal))
}

fn evaluate(series: &[f64], normal: &Normal) -> MannKendallResult {
    let (s, ties) = trend_value(series);
    let var_s = variance_s(series.len(), &ties);
    let z = z_score(s, var_s);
    MannKendallResult {
        s,
        var_s,
        z,
        probability: normal.cdf(z),
    }
}

impl SignificanceRule {
    pub fn is_significant(&self, result: &MannKendallResult, level: f64) -> bool {
        match self {
            SignificanceRule::PositiveProbability => result.probability > 0.0,
            SignificanceRule::TwoSided => {
                let upper = if result.z >= 0.0 {
                    1.0 - result.probability
                } else {
                    result.probability
                };
                2.0 * upper < level
            }
        }
    }
}

fn validate_stack(stack: &RasterStack<f64>) -> Result<()> {
    if stack.bands() < MIN_BANDS {
        return Err(Error::InsufficientBands {
            required: MIN_BANDS,
            actual: stack.bands(),
        });
    }
    Ok(())
}

fn validate_params(params: &MannKendallParams) -> Result<()> {
    let alpha = params.significance_level;
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::InvalidParameter {
            name: "significance_level",
            value: alpha.to_string(),
            reason: "must lie strictly between 0 and 1".into(),
        });
    }
    Ok(())
}

/// Per-pixel results for a whole stack, row by row.
///
/// Progress is reported once per row; a cancelled run returns
/// [`Error::Cancelled`].
fn evaluate_stack(
    stack: &RasterStack<f64>,
    progress: &dyn Progress,
) -> Result<Vec<MannKendallResult>> {
    let (_, rows, cols) = stack.shape();
    let normal = standard_normal()?;
    progress.start(rows as u64);

    let per_row: Vec<Vec<MannKendallResult>> = (0..rows)
        .into_par_iter()
        .map(|row| {
            if progress.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let mut out = Vec::with_capacity(cols);
            for col in 0..cols {
                let profile = stack.z_profile(row, col)?;
                out.push(evaluate(&profile, &normal));
            }
            progress.update(1);
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(per_row.into_iter().flatten().collect())
}

/// Classify every pixel of a multi-band stack by trend significance.
///
/// The output raster stores item indices of `domain`: 1 where the rule in
/// `params` reports significance, 0 elsewhere. `domain` must be an item
/// domain and the stack must hold at least [`MIN_BANDS`] bands.
pub fn mann_kendall_significance(
    stack: &RasterStack<f64>,
    domain: &Domain,
    params: &MannKendallParams,
) -> Result<Raster<u8>> {
    mann_kendall_significance_with_progress(stack, domain, params, &NoProgress)
}

pub fn mann_kendall_significance_with_progress(
    stack: &RasterStack<f64>,
    domain: &Domain,
    params: &MannKendallParams,
    progress: &dyn Progress,
) -> Result<Raster<u8>> {
    validate_stack(stack)?;
    let items: &ItemDomain = domain.as_item().ok_or(Error::DomainMismatch {
        expected: "item",
        actual: domain.kind(),
    })?;
    validate_params(params)?;
    debug!(
        bands = stack.bands(),
        rows = stack.rows(),
        cols = stack.cols(),
        items = items.len(),
        rule = ?params.rule,
        "mann-kendall prepared"
    );

    let results = evaluate_stack(stack, progress)?;

    let mut output: Raster<u8> = stack.band_like();
    let mut significant = 0usize;
    for (cell, result) in output.data_mut().iter_mut().zip(&results) {
        let flag = params.rule.is_significant(result, params.significance_level);
        significant += flag as usize;
        *cell = flag as u8;
    }
    output.set_domain(Some(domain.clone()));

    info!(pixels = results.len(), significant, "mann-kendall finished");
    Ok(output)
}

/// Per-pixel `S`, `varS`, `Z` and probability rasters
#[derive(Debug, Clone)]
pub struct MannKendallRasters {
    pub s: Raster<f64>,
    pub var_s: Raster<f64>,
    pub z: Raster<f64>,
    pub probability: Raster<f64>,
}

/// Expose the intermediate test statistics instead of the class raster
pub fn mann_kendall_statistics(stack: &RasterStack<f64>) -> Result<MannKendallRasters> {
    validate_stack(stack)?;
    let results = evaluate_stack(stack, &NoProgress)?;

    let mut s: Raster<f64> = stack.band_like();
    let mut var_s: Raster<f64> = stack.band_like();
    let mut z: Raster<f64> = stack.band_like();
    let mut probability: Raster<f64> = stack.band_like();

    let cells = s
        .data_mut()
        .iter_mut()
        .zip(var_s.data_mut().iter_mut())
        .zip(z.data_mut().iter_mut())
        .zip(probability.data_mut().iter_mut());
    for ((((s, v), z), p), r) in cells.zip(&results) {
        *s = r.s;
        *v = r.var_s;
        *z = r.z;
        *p = r.probability;
    }

    Ok(MannKendallRasters { s, var_s, z, probability })
}

/// Input for [`MannKendallTest`]: the stack and the output item domain
#[derive(Debug, Clone)]
pub struct MannKendallInput {
    pub stack: RasterStack<f64>,
    pub domain: Domain,
}

/// Mann–Kendall significance test algorithm
#[derive(Debug, Clone, Default)]
pub struct MannKendallTest;

impl Algorithm for MannKendallTest {
    type Input = MannKendallInput;
    type Output = Raster<u8>;
    type Params = MannKendallParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "MannKendallSignificanceTest"
    }

    fn description(&self) -> &'static str {
        "Classify each pixel of a multi-band raster by the significance of its monotonic trend"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        mann_kendall_significance(&input.stack, &input.domain, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geoseries_core::raster::NumericRange;

    fn trend_domain() -> Domain {
        Domain::Item(ItemDomain::new(["not significant", "significant"]))
    }

    #[test]
    fn test_increasing_series() {
        let series: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let r = mann_kendall(&series).unwrap();
        assert_eq!(r.s, 45.0); // n(n-1)/2
        assert!(r.z > 0.0);
        assert!(r.probability > 0.5);
    }

    #[test]
    fn test_decreasing_series() {
        let series: Vec<f64> = (0..10).rev().map(|v| v as f64).collect();
        let r = mann_kendall(&series).unwrap();
        assert_eq!(r.s, -45.0);
        assert!(r.z < 0.0);
        assert!(r.probability < 0.5);
    }

    #[test]
    fn test_constant_series() {
        let r = mann_kendall(&[7.0; 12]).unwrap();
        assert_eq!(r.s, 0.0);
        assert_eq!(r.z, 0.0);
        assert_relative_eq!(r.probability, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_variance_without_ties() {
        // n = 10: 10 * 9 * 25 / 18 = 125
        assert_relative_eq!(variance_s(10, &[]), 125.0, epsilon = 1e-12);
        let z = z_score(45.0, 125.0);
        assert_relative_eq!(z, 44.0 / 125f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(z_score(-45.0, 125.0), -z, epsilon = 1e-12);
    }

    #[test]
    fn test_undefined_samples_are_ties() {
        let series = [1.0, f64::NAN, 3.0, 4.0];
        let (s, ties) = trend_value(&series);
        // pairs without NaN: (1,3) (1,4) (3,4)
        assert_eq!(s, 3.0);
        // i=0 sees one NaN, i=1 is NaN against two samples
        assert_eq!(ties, vec![1, 2]);
        let expected = (cubic_term(4) - cubic_term(1) - cubic_term(2)) / 18.0;
        assert_relative_eq!(variance_s(4, &ties), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_variance_gives_zero_z() {
        assert_eq!(z_score(3.0, 0.0), 0.0);
        assert_eq!(z_score(3.0, -2.0), 0.0);
    }

    #[test]
    fn test_positive_probability_rule_flags_every_finite_z() {
        // Φ(Z) > 0 holds for decreasing and flat profiles alike
        let profiles = [[1.0, 2.0, 3.0, 4.0], [4.0, 3.0, 2.0, 1.0], [5.0; 4]];
        let band_major: Vec<f64> = (0..4)
            .flat_map(|b| profiles.iter().map(move |p| p[b]))
            .collect();
        let stack = RasterStack::from_vec(band_major, 4, 1, 3).unwrap();

        let out = mann_kendall_significance(&stack, &trend_domain(), &MannKendallParams::default())
            .unwrap();
        assert!(out.data().iter().all(|&v| v == 1));
        assert_eq!(out.domain(), Some(&trend_domain()));
    }

    #[test]
    fn test_two_sided_rule() {
        let rising: Vec<f64> = (0..20).map(|v| v as f64).collect();
        let r = mann_kendall(&rising).unwrap();
        assert!(SignificanceRule::TwoSided.is_significant(&r, 0.05));

        let flat = mann_kendall(&[1.0; 20]).unwrap();
        assert!(!SignificanceRule::TwoSided.is_significant(&flat, 0.05));
        assert!(SignificanceRule::PositiveProbability.is_significant(&flat, 0.05));
    }

    #[test]
    fn test_prepare_failures() {
        let one_band: RasterStack<f64> = RasterStack::new(1, 2, 2);
        assert!(matches!(
            mann_kendall_significance(&one_band, &trend_domain(), &MannKendallParams::default()),
            Err(Error::InsufficientBands { required: 2, actual: 1 })
        ));

        let stack: RasterStack<f64> = RasterStack::new(3, 2, 2);
        let numeric = Domain::Numeric(NumericRange::count(0.0, 1.0));
        assert!(matches!(
            mann_kendall_significance(&stack, &numeric, &MannKendallParams::default()),
            Err(Error::DomainMismatch { .. })
        ));

        let params = MannKendallParams {
            significance_level: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            mann_kendall_significance(&stack, &trend_domain(), &params),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_statistics_rasters() {
        // 3 bands over a 1x2 grid: pixel 0 rises, pixel 1 falls
        let stack = RasterStack::from_vec(vec![1.0, 9.0, 2.0, 8.0, 3.0, 7.0], 3, 1, 2).unwrap();
        let rasters = mann_kendall_statistics(&stack).unwrap();
        assert_eq!(rasters.s.get(0, 0).unwrap(), 3.0);
        assert_eq!(rasters.s.get(0, 1).unwrap(), -3.0);
        assert!(rasters.z.get(0, 0).unwrap() > 0.0);
        assert!(rasters.probability.get(0, 1).unwrap() < 0.5);
    }
}
