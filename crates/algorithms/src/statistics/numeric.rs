//! Streaming summary statistics over numeric sequences

/// Count, mean, standard deviation and range of a sequence, computed in a
/// single pass (Welford's update).
///
/// `std_dev` is the sample deviation (divisor `N - 1`). Callers that need
/// the population ("biased") form multiply by `sqrt((N - 1) / N)`; see
/// [`NumericStatistics::biased_std_dev`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStatistics {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    m2: f64,
}

impl Default for NumericStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            m2: 0.0,
        }
    }
}

impl NumericStatistics {
    pub fn calculate<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut stats = Self::default();
        for v in values {
            stats.push(v);
        }
        stats
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = value;
            self.min = value;
            self.max = value;
            return;
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Sample standard deviation; `NaN` for fewer than two values
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }

    /// `std_dev * sqrt((N - 1) / N)`; `NaN` for fewer than two values
    pub fn biased_std_dev(&self) -> f64 {
        let n = self.count as f64;
        self.std_dev() * ((n - 1.0) / n).sqrt()
    }
}

/// Element at index `len / 2` of the sorted values (the upper median for
/// even lengths). `None` for an empty slice.
pub fn upper_median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}
