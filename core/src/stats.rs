//! Small sample statistics used by the simulator's precision control
//! and by the KDE bandwidth rule.

use crate::error::TransshipResult;
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub mean:       f64,
    pub half_width: f64,
}

impl ConfidenceInterval {
    /// Half-width as a fraction of the mean. `None` when the mean is zero.
    pub fn relative_half_width(&self) -> Option<f64> {
        (self.mean != 0.0).then(|| self.half_width / self.mean.abs())
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - ddof) as f64).sqrt()
}

/// Linear-interpolated percentile of an ascending slice, `q` in [0, 100].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Student-t confidence interval for the mean of `data`.
pub fn confidence_interval(data: &[f64], confidence: f64) -> TransshipResult<ConfidenceInterval> {
    let n = data.len();
    let mean = mean(data);
    if n < 2 {
        return Ok(ConfidenceInterval { mean, half_width: 0.0 });
    }
    let sem = std_dev(data, 1) / (n as f64).sqrt();
    let t = StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map_err(|e| anyhow::anyhow!("Student-t with {} degrees of freedom: {e}", n - 1))?;
    let critical = t.inverse_cdf((1.0 + confidence) / 2.0);
    Ok(ConfidenceInterval { mean, half_width: sem * critical })
}

/// Trials needed for a two-sided interval of `half_width` at `confidence`,
/// given a population standard deviation `sigma`: `(z·σ/h)²`.
pub fn estimate_sample_size(half_width: f64, confidence: f64, sigma: f64) -> TransshipResult<usize> {
    let standard = Normal::new(0.0, 1.0).map_err(|e| anyhow::anyhow!("standard normal: {e}"))?;
    let z = standard.inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
    Ok(((z * sigma / half_width).powi(2)).floor() as usize)
}
