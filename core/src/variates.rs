//! Random variate generators, one per distribution kind.
//!
//! Every generator answers the same question: give me `sample_size`
//! draws around `center`. Forecast-error models are centred at a day's
//! forecast; lead-time models are centred at zero and shifted afterwards.

use crate::{
    config::SimulationConfig,
    distribution::DistributionModel,
    error::{TransshipError, TransshipResult},
    rng::StreamRng,
    stats,
};
use rand::distributions::{Distribution, WeightedIndex};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use std::collections::BTreeMap;

/// The contract every generator fulfils.
pub trait Variates {
    fn generate(
        &self,
        center: f64,
        sample_size: usize,
        rng: &mut StreamRng,
    ) -> TransshipResult<Vec<f64>>;
}

/// Closed dispatch over the supported kinds.
#[derive(Debug, Clone)]
pub enum VariateGenerator {
    TruncatedNormal(TruncatedNormal),
    Empirical(EmpiricalKde),
    WeightedDiscrete(WeightedDiscrete),
}

impl VariateGenerator {
    pub fn new(model: &DistributionModel, config: &SimulationConfig) -> TransshipResult<Self> {
        let generator = match model {
            DistributionModel::Norm { sigma, .. } => {
                Self::TruncatedNormal(TruncatedNormal::new(*sigma, config.sigma_floor)?)
            }
            DistributionModel::Disc { values } => {
                Self::Empirical(EmpiricalKde::new(values.clone(), config.kde_grid_size)?)
            }
            DistributionModel::WeightedDiscrete { prob_value_pairs } => Self::WeightedDiscrete(
                WeightedDiscrete::new(prob_value_pairs, config.weight_tolerance)?,
            ),
        };
        Ok(generator)
    }
}

impl Variates for VariateGenerator {
    fn generate(
        &self,
        center: f64,
        sample_size: usize,
        rng: &mut StreamRng,
    ) -> TransshipResult<Vec<f64>> {
        match self {
            Self::TruncatedNormal(g)  => g.generate(center, sample_size, rng),
            Self::Empirical(g)        => g.generate(center, sample_size, rng),
            Self::WeightedDiscrete(g) => g.generate(center, sample_size, rng),
        }
    }
}

// ── Truncated normal ─────────────────────────────────────────────────────────

/// Normal(center, sigma) restricted to [0, inf), rounded to whole units.
#[derive(Debug, Clone)]
pub struct TruncatedNormal {
    sigma:    f64,
    standard: Normal,
}

impl TruncatedNormal {
    pub fn new(sigma: f64, sigma_floor: f64) -> TransshipResult<Self> {
        let sigma = if sigma > 0.0 { sigma } else { sigma_floor };
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| TransshipError::invalid_distribution(format!("standard normal: {e}")))?;
        Ok(Self { sigma, standard })
    }
}

impl Variates for TruncatedNormal {
    fn generate(
        &self,
        center: f64,
        sample_size: usize,
        rng: &mut StreamRng,
    ) -> TransshipResult<Vec<f64>> {
        // Inverse-CDF sampling restricted to the mass above zero.
        let lower = self.standard.cdf(-center / self.sigma);
        let draws = (0..sample_size)
            .map(|_| {
                let u = (lower + (1.0 - lower) * rng.next_f64())
                    .clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
                let z = self.standard.inverse_cdf(u);
                (center + self.sigma * z).max(0.0).round()
            })
            .collect();
        Ok(draws)
    }
}

// ── Empirical (KDE-smoothed) ─────────────────────────────────────────────────

/// Observed forecast errors turned into a discrete demand distribution.
#[derive(Debug, Clone)]
pub struct EmpiricalKde {
    errors:    Vec<f64>,
    grid_size: usize,
}

impl EmpiricalKde {
    pub fn new(errors: Vec<f64>, grid_size: usize) -> TransshipResult<Self> {
        if grid_size < 2 {
            return Err(TransshipError::invalid_distribution(format!(
                "the DISC model needs a KDE grid of at least 2 points, got {grid_size}"
            )));
        }
        Ok(Self { errors, grid_size })
    }

    /// Probability mass of integer demand values around `center`.
    pub fn mass_function(&self, center: f64) -> BTreeMap<i64, f64> {
        let mut working: Vec<f64> = self
            .errors
            .iter()
            .map(|e| center - e)
            .filter(|v| *v >= 0.0)
            .collect();
        if working.is_empty() {
            working.push(center.max(0.0));
        }

        let outcomes: Vec<i64> = if stats::std_dev(&working, 0) == 0.0 {
            log::debug!("variates: zero-variance sample around {center}, using exact values");
            working.iter().map(|v| v.trunc() as i64).collect()
        } else {
            kde_quantiles(&working, self.grid_size)
                .into_iter()
                .map(|v| v.max(0.0).trunc() as i64)
                .collect()
        };
        probability_of_each_value(&outcomes)
    }
}

impl Variates for EmpiricalKde {
    fn generate(
        &self,
        center: f64,
        sample_size: usize,
        rng: &mut StreamRng,
    ) -> TransshipResult<Vec<f64>> {
        let mass = self.mass_function(center);
        let values: Vec<f64> = mass.keys().map(|v| *v as f64).collect();
        let index: WeightedIndex<f64> = WeightedIndex::new(mass.values().copied())
            .map_err(|e| TransshipError::invalid_distribution(format!("empirical mass: {e}")))?;
        Ok((0..sample_size).map(|_| values[index.sample(rng)]).collect())
    }
}

/// count(v) / total for every distinct value.
fn probability_of_each_value(values: &[i64]) -> BTreeMap<i64, f64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(*v).or_default() += 1;
    }
    let total = values.len() as f64;
    counts.into_iter().map(|(v, c)| (v, c as f64 / total)).collect()
}

/// Scott's rule: 1.059 * min(sd, IQR / 1.349) * n^(-1/5).
fn scott_bandwidth(sample: &[f64]) -> f64 {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let iqr = stats::percentile(&sorted, 75.0) - stats::percentile(&sorted, 25.0);
    let sd = stats::std_dev(sample, 1);
    let spread = if iqr > 0.0 { sd.min(iqr / 1.349) } else { sd };
    1.059 * spread * (sample.len() as f64).powf(-0.2)
}

/// Gaussian KDE of `sample`, inverted at `grid_size` evenly spaced
/// probabilities in [0, 1].
fn kde_quantiles(sample: &[f64], grid_size: usize) -> Vec<f64> {
    let bw = scott_bandwidth(sample);
    let Ok(kernel) = Normal::new(0.0, 1.0) else {
        return sample.to_vec();
    };
    if bw <= 0.0 {
        return sample.to_vec();
    }

    let lo = sample.iter().copied().fold(f64::INFINITY, f64::min) - 3.0 * bw;
    let hi = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 3.0 * bw;
    let step = (hi - lo) / (grid_size - 1) as f64;
    let support: Vec<f64> = (0..grid_size).map(|i| lo + step * i as f64).collect();

    let n = sample.len() as f64;
    let density: Vec<f64> = support
        .iter()
        .map(|x| sample.iter().map(|xi| kernel.pdf((x - xi) / bw)).sum::<f64>() / (n * bw))
        .collect();

    // Cumulative trapezoid, normalised so the CDF ends at exactly 1.
    let mut cdf = vec![0.0; grid_size];
    for i in 1..grid_size {
        cdf[i] = cdf[i - 1] + 0.5 * (density[i] + density[i - 1]) * step;
    }
    let total = cdf[grid_size - 1];
    if total <= 0.0 {
        return sample.to_vec();
    }
    cdf.iter_mut().for_each(|c| *c /= total);

    (0..grid_size)
        .map(|i| {
            let p = i as f64 / (grid_size - 1) as f64;
            interpolate_inverse(&cdf, &support, p)
        })
        .collect()
}

/// x such that cdf(x) = p, linear between grid points.
fn interpolate_inverse(cdf: &[f64], support: &[f64], p: f64) -> f64 {
    let idx = cdf.partition_point(|c| *c < p);
    if idx == 0 {
        return support[0];
    }
    if idx >= cdf.len() {
        return support[support.len() - 1];
    }
    let (c0, c1) = (cdf[idx - 1], cdf[idx]);
    let (x0, x1) = (support[idx - 1], support[idx]);
    if c1 <= c0 {
        return x1;
    }
    x0 + (x1 - x0) * (p - c0) / (c1 - c0)
}

// ── Weighted discrete ────────────────────────────────────────────────────────

/// Explicit offsets with their probabilities; draws are `offset + center`.
#[derive(Debug, Clone)]
pub struct WeightedDiscrete {
    offsets: Vec<f64>,
    weights: Vec<f64>,
    index:   WeightedIndex<f64>,
}

impl WeightedDiscrete {
    pub fn new(prob_value_pairs: &BTreeMap<String, f64>, tolerance: f64) -> TransshipResult<Self> {
        if prob_value_pairs.is_empty() {
            return Err(TransshipError::invalid_distribution("prob_value_pairs is empty"));
        }
        let mut offsets = Vec::with_capacity(prob_value_pairs.len());
        let mut weights = Vec::with_capacity(prob_value_pairs.len());
        for (key, prob) in prob_value_pairs {
            let offset: f64 = key.trim().parse().map_err(|_| {
                TransshipError::invalid_distribution(format!(
                    "the keys of prob_value_pairs must be numeric, got '{key}'"
                ))
            })?;
            if !(prob.is_finite() && *prob >= 0.0) {
                return Err(TransshipError::invalid_distribution(format!(
                    "probability {prob} for offset {key} is not a valid probability"
                )));
            }
            offsets.push(offset);
            weights.push(*prob);
        }

        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > tolerance {
            return Err(TransshipError::invalid_distribution(format!(
                "probabilities in prob_value_pairs sum to {total}, expected 1"
            )));
        }
        let index = WeightedIndex::new(&weights)
            .map_err(|e| TransshipError::invalid_distribution(format!("prob_value_pairs: {e}")))?;
        Ok(Self { offsets, weights, index })
    }

    /// Σ offset · probability.
    pub fn expected_offset(&self) -> f64 {
        self.offsets.iter().zip(&self.weights).map(|(o, w)| o * w).sum()
    }
}

impl Variates for WeightedDiscrete {
    fn generate(
        &self,
        center: f64,
        sample_size: usize,
        rng: &mut StreamRng,
    ) -> TransshipResult<Vec<f64>> {
        Ok((0..sample_size)
            .map(|_| self.offsets[self.index.sample(rng)] + center)
            .collect())
    }
}
