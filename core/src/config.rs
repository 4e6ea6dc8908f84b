use serde::{Deserialize, Serialize};

/// Monte-Carlo settings shared by every product simulation in a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Trials drawn before the precision check.
    pub initial_sample_size: usize,
    /// Confidence level of the lead-time demand interval.
    pub confidence: f64,
    /// Target half-width as a fraction of the mean lead-time demand.
    pub relative_half_width: f64,
    /// How many times the sample may be redrawn at a corrected size.
    pub max_refinements: usize,
    pub max_sample_size: usize,
    /// Non-positive `NORM` sigmas are clamped to this.
    pub sigma_floor: f64,
    /// Points on the probability grid the KDE inverse CDF is evaluated on.
    pub kde_grid_size: usize,
    /// Hard stop for a candidate sweep.
    pub max_candidates: usize,
    /// Allowed deviation from 1.0 for weighted-discrete probabilities.
    pub weight_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_sample_size: 500,
            confidence:          0.95,
            relative_half_width: 0.02,
            max_refinements:     1,
            max_sample_size:     100_000,
            sigma_floor:         1e-4,
            kde_grid_size:       512,
            max_candidates:      10_000,
            weight_tolerance:    1e-6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// The left-behind penalty is this factor times the largest total cost
    /// the run could possibly reach.
    pub penalty_factor: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            penalty_factor: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransshipConfig {
    pub seed:       u64,
    pub simulation: SimulationConfig,
    pub optimizer:  OptimizerConfig,
}

impl Default for TransshipConfig {
    fn default() -> Self {
        Self {
            seed:       42,
            simulation: SimulationConfig::default(),
            optimizer:  OptimizerConfig::default(),
        }
    }
}

impl TransshipConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    /// In tests, use TransshipConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: TransshipConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulation;
        if sim.initial_sample_size < 2 {
            anyhow::bail!("simulation.initial_sample_size must be at least 2");
        }
        if !(sim.confidence > 0.0 && sim.confidence < 1.0) {
            anyhow::bail!("simulation.confidence must lie strictly between 0 and 1");
        }
        if sim.relative_half_width <= 0.0 {
            anyhow::bail!("simulation.relative_half_width must be positive");
        }
        if sim.max_sample_size < sim.initial_sample_size {
            anyhow::bail!("simulation.max_sample_size must not be below initial_sample_size");
        }
        if sim.sigma_floor <= 0.0 {
            anyhow::bail!("simulation.sigma_floor must be positive");
        }
        if sim.weight_tolerance < 0.0 {
            anyhow::bail!("simulation.weight_tolerance must not be negative");
        }
        if sim.kde_grid_size < 2 || sim.max_candidates == 0 {
            anyhow::bail!("simulation.kde_grid_size and max_candidates are too small");
        }
        if self.optimizer.penalty_factor <= 1.0 {
            anyhow::bail!("optimizer.penalty_factor must exceed 1");
        }
        Ok(())
    }

    /// Small, fast configuration used by the test suite.
    pub fn default_test() -> Self {
        Self {
            seed: 7,
            simulation: SimulationConfig {
                initial_sample_size: 400,
                max_sample_size:     5_000,
                kde_grid_size:       128,
                max_candidates:      500,
                ..SimulationConfig::default()
            },
            optimizer: OptimizerConfig::default(),
        }
    }
}
