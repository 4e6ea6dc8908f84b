//! Monte-Carlo inventory simulation.
//!
//! For one product and one role, the simulator replays the planning horizon
//! over many independent trials and sweeps candidate transfer quantities,
//! turning each into an expected lost-sales figure. The same demand and
//! lead-time scenarios are reused for every candidate, so curves are
//! monotone in the transferred quantity.
//!
//! Sweep rules:
//!   - Origin (inventory − q): stop once the stockout fraction exceeds
//!     1 − service level, or q reaches current inventory.
//!   - Destination (inventory + q): stop once the stockout fraction drops
//!     below 1 − service level.

use crate::{
    config::SimulationConfig,
    cost_curve::{CostCurve, CostPoint, SkippedProduct},
    error::TransshipResult,
    product::Product,
    rng::StreamRng,
    stats,
    types::{Quantity, Role, Sku},
    variates::{VariateGenerator, Variates},
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diagnostics of the sample a curve was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub sample_size:           usize,
    /// Initial size when the precision check forced a redraw.
    pub refined_from:          Option<usize>,
    pub horizon_days:          usize,
    pub mean_lead_time_demand: f64,
    pub half_width:            f64,
}

/// The contract every simulator variant fulfils.
pub trait InventorySimulator {
    fn name(&self) -> &'static str;

    fn sku(&self) -> &str;

    fn role(&self) -> Role;

    /// Run the full simulation, replacing any previous curve.
    fn simulate(&mut self) -> TransshipResult<()>;

    /// The cost curve, simulating first if nothing has run yet.
    fn cost_curve(&mut self) -> TransshipResult<&CostCurve>;

    fn stats(&self) -> Option<&SimulationStats>;

    fn stockout_units_by_quantity(&mut self) -> TransshipResult<BTreeMap<Quantity, f64>> {
        Ok(self.cost_curve()?.stockout_units_by_quantity())
    }

    fn wasted_units_by_quantity(&mut self) -> TransshipResult<BTreeMap<Quantity, f64>> {
        Ok(self.cost_curve()?.wasted_units_by_quantity())
    }
}

// ── Selection ────────────────────────────────────────────────────────────────

/// Simulator variants. Perishable (lot-expiring) stock has no variant yet;
/// products carrying lot expirations are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationKind {
    NonPerishable,
}

impl SimulationKind {
    pub fn for_product(product: &Product) -> Option<Self> {
        if product.is_perishable() {
            None
        } else {
            Some(Self::NonPerishable)
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NonPerishable => "NP",
        }
    }
}

pub enum Selection {
    Simulate(Box<dyn InventorySimulator>),
    Skip(SkippedProduct),
}

/// Pick the simulator for `product`. Unsupported product types come back
/// as `Selection::Skip`; invalid records and distributions are errors.
pub fn select_simulator(
    product: &Product,
    role: Role,
    config: &SimulationConfig,
    rng: StreamRng,
) -> TransshipResult<Selection> {
    match SimulationKind::for_product(product) {
        Some(kind @ SimulationKind::NonPerishable) => {
            log::info!("selector sku={} role={role}: simulation kind {}", product.sku, kind.code());
            let simulator = NonPerishableSimulator::new(product, role, config, rng)?;
            Ok(Selection::Simulate(Box::new(simulator)))
        }
        None => Ok(Selection::Skip(SkippedProduct {
            sku:    product.sku.clone(),
            reason: "simulation type not supported: product has lot expirations".to_string(),
        })),
    }
}

// ── Non-perishable simulator ─────────────────────────────────────────────────

pub struct NonPerishableSimulator {
    sku:                 Sku,
    role:                Role,
    service_level:       f64,
    days_to_next_review: u32,
    lot_size:            Quantity,
    current_inventory:   f64,
    forecast:            BTreeMap<NaiveDate, f64>,
    incoming:            BTreeMap<NaiveDate, f64>,
    demand_generator:    VariateGenerator,
    lead_time_generator: VariateGenerator,
    config:              SimulationConfig,
    rng:                 StreamRng,
    curve:               Option<CostCurve>,
    stats:               Option<SimulationStats>,
}

impl NonPerishableSimulator {
    pub fn new(
        product: &Product,
        role: Role,
        config: &SimulationConfig,
        rng: StreamRng,
    ) -> TransshipResult<Self> {
        product.validate()?;
        let supplier = product.select_supplier()?;
        Ok(Self {
            sku:                 product.sku.clone(),
            role,
            service_level:       product.desired_service_level,
            days_to_next_review: product.days_to_next_review,
            lot_size:            product.lot_size(),
            current_inventory:   product.current_inventory,
            forecast:            product.forecast_by_date()?,
            incoming:            product.incoming_by_date()?,
            demand_generator:    VariateGenerator::new(&product.forecast_error_model, config)?,
            lead_time_generator: VariateGenerator::new(&supplier.lead_time_model, config)?,
            config:              config.clone(),
            rng,
            curve:               None,
            stats:               None,
        })
    }

    /// Draw lead times and the demand of every horizon day for `sample_size` trials.
    fn draw_scenarios(&mut self, start: NaiveDate, sample_size: usize) -> TransshipResult<Scenarios> {
        let review = self.days_to_next_review as f64;
        let lead_times: Vec<f64> = self
            .lead_time_generator
            .generate(0.0, sample_size, &mut self.rng)?
            .into_iter()
            .map(|lt| lt + review)
            .collect();

        let longest = lead_times.iter().copied().fold(0.0_f64, f64::max);
        let horizon_days = longest as usize + 1;

        let mut dates = Vec::with_capacity(horizon_days);
        let mut demand = Vec::with_capacity(horizon_days);
        for offset in 0..horizon_days {
            let date = start + Duration::days(offset as i64);
            let forecast = self.forecast.get(&date).copied().unwrap_or(0.0);
            let mut draws = self.demand_generator.generate(forecast, sample_size, &mut self.rng)?;
            // No sales on Sundays.
            if date.weekday() == Weekday::Sun {
                draws.iter_mut().for_each(|d| *d = 0.0);
            }
            dates.push(date);
            demand.push(draws);
        }

        Ok(Scenarios {
            in_forecast: dates.iter().map(|d| self.forecast.contains_key(d)).collect(),
            incoming:    dates.iter().map(|d| self.incoming.get(d).copied().unwrap_or(0.0)).collect(),
            lead_times,
            demand,
        })
    }

    /// Draw scenarios, re-drawing at a corrected size while the lead-time
    /// demand interval is too wide, at most `max_refinements` times.
    fn draw_precise_scenarios(
        &mut self,
        start: NaiveDate,
    ) -> TransshipResult<(Scenarios, SimulationStats)> {
        let mut sample_size = self.config.initial_sample_size;
        let mut refined_from = None;
        let mut attempt = 0;
        loop {
            let scenarios = self.draw_scenarios(start, sample_size)?;
            let demand = scenarios.lead_time_demand();
            let interval = stats::confidence_interval(&demand, self.config.confidence)?;
            log::info!(
                "simulator sku={} role={}: expected lead time demand {:.2}, half-width {:.2} (n={sample_size})",
                self.sku, self.role, interval.mean, interval.half_width
            );

            let too_wide = interval
                .relative_half_width()
                .is_some_and(|r| r >= self.config.relative_half_width);
            if !too_wide || attempt >= self.config.max_refinements {
                let summary = SimulationStats {
                    sample_size,
                    refined_from,
                    horizon_days: scenarios.horizon_days(),
                    mean_lead_time_demand: interval.mean,
                    half_width: interval.half_width,
                };
                return Ok((scenarios, summary));
            }

            let target = interval.mean.abs() * self.config.relative_half_width;
            let required = stats::estimate_sample_size(
                target,
                self.config.confidence,
                stats::std_dev(&demand, 0),
            )?;
            let next = required.max(2).min(self.config.max_sample_size);
            if next < required {
                log::warn!(
                    "simulator sku={} role={}: required sample size {required} capped at {next}",
                    self.sku, self.role
                );
            }
            log::warn!(
                "simulator sku={} role={}: sample size increased from {sample_size} to {next}",
                self.sku, self.role
            );
            refined_from.get_or_insert(sample_size);
            sample_size = next;
            attempt += 1;
        }
    }

    fn sweep_is_done(&self, quantity: Quantity, point: &CostPoint) -> bool {
        let tolerated = 1.0 - self.service_level;
        match self.role {
            Role::Origin => {
                point.stockout_probability > tolerated || quantity as f64 >= self.current_inventory
            }
            // No lost sales left means more stock cannot lower the stockout
            // fraction any further.
            Role::Destination => point.stockout_probability < tolerated || point.stockout_units == 0.0,
        }
    }
}

impl InventorySimulator for NonPerishableSimulator {
    fn name(&self) -> &'static str {
        "non_perishable"
    }

    fn sku(&self) -> &str {
        &self.sku
    }

    fn role(&self) -> Role {
        self.role
    }

    fn simulate(&mut self) -> TransshipResult<()> {
        let Some(start) = self.forecast.keys().next().copied() else {
            log::info!("simulator sku={} role={}: empty forecast, nothing to simulate", self.sku, self.role);
            self.curve = Some(CostCurve::zero());
            self.stats = Some(SimulationStats {
                sample_size:           0,
                refined_from:          None,
                horizon_days:          1,
                mean_lead_time_demand: 0.0,
                half_width:            0.0,
            });
            return Ok(());
        };

        let (scenarios, summary) = self.draw_precise_scenarios(start)?;

        let mut curve = CostCurve::new();
        let mut quantity: Quantity = 0;
        loop {
            let start_inventory = self.current_inventory + self.role.inventory_delta(quantity);
            let point = scenarios.evaluate(start_inventory);
            log::debug!(
                "simulator sku={} role={} q={quantity}: lost sales {:.3}, stockout prob {:.3}",
                self.sku, self.role, point.stockout_units, point.stockout_probability
            );
            curve.insert(quantity, point);

            if self.sweep_is_done(quantity, &point) {
                break;
            }
            if curve.len() >= self.config.max_candidates {
                log::warn!(
                    "simulator sku={} role={}: stopped after {} candidates",
                    self.sku, self.role, curve.len()
                );
                break;
            }
            quantity += self.lot_size;
        }

        log::info!(
            "simulator sku={} role={}: {} candidates up to {quantity}",
            self.sku, self.role, curve.len()
        );
        self.curve = Some(curve);
        self.stats = Some(summary);
        Ok(())
    }

    fn cost_curve(&mut self) -> TransshipResult<&CostCurve> {
        if self.curve.is_none() {
            self.simulate()?;
        }
        Ok(self.curve.get_or_insert_with(CostCurve::new))
    }

    fn stats(&self) -> Option<&SimulationStats> {
        self.stats.as_ref()
    }
}

/// Sampled trials. Demand is stored day-major: `demand[day][trial]`.
struct Scenarios {
    lead_times:  Vec<f64>,
    demand:      Vec<Vec<f64>>,
    in_forecast: Vec<bool>,
    incoming:    Vec<f64>,
}

impl Scenarios {
    fn trials(&self) -> usize {
        self.lead_times.len()
    }

    fn horizon_days(&self) -> usize {
        self.demand.len()
    }

    fn demand_on(&self, day: usize, trial: usize) -> f64 {
        if self.in_forecast[day] && day as f64 <= self.lead_times[trial] {
            self.demand[day][trial]
        } else {
            0.0
        }
    }

    /// Total demand inside each trial's lead time.
    fn lead_time_demand(&self) -> Vec<f64> {
        (0..self.trials())
            .map(|t| (0..self.horizon_days()).map(|day| self.demand_on(day, t)).sum())
            .collect()
    }

    /// Replay every trial from `start_inventory`. The last horizon day is
    /// simulated but not counted.
    fn evaluate(&self, start_inventory: f64) -> CostPoint {
        let trials = self.trials();
        let last_day = self.horizon_days().saturating_sub(1);
        let mut lost_total = 0.0;
        let mut stockout_trials = 0usize;

        for trial in 0..trials {
            let mut inventory = start_inventory;
            let mut lost_in_trial = 0.0;
            let mut stocked_out = false;
            for day in 0..self.horizon_days() {
                if !self.in_forecast[day] {
                    continue;
                }
                let demand = self.demand_on(day, trial);
                let lost = (demand - inventory).max(0.0);
                inventory = (inventory - demand).max(0.0);
                if day < last_day {
                    lost_in_trial += lost;
                    stocked_out |= lost > 0.0;
                }
                inventory += self.incoming[day];
            }
            lost_total += lost_in_trial;
            stockout_trials += usize::from(stocked_out);
        }

        let n = trials.max(1) as f64;
        CostPoint {
            stockout_units:       lost_total / n,
            waste_units:          0.0,
            stockout_probability: stockout_trials as f64 / n,
        }
    }
}
