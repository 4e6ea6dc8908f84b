//! The run engine: one transfer problem in, one allocation out.
//!
//! EXECUTION ORDER:
//!   1. Simulate every SKU stocked on both sides, origin first.
//!      A product skipped at the origin is not simulated at the destination.
//!   2. Build the optimizer over the collected curves.
//!   3. Solve and record the selection.
//!
//! RULES:
//!   - All randomness flows through the RngBank, one stream per (SKU, role).
//!   - Unsupported products degrade to a skip; every other error aborts the run.
//!   - Everything notable is recorded as a RunEvent.

use crate::{
    config::TransshipConfig,
    cost_curve::{CostCurve, CurveBook, SkippedProduct},
    error::TransshipResult,
    event::RunEvent,
    optimizer::{Allocation, TransshipmentOptimizer},
    product::{Product, TransferProblem},
    rng::RngBank,
    simulator::{select_simulator, Selection},
    types::Role,
};
use serde::{Deserialize, Serialize};

/// Outcome of one run, ready to be written out as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub execution_id:          String,
    pub origin_warehouse:      String,
    pub destination_warehouse: String,
    pub seed:                  u64,
    pub allocation:            Allocation,
    pub events:                Vec<RunEvent>,
}

pub struct TransshipEngine {
    config:   TransshipConfig,
    rng_bank: RngBank,
    events:   Vec<RunEvent>,
}

impl TransshipEngine {
    pub fn new(config: TransshipConfig) -> Self {
        Self {
            rng_bank: RngBank::new(config.seed),
            config,
            events:   Vec::new(),
        }
    }

    pub fn config(&self) -> &TransshipConfig {
        &self.config
    }

    /// Events recorded since the last `run` started.
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Simulate both sides of every product stocked at both warehouses.
    pub fn collect_curves(&mut self, problem: &TransferProblem) -> TransshipResult<CurveBook> {
        let mut book = CurveBook::default();

        for (sku, origin) in &problem.origin_products {
            let Some(destination) = problem.destination_products.get(sku) else {
                continue;
            };

            let Some(origin_curve) = self.simulate(origin, Role::Origin, &mut book)? else {
                continue;
            };
            let Some(destination_curve) = self.simulate(destination, Role::Destination, &mut book)? else {
                continue;
            };
            book.origin.insert(sku.clone(), origin_curve);
            book.destination.insert(sku.clone(), destination_curve);
        }
        Ok(book)
    }

    /// `None` when the product was skipped; the skip is recorded in `book`.
    fn simulate(
        &mut self,
        product: &Product,
        role: Role,
        book: &mut CurveBook,
    ) -> TransshipResult<Option<CostCurve>> {
        let rng = self.rng_bank.for_product(&product.sku, role);
        let mut simulator = match select_simulator(product, role, &self.config.simulation, rng)? {
            Selection::Simulate(simulator) => simulator,
            Selection::Skip(skipped) => {
                log::warn!("engine sku={} role={role}: skipped, {}", skipped.sku, skipped.reason);
                self.skip(book, skipped);
                return Ok(None);
            }
        };

        let curve = simulator.cost_curve()?.clone();
        let (sku, role) = (simulator.sku().to_string(), simulator.role());
        log::debug!("engine sku={sku} role={role}: {} curve with {} candidates", simulator.name(), curve.len());
        if let Some(stats) = simulator.stats() {
            if let Some(from) = stats.refined_from {
                self.events.push(RunEvent::SampleSizeIncreased {
                    sku: sku.clone(),
                    role,
                    from,
                    to: stats.sample_size,
                });
            }
            self.events.push(RunEvent::CurveSimulated {
                sku,
                role,
                candidates:   curve.len(),
                sample_size:  stats.sample_size,
                horizon_days: stats.horizon_days,
            });
        }
        Ok(Some(curve))
    }

    fn skip(&mut self, book: &mut CurveBook, skipped: SkippedProduct) {
        self.events.push(RunEvent::ProductSkipped {
            sku:    skipped.sku.clone(),
            reason: skipped.reason.clone(),
        });
        book.skipped.push(skipped);
    }

    /// Simulate, optimize and report. Clears events from any previous run.
    pub fn run(&mut self, problem: &TransferProblem) -> TransshipResult<RunReport> {
        self.events.clear();
        self.events.push(RunEvent::RunInitialized {
            execution_id: problem.execution_id.clone(),
            seed:         self.rng_bank.master_seed(),
            products:     problem.origin_products.len(),
        });
        log::info!(
            "engine: run {} from {} to {}, {} origin products",
            problem.execution_id,
            problem.origin_warehouse,
            problem.destination_warehouse,
            problem.origin_products.len()
        );

        let book = self.collect_curves(problem)?;
        let optimizer = TransshipmentOptimizer::new(problem, &book, &self.config.optimizer);
        for ineligible in optimizer.ineligible() {
            self.events.push(RunEvent::ProductIneligible {
                sku:    ineligible.sku.clone(),
                reason: ineligible.reason.clone(),
            });
        }

        let allocation = optimizer.solve()?;
        for (sku, quantity) in &allocation.quantities {
            self.events.push(RunEvent::QuantitySelected { sku: sku.clone(), quantity: *quantity });
        }
        if !allocation.left_behind.is_empty() {
            log::warn!(
                "engine: {} mandatory products could not be shipped",
                allocation.left_behind.len()
            );
        }
        for sku in &allocation.left_behind {
            self.events.push(RunEvent::MandatoryLeftBehind { sku: sku.clone() });
        }

        Ok(RunReport {
            execution_id:          problem.execution_id.clone(),
            origin_warehouse:      problem.origin_warehouse.clone(),
            destination_warehouse: problem.destination_warehouse.clone(),
            seed:                  self.rng_bank.master_seed(),
            allocation,
            events:                self.events.clone(),
        })
    }
}
