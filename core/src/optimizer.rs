//! The transshipment optimizer.
//!
//! One mixed-integer program per run picks exactly one candidate quantity
//! for every eligible product. The origin's expected stockout and waste
//! cost is minimised; the destination curve only bounds which quantities
//! are worth considering.
//!
//! Variables per product `p`:
//!   transfer[p, q]        binary, 1 iff p ships exactly q units
//!   closed_pallet_flag[p] binary, 1 iff p ships whole pallets
//!   pallet_count[p]       integer >= 0
//!   lot_count[p]          integer >= 0
//!   left_behind[p]        binary, mandatory products only

use crate::{
    config::OptimizerConfig,
    cost_curve::{CostPoint, CurveBook},
    error::{TransshipError, TransshipResult},
    product::{Product, TransferProblem},
    types::{Quantity, Sku},
};
use good_lp::{
    constraint, microlp, variable, Constraint, Expression, ProblemVariables, Solution, SolverModel,
    Variable,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One selectable quantity and what shipping it costs the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub quantity: Quantity,
    pub cost:     f64,
}

/// Everything the model needs to know about one eligible product.
#[derive(Debug, Clone)]
pub struct ProductPlan {
    pub sku:             Sku,
    pub lot_size:        f64,
    pub lots_per_pallet: f64,
    pub mandatory:       bool,
    pub candidates:      Vec<Candidate>,
}

impl ProductPlan {
    pub fn lots(&self, quantity: Quantity) -> f64 {
        quantity as f64 / self.lot_size
    }

    pub fn pallet_equivalents(&self, quantity: Quantity) -> f64 {
        self.lots(quantity) / self.lots_per_pallet
    }

    fn max_lots(&self) -> f64 {
        self.candidates.iter().map(|c| self.lots(c.quantity)).fold(0.0, f64::max)
    }

    fn max_cost(&self) -> f64 {
        self.candidates.iter().map(|c| c.cost).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IneligibleProduct {
    pub sku:    Sku,
    pub reason: String,
}

/// The optimizer's answer: one quantity per eligible product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub quantities:    BTreeMap<Sku, Quantity>,
    /// Mandatory products that could not be shipped.
    pub left_behind:   Vec<Sku>,
    /// Origin stockout plus waste cost of the selection, penalties excluded.
    pub expected_cost: f64,
}

impl Allocation {
    pub fn get(&self, sku: &str) -> Option<Quantity> {
        self.quantities.get(sku).copied()
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }
}

fn point_cost(point: &CostPoint, product: &Product) -> f64 {
    point.stockout_units * product.stockout_cost_per_unit()
        + point.waste_units * product.waste_cost_per_unit()
}

pub struct TransshipmentOptimizer<'a> {
    problem:    &'a TransferProblem,
    config:     &'a OptimizerConfig,
    plans:      Vec<ProductPlan>,
    ineligible: Vec<IneligibleProduct>,
}

impl<'a> TransshipmentOptimizer<'a> {
    /// Sort every product of `problem` into a plan or an ineligibility reason.
    pub fn new(problem: &'a TransferProblem, curves: &CurveBook, config: &'a OptimizerConfig) -> Self {
        let mut plans = Vec::new();
        let mut ineligible = Vec::new();
        let mut reject = |sku: &str, reason: String| {
            log::warn!("optimizer sku={sku}: not eligible, {reason}");
            ineligible.push(IneligibleProduct { sku: sku.to_string(), reason });
        };

        for (sku, origin) in &problem.origin_products {
            if let Some(skipped) = curves.skipped.iter().find(|s| &s.sku == sku) {
                reject(sku, format!("skipped: {}", skipped.reason));
                continue;
            }
            if !problem.destination_products.contains_key(sku) {
                reject(sku, "not stocked at the destination".to_string());
                continue;
            }
            let (Some(origin_curve), Some(destination_curve)) =
                (curves.origin.get(sku), curves.destination.get(sku))
            else {
                reject(sku, "missing cost curve".to_string());
                continue;
            };
            if origin_curve.is_empty() {
                reject(sku, "origin curve has no candidates".to_string());
                continue;
            }

            let shorter = if origin_curve.len() <= destination_curve.len() {
                origin_curve
            } else {
                destination_curve
            };
            let candidates: Vec<Candidate> = shorter
                .quantities()
                .into_iter()
                .filter_map(|quantity| {
                    destination_curve.get(quantity)?;
                    let at_origin = origin_curve.get(quantity)?;
                    Some(Candidate { quantity, cost: point_cost(at_origin, origin) })
                })
                .collect();
            if candidates.is_empty() {
                reject(sku, "no quantity is shared by both curves".to_string());
                continue;
            }

            plans.push(ProductPlan {
                sku: sku.clone(),
                lot_size: origin.lot_size() as f64,
                lots_per_pallet: origin.lots_per_pallet(),
                mandatory: origin.mandatory,
                candidates,
            });
        }

        for sku in problem.destination_products.keys() {
            if !problem.origin_products.contains_key(sku) {
                reject(sku, "not stocked at the origin".to_string());
            }
        }

        Self { problem, config, plans, ineligible }
    }

    pub fn plans(&self) -> &[ProductPlan] {
        &self.plans
    }

    pub fn ineligible(&self) -> &[IneligibleProduct] {
        &self.ineligible
    }

    /// Cost of leaving one mandatory product behind. Scaled from the run's
    /// own costs so it dominates every feasible selection.
    pub fn penalty(&self) -> f64 {
        let worst: f64 = self.plans.iter().map(ProductPlan::max_cost).sum();
        self.config.penalty_factor * (worst + 1.0)
    }

    pub fn solve(&self) -> TransshipResult<Allocation> {
        let required_pallets = self.problem.mandatory_closed_transport_units;
        if self.plans.is_empty() {
            if required_pallets > 0 {
                return Err(TransshipError::Unsolved {
                    reason: format!("{required_pallets} closed transport units required but no product is eligible"),
                });
            }
            log::info!("optimizer: no eligible products, empty allocation");
            return Ok(Allocation::default());
        }

        let penalty = self.penalty();
        let mut vars = ProblemVariables::new();
        let mut constraints: Vec<Constraint> = Vec::new();
        let mut objective = Expression::with_capacity(self.plans.len() * 8);
        let mut total_pallets = Expression::with_capacity(self.plans.len());
        let mut total_volume = Expression::with_capacity(self.plans.len() * 8);
        let mut picks: Vec<Vec<Variable>> = Vec::with_capacity(self.plans.len());
        let mut stranded: Vec<Option<Variable>> = Vec::with_capacity(self.plans.len());

        for plan in &self.plans {
            let transfer: Vec<Variable> = plan
                .candidates
                .iter()
                .map(|c| vars.add(variable().binary().name(format!("transfer_{}_{}", plan.sku, c.quantity))))
                .collect();

            let max_lots = plan.max_lots();
            let max_pallets = (max_lots / plan.lots_per_pallet).ceil();
            let big_m = max_lots + max_pallets * plan.lots_per_pallet + 1.0;
            let closed = vars.add(variable().binary().name(format!("closed_pallet_flag_{}", plan.sku)));
            let pallets = vars.add(
                variable().integer().min(0.0).max(max_pallets).name(format!("pallet_count_{}", plan.sku)),
            );
            let lots = vars.add(
                variable().integer().min(0.0).max(max_lots.ceil()).name(format!("lot_count_{}", plan.sku)),
            );

            let mut selected = Expression::with_capacity(transfer.len());
            let mut lots_equiv = Expression::with_capacity(transfer.len());
            for (&x, candidate) in transfer.iter().zip(&plan.candidates) {
                selected.add_mul(1.0, x);
                lots_equiv.add_mul(plan.lots(candidate.quantity), x);
                total_volume.add_mul(plan.pallet_equivalents(candidate.quantity), x);
                objective.add_mul(candidate.cost, x);
            }
            constraints.push(constraint!(selected == 1.0));

            // Whole pallets when the flag is set.
            let lpp = plan.lots_per_pallet;
            constraints.push(constraint!(lots_equiv.clone() - lpp * pallets + big_m * closed <= big_m));
            constraints.push(constraint!(lpp * pallets - lots_equiv.clone() + big_m * closed <= big_m));
            constraints.push(constraint!(1.0 * pallets - max_pallets * closed <= 0.0));
            // Whole lots otherwise.
            constraints.push(constraint!(lots_equiv.clone() - 1.0 * lots - big_m * closed <= 0.0));
            constraints.push(constraint!(1.0 * lots - lots_equiv.clone() - big_m * closed <= 0.0));
            total_pallets.add_mul(1.0, pallets);

            let left_behind = if plan.mandatory {
                let lb = vars.add(variable().binary().name(format!("left_behind_{}", plan.sku)));
                constraints.push(constraint!(lots_equiv + lb >= 1.0));
                objective.add_mul(penalty, lb);
                Some(lb)
            } else {
                None
            };

            picks.push(transfer);
            stranded.push(left_behind);
        }

        constraints.push(constraint!(total_pallets >= required_pallets as f64));
        constraints.push(constraint!(total_volume <= self.problem.capacity_in_transport_units));

        log::info!(
            "optimizer: solving for {} products, capacity {}, closed units {required_pallets}",
            self.plans.len(),
            self.problem.capacity_in_transport_units
        );
        let mut model = vars.minimise(objective).using(microlp);
        for c in constraints {
            model = model.with(c);
        }
        let solution = model
            .solve()
            .map_err(|e| TransshipError::Unsolved { reason: e.to_string() })?;

        let mut allocation = Allocation::default();
        for ((plan, transfer), left_behind) in self.plans.iter().zip(&picks).zip(&stranded) {
            let chosen = plan
                .candidates
                .iter()
                .zip(transfer)
                .find(|(_, x)| solution.value(**x) > 0.5)
                .map(|(c, _)| *c)
                .ok_or_else(|| TransshipError::Unsolved {
                    reason: format!("no quantity selected for {}", plan.sku),
                })?;
            log::info!("optimizer sku={}: transfer {} units", plan.sku, chosen.quantity);
            allocation.quantities.insert(plan.sku.clone(), chosen.quantity);
            allocation.expected_cost += chosen.cost;

            if left_behind.is_some_and(|lb| solution.value(lb) > 0.5) {
                log::warn!("optimizer sku={}: mandatory product left behind", plan.sku);
                allocation.left_behind.push(plan.sku.clone());
            }
        }
        Ok(allocation)
    }
}
