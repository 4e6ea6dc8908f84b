//! Cost curves: what each candidate transfer quantity is expected to cost
//! one side of the transfer.

use crate::types::{Quantity, Sku};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    /// Mean lost-sales units per trial.
    pub stockout_units:       f64,
    pub waste_units:          f64,
    /// Fraction of trials with at least one stockout day.
    pub stockout_probability: f64,
}

/// Candidate quantity -> expected cost, for one product and one role.
/// Candidates start at 0 and step by the product's lot size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    points: BTreeMap<Quantity, CostPoint>,
}

impl CostCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// The curve of a product with nothing to simulate: one free candidate.
    pub fn zero() -> Self {
        let mut curve = Self::new();
        curve.insert(0, CostPoint::default());
        curve
    }

    pub fn insert(&mut self, quantity: Quantity, point: CostPoint) {
        self.points.insert(quantity, point);
    }

    pub fn get(&self, quantity: Quantity) -> Option<&CostPoint> {
        self.points.get(&quantity)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Candidate quantities in ascending order.
    pub fn quantities(&self) -> Vec<Quantity> {
        self.points.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quantity, &CostPoint)> {
        self.points.iter().map(|(q, p)| (*q, p))
    }

    pub fn stockout_units_by_quantity(&self) -> BTreeMap<Quantity, f64> {
        self.iter().map(|(q, p)| (q, p.stockout_units)).collect()
    }

    pub fn wasted_units_by_quantity(&self) -> BTreeMap<Quantity, f64> {
        self.iter().map(|(q, p)| (q, p.waste_units)).collect()
    }
}

/// A product the engine did not simulate, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedProduct {
    pub sku:    Sku,
    pub reason: String,
}

/// Every curve computed for one run, split by role.
#[derive(Debug, Clone, Default)]
pub struct CurveBook {
    pub origin:      BTreeMap<Sku, CostCurve>,
    pub destination: BTreeMap<Sku, CostCurve>,
    pub skipped:     Vec<SkippedProduct>,
}

impl CurveBook {
    pub fn is_skipped(&self, sku: &str) -> bool {
        self.skipped.iter().any(|s| s.sku == sku)
    }
}
