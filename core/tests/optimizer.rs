use std::collections::BTreeMap;
use transship_core::{
    config::OptimizerConfig,
    cost_curve::{CostCurve, CostPoint, CurveBook, SkippedProduct},
    distribution::DistributionModel,
    error::TransshipError,
    optimizer::TransshipmentOptimizer,
    product::{Product, Supplier, TransferProblem},
};

/// Price 10 and a 50% shortage cost: every lost unit at the origin costs 5.
fn product(sku: &str, lot: u64, lots_per_pallet: f64, mandatory: bool) -> Product {
    Product {
        sku: sku.to_string(),
        warehouse: String::new(),
        desired_service_level: 0.95,
        days_to_next_review: 7,
        units_per_product_dim: lot,
        supplier_dim_to_product_dim_conversion_factor: lots_per_pallet,
        current_inventory: 0.0,
        detailed_incoming_inventory: BTreeMap::new(),
        forecast: BTreeMap::new(),
        forecast_error_model: DistributionModel::Norm { mu: 0.0, sigma: 1.0 },
        current_price_per_unit: 10.0,
        percentage_cost_per_unit_excess: 20.0,
        percentage_cost_per_unit_shortage: 50.0,
        mandatory,
        lots_expiration_by_date: BTreeMap::new(),
        suppliers: vec![Supplier {
            external_id:     "SUP".to_string(),
            lead_time_model: DistributionModel::Norm { mu: 0.0, sigma: 1.0 },
            delay_model:     None,
        }],
    }
}

fn curve(lot: u64, stockouts: &[f64]) -> CostCurve {
    let mut curve = CostCurve::new();
    for (i, units) in stockouts.iter().enumerate() {
        curve.insert(
            lot * i as u64,
            CostPoint { stockout_units: *units, waste_units: 0.0, stockout_probability: 0.0 },
        );
    }
    curve
}

struct Case {
    problem: TransferProblem,
    book:    CurveBook,
}

impl Case {
    fn new(capacity: f64) -> Self {
        Self {
            problem: TransferProblem::new("exec-1", "WH01", "WH02", capacity),
            book:    CurveBook::default(),
        }
    }

    fn with(mut self, product: Product, origin: &[f64], destination: &[f64]) -> Self {
        let lot = product.units_per_product_dim;
        self.book.origin.insert(product.sku.clone(), curve(lot, origin));
        self.book.destination.insert(product.sku.clone(), curve(lot, destination));
        self.problem.add_origin_product(product.clone());
        self.problem.add_destination_product(product);
        self
    }

    /// Every transferred lot costs the origin more; the destination wants up to 50.
    fn with_a(self) -> Self {
        self.with(product("A", 10, 2.0, false), &[0.0, 0.5, 1.0, 3.0, 8.0], &[20.0, 12.0, 5.0, 2.0, 1.0, 0.0])
    }

    fn with_mandatory_a(self) -> Self {
        self.with(product("A", 10, 2.0, true), &[0.0, 0.5, 1.0, 3.0, 8.0], &[20.0, 12.0, 5.0, 2.0, 1.0, 0.0])
    }

    /// Mandatory, but shipping only ever costs more.
    fn with_b(self) -> Self {
        self.with(product("B", 5, 4.0, true), &[0.0, 2.0, 6.0], &[1.0, 1.0, 1.0])
    }
}

#[test]
fn destination_shortfall_alone_does_not_move_stock() {
    // Cost is priced on the origin curve only.
    let case = Case::new(100.0).with(product("X", 10, 2.0, false), &[0.0, 1.0, 2.0], &[10.0, 5.0, 0.0]);
    let config = OptimizerConfig::default();
    let allocation = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap();
    assert_eq!(allocation.get("X"), Some(0));
    assert_eq!(allocation.expected_cost, 0.0);
}

#[test]
fn mandatory_flag_is_read_from_the_origin_record() {
    let mut case = Case::new(100.0).with(product("M", 10, 2.0, false), &[0.0, 1.0, 2.0], &[10.0, 5.0, 0.0]);
    case.problem.destination_products.get_mut("M").unwrap().mandatory = true;
    let config = OptimizerConfig::default();
    let optimizer = TransshipmentOptimizer::new(&case.problem, &case.book, &config);
    assert!(!optimizer.plans()[0].mandatory);
    assert_eq!(optimizer.solve().unwrap().get("M"), Some(0));
}

#[test]
fn candidates_come_from_the_shorter_curve() {
    let case = Case::new(100.0).with_a();
    let config = OptimizerConfig::default();
    let optimizer = TransshipmentOptimizer::new(&case.problem, &case.book, &config);
    let plan = &optimizer.plans()[0];
    let quantities: Vec<u64> = plan.candidates.iter().map(|c| c.quantity).collect();
    assert_eq!(quantities, vec![0, 10, 20, 30, 40]);
    assert_eq!(plan.candidates[0].cost, 0.0);
    assert!((plan.candidates[1].cost - 2.5).abs() < 1e-9);
    assert!((plan.candidates[4].cost - 40.0).abs() < 1e-9);
}

#[test]
fn closed_transport_units_force_whole_pallets() {
    let mut case = Case::new(100.0).with_a();
    case.problem.mandatory_closed_transport_units = 1;
    let config = OptimizerConfig::default();
    let allocation = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap();
    // One pallet is 20 units of A: the cheapest whole-pallet quantity.
    assert_eq!(allocation.get("A"), Some(20));
    assert!((allocation.expected_cost - 5.0).abs() < 1e-6);
}

#[test]
fn impossible_closed_floor_is_unsolved() {
    let mut case = Case::new(0.5).with_a();
    case.problem.mandatory_closed_transport_units = 1;
    let config = OptimizerConfig::default();
    let err = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap_err();
    assert!(matches!(err, TransshipError::Unsolved { .. }));
}

#[test]
fn mandatory_product_ships_at_least_one_lot() {
    let case = Case::new(100.0).with_a().with_b();
    let config = OptimizerConfig::default();
    let allocation = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap();
    assert_eq!(allocation.get("A"), Some(0));
    assert_eq!(allocation.get("B"), Some(5));
    assert!(allocation.left_behind.is_empty());
    assert!((allocation.expected_cost - 10.0).abs() < 1e-6);
}

#[test]
fn mandatory_product_without_room_is_left_behind() {
    let case = Case::new(0.0).with_b();
    let config = OptimizerConfig::default();
    let allocation = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap();
    assert_eq!(allocation.get("B"), Some(0));
    assert_eq!(allocation.left_behind, vec!["B".to_string()]);
}

#[test]
fn capacity_shortfall_leaves_the_costlier_mandatory_product_behind() {
    // A needs 0.5 pallets and costs 2.5, B needs 0.25 and costs 10: only one fits.
    let case = Case::new(0.5).with_mandatory_a().with_b();
    let config = OptimizerConfig::default();
    let allocation = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap();
    assert_eq!(allocation.get("A"), Some(10));
    assert_eq!(allocation.get("B"), Some(0));
    assert_eq!(allocation.left_behind, vec!["B".to_string()]);
}

#[test]
fn penalty_dominates_every_feasible_cost() {
    let case = Case::new(100.0).with_a().with_b();
    let config = OptimizerConfig::default();
    let optimizer = TransshipmentOptimizer::new(&case.problem, &case.book, &config);
    let worst: f64 = optimizer
        .plans()
        .iter()
        .map(|p| p.candidates.iter().map(|c| c.cost).fold(0.0, f64::max))
        .sum();
    assert!(optimizer.penalty() > worst);
}

#[test]
fn selection_respects_capacity_across_products() {
    let case = Case::new(0.75).with_mandatory_a().with_b();
    let config = OptimizerConfig::default();
    let optimizer = TransshipmentOptimizer::new(&case.problem, &case.book, &config);
    let allocation = optimizer.solve().unwrap();

    let mut volume = 0.0;
    for plan in optimizer.plans() {
        let quantity = allocation.get(&plan.sku).unwrap();
        assert!(plan.candidates.iter().any(|c| c.quantity == quantity));
        volume += plan.pallet_equivalents(quantity);
    }
    assert!(volume <= 0.75 + 1e-9);
    assert_eq!(allocation.get("A"), Some(10));
    assert_eq!(allocation.get("B"), Some(5));
    assert!(allocation.left_behind.is_empty());
}

#[test]
fn products_missing_a_side_or_skipped_are_ineligible() {
    let mut case = Case::new(100.0).with_a().with_b();
    case.problem.add_origin_product(product("ONLY-ORIGIN", 10, 2.0, false));
    case.problem.add_destination_product(product("ONLY-DEST", 10, 2.0, false));
    case.book.skipped.push(SkippedProduct { sku: "B".to_string(), reason: "perishable".to_string() });

    let config = OptimizerConfig::default();
    let optimizer = TransshipmentOptimizer::new(&case.problem, &case.book, &config);
    let ineligible: Vec<&str> = optimizer.ineligible().iter().map(|i| i.sku.as_str()).collect();
    assert_eq!(ineligible, vec!["B", "ONLY-ORIGIN", "ONLY-DEST"]);

    let allocation = optimizer.solve().unwrap();
    assert_eq!(allocation.len(), 1);
    assert_eq!(allocation.get("B"), None);
}

#[test]
fn nothing_eligible_gives_an_empty_allocation() {
    let case = Case::new(10.0);
    let config = OptimizerConfig::default();
    let allocation = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap();
    assert!(allocation.is_empty());

    let mut case = Case::new(10.0);
    case.problem.mandatory_closed_transport_units = 2;
    let err = TransshipmentOptimizer::new(&case.problem, &case.book, &config).solve().unwrap_err();
    assert!(matches!(err, TransshipError::Unsolved { .. }));
}
