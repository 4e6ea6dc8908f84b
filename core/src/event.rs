//! Structured record of what happened during one transfer run.
//!
//! Events are collected in memory by the engine and returned inside the
//! run report, in the order they occurred.

use crate::types::{Quantity, Role, Sku};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    // ── Engine events ──────────────────────────────
    RunInitialized {
        execution_id: String,
        seed:         u64,
        products:     usize,
    },

    // ── Simulation events ──────────────────────────
    CurveSimulated {
        sku:          Sku,
        role:         Role,
        candidates:   usize,
        sample_size:  usize,
        horizon_days: usize,
    },
    SampleSizeIncreased {
        sku:  Sku,
        role: Role,
        from: usize,
        to:   usize,
    },
    ProductSkipped {
        sku:    Sku,
        reason: String,
    },

    // ── Optimizer events ───────────────────────────
    ProductIneligible {
        sku:    Sku,
        reason: String,
    },
    QuantitySelected {
        sku:      Sku,
        quantity: Quantity,
    },
    MandatoryLeftBehind {
        sku: Sku,
    },
}

impl RunEvent {
    /// Stable name of the variant, matching its serialized `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            RunEvent::RunInitialized { .. }      => "run_initialized",
            RunEvent::CurveSimulated { .. }      => "curve_simulated",
            RunEvent::SampleSizeIncreased { .. } => "sample_size_increased",
            RunEvent::ProductSkipped { .. }      => "product_skipped",
            RunEvent::ProductIneligible { .. }   => "product_ineligible",
            RunEvent::QuantitySelected { .. }    => "quantity_selected",
            RunEvent::MandatoryLeftBehind { .. } => "mandatory_left_behind",
        }
    }
}
