//! Shared primitive types used across the whole engine.

use serde::{Deserialize, Serialize};

/// A product identifier, unique within one warehouse.
pub type Sku = String;

/// A transfer quantity in product units. Always a multiple of the lot size.
pub type Quantity = u64;

/// The ISO date format every forecast and inventory key uses.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Which side of the transfer a simulation runs for.
///
/// The discriminant doubles as the stable RNG stream slot.
/// NEVER reorder: reordering changes every product's stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u64)]
pub enum Role {
    /// Net sender: inventory drops by the transferred quantity.
    Origin = 0,
    /// Net receiver: inventory grows by the transferred quantity.
    Destination = 1,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Origin      => "origin",
            Self::Destination => "destination",
        }
    }

    /// Signed inventory change for a transfer of `quantity`.
    pub fn inventory_delta(&self, quantity: Quantity) -> f64 {
        match self {
            Self::Origin      => -(quantity as f64),
            Self::Destination => quantity as f64,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
