//! Input records for one transfer run.
//!
//! These are built once per run by the ingestion layer (or parsed from a
//! payload file by the runner) and are read-only inside the engine.

use crate::{
    distribution::DistributionModel,
    error::{TransshipError, TransshipResult},
    types::{Sku, DATE_FORMAT},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub external_id:     String,
    pub lead_time_model: DistributionModel,
    #[serde(default)]
    pub delay_model:     Option<serde_json::Value>,
}

/// One SKU at one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub sku:                   Sku,
    #[serde(default)]
    pub warehouse:             String,
    pub desired_service_level: f64,
    /// Origin: days until the next purchase. Destination: days until the next transfer.
    pub days_to_next_review:   u32,
    /// Lot size in units.
    pub units_per_product_dim: u64,
    /// Lots per pallet.
    pub supplier_dim_to_product_dim_conversion_factor: f64,

    pub current_inventory:           f64,
    #[serde(default)]
    pub detailed_incoming_inventory: BTreeMap<String, f64>,

    #[serde(default)]
    pub forecast:             BTreeMap<String, f64>,
    pub forecast_error_model: DistributionModel,

    pub current_price_per_unit:            f64,
    pub percentage_cost_per_unit_excess:   f64,
    /// Cash margin lost per unit short, as a percentage of price.
    pub percentage_cost_per_unit_shortage: f64,

    #[serde(default)]
    pub mandatory:               bool,
    #[serde(default)]
    pub lots_expiration_by_date: BTreeMap<String, f64>,
    #[serde(default)]
    pub suppliers:               Vec<Supplier>,
}

impl Product {
    /// The supplier whose lead time governs the transfer. First in the list.
    pub fn select_supplier(&self) -> TransshipResult<&Supplier> {
        self.suppliers
            .first()
            .ok_or_else(|| TransshipError::invalid_product(&self.sku, "product has no suppliers"))
    }

    pub fn is_perishable(&self) -> bool {
        !self.lots_expiration_by_date.is_empty()
    }

    pub fn lot_size(&self) -> u64 {
        self.units_per_product_dim
    }

    pub fn lots_per_pallet(&self) -> f64 {
        self.supplier_dim_to_product_dim_conversion_factor
    }

    pub fn stockout_cost_per_unit(&self) -> f64 {
        self.percentage_cost_per_unit_shortage / 100.0 * self.current_price_per_unit
    }

    pub fn waste_cost_per_unit(&self) -> f64 {
        self.percentage_cost_per_unit_excess / 100.0 * self.current_price_per_unit
    }

    /// Structural checks the simulator relies on.
    pub fn validate(&self) -> TransshipResult<()> {
        if self.units_per_product_dim == 0 {
            return Err(TransshipError::invalid_product(&self.sku, "units_per_product_dim must be positive"));
        }
        if !(self.supplier_dim_to_product_dim_conversion_factor > 0.0) {
            return Err(TransshipError::invalid_product(
                &self.sku,
                "supplier_dim_to_product_dim_conversion_factor must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.desired_service_level) {
            return Err(TransshipError::invalid_product(
                &self.sku,
                format!("desired_service_level {} is outside [0, 1]", self.desired_service_level),
            ));
        }
        self.select_supplier()?;
        Ok(())
    }

    pub fn forecast_by_date(&self) -> TransshipResult<BTreeMap<NaiveDate, f64>> {
        parse_dated(&self.sku, &self.forecast)
    }

    pub fn incoming_by_date(&self) -> TransshipResult<BTreeMap<NaiveDate, f64>> {
        parse_dated(&self.sku, &self.detailed_incoming_inventory)
    }
}

fn parse_dated(sku: &str, series: &BTreeMap<String, f64>) -> TransshipResult<BTreeMap<NaiveDate, f64>> {
    series
        .iter()
        .map(|(key, value)| {
            NaiveDate::parse_from_str(key, DATE_FORMAT)
                .map(|date| (date, *value))
                .map_err(|_| TransshipError::InvalidDate { sku: sku.to_string(), key: key.clone() })
        })
        .collect()
}

/// One origin -> destination transfer decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferProblem {
    pub execution_id:          String,
    pub origin_warehouse:      String,
    pub destination_warehouse: String,
    pub execution_date:        String,
    /// Lead time of the transfer leg itself.
    #[serde(rename = "transhipment_lead_time", default)]
    pub transfer_lead_time:    Option<DistributionModel>,
    /// Pallets that must travel closed (single product).
    #[serde(default)]
    pub mandatory_closed_transport_units: u32,
    /// Pallet-equivalents the vehicle can carry.
    pub capacity_in_transport_units:      f64,
    #[serde(default, with = "products_by_sku")]
    pub origin_products:      BTreeMap<Sku, Product>,
    #[serde(default, with = "products_by_sku")]
    pub destination_products: BTreeMap<Sku, Product>,
}

impl TransferProblem {
    pub fn new(
        execution_id: impl Into<String>,
        origin_warehouse: impl Into<String>,
        destination_warehouse: impl Into<String>,
        capacity_in_transport_units: f64,
    ) -> Self {
        Self {
            execution_id:          execution_id.into(),
            origin_warehouse:      origin_warehouse.into(),
            destination_warehouse: destination_warehouse.into(),
            execution_date:        String::new(),
            transfer_lead_time:    None,
            mandatory_closed_transport_units: 0,
            capacity_in_transport_units,
            origin_products:       BTreeMap::new(),
            destination_products:  BTreeMap::new(),
        }
    }

    pub fn add_origin_product(&mut self, product: Product) {
        self.origin_products.insert(product.sku.clone(), product);
    }

    pub fn add_destination_product(&mut self, product: Product) {
        self.destination_products.insert(product.sku.clone(), product);
    }

    pub fn from_json_str(json: &str) -> TransshipResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> TransshipResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payloads list products as arrays; the engine keys them by SKU.
mod products_by_sku {
    use super::Product;
    use crate::types::Sku;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        products: &BTreeMap<Sku, Product>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&Product> = products.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Sku, Product>, D::Error> {
        let list = Vec::<Product>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|p| (p.sku.clone(), p)).collect())
    }
}
