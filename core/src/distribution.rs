//! Distribution descriptors.
//!
//! A descriptor is the tagged JSON record `{"distribution": <kind>, ...}`
//! attached to forecast-error and lead-time models. Deserialization goes
//! through `TryFrom<Value>` so a malformed descriptor is rejected with the
//! same error the generator constructor would raise.

use crate::error::{TransshipError, TransshipResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The closed set of distribution kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Norm,
    Disc,
    WeightedDiscrete,
}

impl DistributionKind {
    pub fn from_code(code: &str) -> TransshipResult<Self> {
        match code {
            "NORM"              => Ok(Self::Norm),
            "DISC"              => Ok(Self::Disc),
            "WEIGHTED_DISCRETE" => Ok(Self::WeightedDiscrete),
            other => Err(TransshipError::UnsupportedDistribution { kind: other.to_string() }),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Norm             => "NORM",
            Self::Disc             => "DISC",
            Self::WeightedDiscrete => "WEIGHTED_DISCRETE",
        }
    }

    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Norm             => &["mu", "sigma"],
            Self::Disc             => &["values"],
            Self::WeightedDiscrete => &["prob_value_pairs"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", try_from = "Value")]
pub enum DistributionModel {
    /// Normal error around the center, truncated at zero.
    /// `mu` is carried for compatibility; sampling always uses a zero offset.
    #[serde(rename = "NORM")]
    Norm { mu: f64, sigma: f64 },

    /// Observed forecast errors, smoothed through a KDE.
    #[serde(rename = "DISC")]
    Disc { values: Vec<f64> },

    /// Explicit offset -> probability mass. Keys stay as written so that
    /// non-numeric keys can be reported when the generator is built.
    #[serde(rename = "WEIGHTED_DISCRETE")]
    WeightedDiscrete { prob_value_pairs: BTreeMap<String, f64> },
}

impl DistributionModel {
    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Norm { .. }             => DistributionKind::Norm,
            Self::Disc { .. }             => DistributionKind::Disc,
            Self::WeightedDiscrete { .. } => DistributionKind::WeightedDiscrete,
        }
    }
}

impl TryFrom<Value> for DistributionModel {
    type Error = TransshipError;

    fn try_from(value: Value) -> TransshipResult<Self> {
        let code = value
            .get("distribution")
            .and_then(Value::as_str)
            .ok_or_else(|| TransshipError::invalid_distribution("missing 'distribution' kind"))?;
        let kind = DistributionKind::from_code(code)?;

        for param in kind.required_params() {
            if value.get(*param).map_or(true, Value::is_null) {
                return Err(TransshipError::invalid_distribution(format!(
                    "parameter '{param}' is missing in the {} model",
                    kind.code()
                )));
            }
        }

        let model = match kind {
            DistributionKind::Norm => Self::Norm {
                mu:    number_param(&value, kind, "mu")?,
                sigma: number_param(&value, kind, "sigma")?,
            },
            DistributionKind::Disc => Self::Disc {
                values: typed_param(&value, kind, "values")?,
            },
            DistributionKind::WeightedDiscrete => Self::WeightedDiscrete {
                prob_value_pairs: typed_param(&value, kind, "prob_value_pairs")?,
            },
        };
        Ok(model)
    }
}

fn number_param(value: &Value, kind: DistributionKind, name: &str) -> TransshipResult<f64> {
    value[name].as_f64().ok_or_else(|| {
        TransshipError::invalid_distribution(format!(
            "parameter '{name}' of the {} model must be a number",
            kind.code()
        ))
    })
}

fn typed_param<T: serde::de::DeserializeOwned>(
    value: &Value,
    kind: DistributionKind,
    name: &str,
) -> TransshipResult<T> {
    serde_json::from_value(value[name].clone()).map_err(|e| {
        TransshipError::invalid_distribution(format!(
            "parameter '{name}' of the {} model is malformed: {e}",
            kind.code()
        ))
    })
}
