use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransshipError {
    #[error("Invalid distribution: {reason}")]
    InvalidDistribution { reason: String },

    #[error("Distribution '{kind}' is not supported")]
    UnsupportedDistribution { kind: String },

    #[error("Invalid product '{sku}': {reason}")]
    InvalidProduct { sku: String, reason: String },

    #[error("Invalid date key '{key}' for product '{sku}': expected YYYY-MM-DD")]
    InvalidDate { sku: String, key: String },

    #[error("The model could not be solved: {reason}")]
    Unsolved { reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransshipError {
    pub fn invalid_distribution(reason: impl Into<String>) -> Self {
        Self::InvalidDistribution { reason: reason.into() }
    }

    pub fn invalid_product(sku: &str, reason: impl Into<String>) -> Self {
        Self::InvalidProduct { sku: sku.to_string(), reason: reason.into() }
    }
}

pub type TransshipResult<T> = Result<T, TransshipError>;
