//! Engine errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Rejection reasons for an ingested trade record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("Unknown side {side:?} on order {order_id}")]
    UnknownSide { side: String, order_id: String },

    #[error("Negative quantity on order {order_id}")]
    NegativeQuantity { order_id: String },

    #[error("Negative price on order {order_id}")]
    NegativePrice { order_id: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rules(#[from] argus_detection::RuleError),

    #[error(transparent)]
    Case(#[from] argus_case_manager::CaseError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
