//! Detection errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to read rule definitions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rule definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid rule JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Malformed condition on {metric}: {condition:?}")]
    MalformedCondition { metric: String, condition: String },
}

pub type Result<T> = std::result::Result<T, RuleError>;
