//! Case Manager errors

use argus_core::{CaseAction, CaseId, CaseStatus};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseError {
    #[error("Case not found: {0}")]
    NotFound(CaseId),

    #[error("Case {case_id} is {from}, cannot apply {action}")]
    InvalidTransition {
        case_id: CaseId,
        from: CaseStatus,
        action: CaseAction,
    },

    #[error("Closing case {0} requires a resolution")]
    MissingResolution(CaseId),
}

pub type Result<T> = std::result::Result<T, CaseError>;
