//! Argus Case Manager
//!
//! Sole owner of investigation cases. Cases are opened by the detection cycle
//! and moved forward by analysts:
//!
//! ```text
//! OPEN ──start_investigation──► INVESTIGATE ──close_case──► CLOSED
//! ```
//!
//! Every successful operation appends exactly one audit event. Other
//! components only ever see clones.

pub mod error;
pub mod manager;

pub use error::{CaseError, Result};
pub use manager::CaseManager;
