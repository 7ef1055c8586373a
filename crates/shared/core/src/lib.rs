//! Argus Core Domain
//!
//! Pure domain types for the Argus market surveillance engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod signals;

// Re-export commonly used types at crate root
pub use entities::{
    // Investigation cases
    Case,
    CaseAction,
    CaseEvent,
    CaseId,
    CaseStatus,
    Priority,
    SYSTEM_ACTOR,
    // Market events
    EventTimeNs,
    Side,
    TradeEvent,
};
pub use signals::{Alert, AlertSeverity, CaseAlert, Evidence, Feature, FeatureVector, MetricMap};
