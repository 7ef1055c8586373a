//! Argus surveillance engine
//!
//! Wires the detection pipeline into a running service: trade ingestion,
//! the per-batch detection cycle, case management and live fan-out of raw
//! trades and newly opened cases.
//!
//! ```text
//! TradeRecord batch ──► ingest ──► SurveillanceEngine::process_batch
//!                                     │            │
//!                          trade hub ◄┘            └► detection ──► CaseManager
//!                              │                                      │
//!                         subscribers                        case hub ┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod scenario;

pub use config::EngineConfig;
pub use engine::{CycleReport, SurveillanceEngine};
pub use error::{ConfigError, EngineError, IngestError, Result};
pub use hub::{BroadcastHub, SubscriberId, Subscription};
pub use ingest::{IngestAck, TradeRecord};
pub use scenario::Scenario;
