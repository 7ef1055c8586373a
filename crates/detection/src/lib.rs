//! Argus Detection Pipeline
//!
//! Synchronous building blocks of a surveillance cycle:
//!
//! - **Event Buffer**: bounded FIFO window of recent trade events
//! - **Feature Extraction**: per participant/instrument/window behavioral vectors
//! - **Baselines**: batch-local mean / std / P95 per tracked feature
//! - **Rule Engine**: declarative threshold rules -> alerts
//! - **Anomaly Scoring**: pluggable outlier model (isolation forest by default)
//! - **Explainability**: evidence for features above their market P95
//!
//! ## Data flow
//!
//! ```text
//! TradeEvents ──► EventBuffer ──► FeatureExtractor ──► FeatureVectors
//!                                                          │
//!                        ┌─────────────────┬───────────────┼──────────────┐
//!                        ▼                 ▼               ▼              ▼
//!                 BaselineTracker    AnomalyScorer     RuleEngine    explain()
//!                  (explanations)    (score 0..1)      (alerts)     (evidence)
//! ```
//!
//! Nothing in this crate blocks or performs I/O except rule loading.

pub mod baseline;
pub mod buffer;
pub mod error;
pub mod explain;
pub mod features;
pub mod rules;
pub mod scorer;

// Re-export main types
pub use baseline::{BaselineTracker, FeatureStats};
pub use buffer::{DEFAULT_BUFFER_CAPACITY, EventBuffer};
pub use error::{Result, RuleError};
pub use explain::explain;
pub use features::{DEFAULT_WINDOW_NS, FeatureConfig, FeatureExtractor};
pub use rules::{Condition, Operator, Predicate, Rule, RuleDefinition, RuleEngine};
pub use scorer::{AnomalyScorer, IsolationForest, IsolationForestConfig};
