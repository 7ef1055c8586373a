mod alert;
mod feature;

pub use alert::{Alert, AlertSeverity, CaseAlert, Evidence};
pub use feature::{Feature, FeatureVector, MetricMap};
