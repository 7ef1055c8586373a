//! Explainability
//!
//! Turns a participant's metrics into plain-language evidence by comparing each
//! baseline feature against its market 95th percentile.

use crate::baseline::FeatureStats;
use argus_core::{Evidence, MetricMap};
use indexmap::IndexMap;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Evidence for every non-degenerate baseline feature whose observed value
/// exceeds the baseline P95, in baseline order.
pub fn explain(metrics: &MetricMap, baselines: &IndexMap<String, FeatureStats>) -> Vec<Evidence> {
    baselines
        .iter()
        .filter_map(|(feature, stats)| {
            let value = *metrics.get(feature)?;
            if stats.is_degenerate() || value.is_nan() || value <= stats.p95 {
                return None;
            }
            let deviation_sigma = (value - stats.mean) / stats.std;
            Some(Evidence {
                feature: feature.clone(),
                value: round_to(value, 3),
                market_p95: round_to(stats.p95, 3),
                deviation_sigma: round_to(deviation_sigma, 2),
                description: format!(
                    "Participant value ({:.2}) exceeded market 95th percentile ({:.2}) by {:.1}x standard deviations.",
                    value, stats.p95, deviation_sigma
                ),
            })
        })
        .collect()
}
