//! Market Baselines
//!
//! Descriptive statistics (mean, sample standard deviation, 95th percentile)
//! per tracked feature, recomputed from the current batch of feature vectors.
//! Baselines only feed explanations; they never gate detection.

use argus_core::FeatureVector;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Baseline statistics for a single feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    /// Sample standard deviation; 0 when fewer than two observations
    pub std: f64,
    pub p95: f64,
}

impl FeatureStats {
    /// Compute stats over a set of observations. `None` if empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() < 2 {
            0.0
        } else {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            mean,
            std,
            p95: quantile(&sorted, 0.95),
        })
    }

    /// Degenerate baselines (no spread) cannot express a deviation
    pub fn is_degenerate(&self) -> bool {
        self.std.is_nan() || self.std <= 0.0
    }
}

/// Linear-interpolated quantile over sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Tracks the latest baseline per feature, in first-tracked order
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    baselines: IndexMap<String, FeatureStats>,
}

impl BaselineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline of every tracked feature present in the batch.
    /// Features absent from the batch keep their previous baseline.
    pub fn update(
        &mut self,
        vectors: &[FeatureVector],
        tracked: &[String],
    ) -> &IndexMap<String, FeatureStats> {
        for name in tracked {
            let values: Vec<f64> = vectors.iter().filter_map(|fv| fv.value(name)).collect();
            if let Some(stats) = FeatureStats::from_values(&values) {
                self.baselines.insert(name.clone(), stats);
            }
        }
        &self.baselines
    }

    pub fn baselines(&self) -> &IndexMap<String, FeatureStats> {
        &self.baselines
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureStats> {
        self.baselines.get(feature)
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(avg_quantity: f64, num_trades: u64) -> FeatureVector {
        let mut fv = FeatureVector::new("p", "BTC-USDT", 0);
        fv.avg_quantity = avg_quantity;
        fv.num_trades = num_trades;
        fv
    }

    fn tracked(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stats_match_sample_definitions() {
        let stats = FeatureStats::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(stats.mean, 3.0);
        assert!((stats.std - 2.5f64.sqrt()).abs() < 1e-12);
        // position 0.95 * 4 = 3.8 -> 4 + 0.8 * (5 - 4)
        assert!((stats.p95 - 4.8).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_is_degenerate() {
        let stats = FeatureStats::from_values(&[7.0]).unwrap();
        assert_eq!(stats.mean, 7.0);
        assert_eq!(stats.p95, 7.0);
        assert!(stats.is_degenerate());
        assert!(FeatureStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_update_replaces_batch_local() {
        let mut tracker = BaselineTracker::new();
        let names = tracked(&["avg_quantity"]);

        tracker.update(&[vector(1.0, 1), vector(3.0, 1)], &names);
        assert_eq!(tracker.get("avg_quantity").unwrap().mean, 2.0);

        tracker.update(&[vector(10.0, 1), vector(20.0, 1)], &names);
        assert_eq!(tracker.get("avg_quantity").unwrap().mean, 15.0);
    }

    #[test]
    fn test_absent_features_keep_previous_value() {
        let mut tracker = BaselineTracker::new();
        tracker.update(&[vector(1.0, 2), vector(3.0, 4)], &tracked(&["num_trades"]));
        let before = *tracker.get("num_trades").unwrap();

        // unknown metric names and empty batches leave baselines untouched
        tracker.update(&[vector(9.0, 9)], &tracked(&["not_a_feature"]));
        tracker.update(&[], &tracked(&["num_trades"]));

        assert_eq!(*tracker.get("num_trades").unwrap(), before);
        assert!(tracker.get("not_a_feature").is_none());
    }

    #[test]
    fn test_iteration_follows_tracking_order() {
        let mut tracker = BaselineTracker::new();
        let names = tracked(&["num_trades", "avg_quantity", "buy_sell_ratio"]);
        tracker.update(&[vector(1.0, 1)], &names);

        let keys: Vec<&str> = tracker.baselines().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["num_trades", "avg_quantity", "buy_sell_ratio"]);
    }
}
