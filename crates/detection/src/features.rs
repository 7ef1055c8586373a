//! Feature Extraction
//!
//! Groups buffered trade events into (participant, instrument, window) buckets
//! and computes one behavioral feature vector per bucket:
//!
//! - **cancel_ratio**: cancels / (cancels + executions)
//! - **avg_quantity**: mean execution size
//! - **max_quantity**: largest size over all events, cancels included, since
//!   spoofing probes are usually pulled before they fill
//! - **venue_switch_count**: distinct venues touched
//! - **quantity_percentile**: staircase bucket of `max_quantity`
//! - **self_trade_ratio / wash_volume_ratio**: balanced-flow heuristics
//!
//! The extractor is stateless: the same window always yields the same vectors.

use argus_core::{EventTimeNs, FeatureVector, Side, TradeEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Default aggregation window (5 minutes)
pub const DEFAULT_WINDOW_NS: i64 = 5 * 60 * 1_000_000_000;

/// Calibration constants for the size staircase and the wash-trade heuristics.
///
/// These are uncalibrated product thresholds; defaults reproduce the
/// production detection behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// `max_quantity` at or below this maps to `percentile_low`
    pub percentile_low_max: f64,
    /// `max_quantity` at or below this (and above low) maps to `percentile_mid`
    pub percentile_mid_max: f64,
    pub percentile_low: f64,
    pub percentile_mid: f64,
    pub percentile_high: f64,
    /// Max distance of buy/sell ratio from 1.0 to count as balanced
    pub balance_tolerance: f64,
    /// Coefficient of variation below which execution sizes count as uniform
    pub uniformity_max_cv: f64,
    /// Executions needed before balanced flow counts as wash volume
    pub wash_min_executions: u64,
    /// Value written to the self-trade/wash ratios when a heuristic fires
    pub flag_value: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            percentile_low_max: 1.0,
            percentile_mid_max: 5.0,
            percentile_low: 50.0,
            percentile_mid: 80.0,
            percentile_high: 99.0,
            balance_tolerance: 0.2,
            uniformity_max_cv: 0.1,
            wash_min_executions: 4,
            flag_value: 0.5,
        }
    }
}

impl FeatureConfig {
    /// Map a bucket's max size onto the fixed percentile staircase
    pub fn quantity_percentile(&self, max_quantity: f64) -> f64 {
        if max_quantity > self.percentile_mid_max {
            self.percentile_high
        } else if max_quantity > self.percentile_low_max {
            self.percentile_mid
        } else {
            self.percentile_low
        }
    }
}

type BucketKey = (String, String, EventTimeNs);

/// Stateless windowed feature extractor
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    window_ns: i64,
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(window_ns: i64, config: FeatureConfig) -> Self {
        Self {
            window_ns: window_ns.max(1),
            config,
        }
    }

    pub fn window_ns(&self) -> i64 {
        self.window_ns
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Start of the epoch-aligned window containing `event_time_ns`
    pub fn window_start(&self, event_time_ns: EventTimeNs) -> EventTimeNs {
        event_time_ns - event_time_ns.rem_euclid(self.window_ns)
    }

    /// Compute one feature vector per non-empty bucket, ordered by
    /// (participant, instrument, window start).
    pub fn extract<'a, I>(&self, events: I) -> Vec<FeatureVector>
    where
        I: IntoIterator<Item = &'a TradeEvent>,
    {
        let mut buckets: BTreeMap<BucketKey, Vec<&TradeEvent>> = BTreeMap::new();
        for event in events {
            let key = (
                event.participant_id.clone(),
                event.instrument.clone(),
                self.window_start(event.event_time_ns),
            );
            buckets.entry(key).or_default().push(event);
        }

        buckets
            .into_iter()
            .map(|((participant, instrument, window_start), events)| {
                self.compute(participant, instrument, window_start, &events)
            })
            .collect()
    }

    fn compute(
        &self,
        participant: String,
        instrument: String,
        window_start: EventTimeNs,
        events: &[&TradeEvent],
    ) -> FeatureVector {
        let mut fv = FeatureVector::new(participant, instrument, window_start);

        let mut buys = 0u64;
        let mut sells = 0u64;
        let mut cancels = 0u64;
        let mut execution_sizes = Vec::with_capacity(events.len());
        let mut venues = HashSet::new();
        let mut max_quantity = f64::NEG_INFINITY;

        for event in events {
            let quantity = event.quantity_f64();
            max_quantity = max_quantity.max(quantity);
            venues.insert(event.venue.as_str());
            match event.side {
                Side::Buy => buys += 1,
                Side::Sell => sells += 1,
                Side::Cancel => cancels += 1,
            }
            if event.side.is_execution() {
                execution_sizes.push(quantity);
            }
        }

        let executions = buys + sells;
        let total = cancels + executions;

        fv.num_trades = executions;
        fv.cancel_ratio = if total > 0 {
            cancels as f64 / total as f64
        } else {
            0.0
        };
        fv.avg_quantity = mean(&execution_sizes).unwrap_or(0.0);
        fv.max_quantity = if max_quantity.is_finite() {
            max_quantity
        } else {
            0.0
        };
        fv.venue_switch_count = venues.len() as u64;
        fv.quantity_percentile = self.config.quantity_percentile(fv.max_quantity);
        fv.buy_sell_ratio = buys as f64 / sells.max(1) as f64;

        let balanced = (fv.buy_sell_ratio - 1.0).abs() < self.config.balance_tolerance;
        let uniform = coefficient_of_variation(&execution_sizes)
            .is_some_and(|cv| cv < self.config.uniformity_max_cv);

        if balanced && uniform {
            fv.self_trade_ratio = self.config.flag_value;
        }
        if balanced && executions >= self.config.wash_min_executions {
            fv.wash_volume_ratio = self.config.flag_value;
        }

        fv
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_NS, FeatureConfig::default())
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample std / mean. `None` when undefined (no executions, or a single
/// execution with positive size); a non-positive mean counts as zero spread.
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    if mean <= 0.0 {
        return Some(0.0);
    }
    if values.len() < 2 {
        return None;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt() / mean)
}
