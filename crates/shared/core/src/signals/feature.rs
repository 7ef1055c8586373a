use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::entities::EventTimeNs;

/// Metric name to value, as seen by the rule engine and the explainer
pub type MetricMap = HashMap<String, f64>;

/// Named behavioral features computed per (participant, instrument, window)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Execution count (cancels excluded)
    NumTrades,
    BuySellRatio,
    AvgQuantity,
    MaxQuantity,
    VenueSwitchCount,
    CancelRatio,
    QuantityPercentile,
    SelfTradeRatio,
    WashVolumeRatio,
    AnomalyScore,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::NumTrades,
        Feature::BuySellRatio,
        Feature::AvgQuantity,
        Feature::MaxQuantity,
        Feature::VenueSwitchCount,
        Feature::CancelRatio,
        Feature::QuantityPercentile,
        Feature::SelfTradeRatio,
        Feature::WashVolumeRatio,
        Feature::AnomalyScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::NumTrades => "num_trades",
            Feature::BuySellRatio => "buy_sell_ratio",
            Feature::AvgQuantity => "avg_quantity",
            Feature::MaxQuantity => "max_quantity",
            Feature::VenueSwitchCount => "venue_switch_count",
            Feature::CancelRatio => "cancel_ratio",
            Feature::QuantityPercentile => "quantity_percentile",
            Feature::SelfTradeRatio => "self_trade_ratio",
            Feature::WashVolumeRatio => "wash_volume_ratio",
            Feature::AnomalyScore => "anomaly_score",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Behavioral feature vector for one (participant, instrument, window) bucket.
///
/// Produced fresh every cycle. Only the scorer writes `anomaly_score` after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub participant_id: String,
    pub instrument: String,
    pub window_start_ns: EventTimeNs,
    pub num_trades: u64,
    pub buy_sell_ratio: f64,
    pub avg_quantity: f64,
    pub max_quantity: f64,
    pub venue_switch_count: u64,
    /// Always within [0, 1]
    pub cancel_ratio: f64,
    /// Coarse staircase bucket, not an empirical percentile
    pub quantity_percentile: f64,
    pub self_trade_ratio: f64,
    pub wash_volume_ratio: f64,
    pub anomaly_score: f64,
}

impl FeatureVector {
    /// Empty vector for a bucket key; the extractor fills in the metrics
    pub fn new(
        participant_id: impl Into<String>,
        instrument: impl Into<String>,
        window_start_ns: EventTimeNs,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            instrument: instrument.into(),
            window_start_ns,
            num_trades: 0,
            buy_sell_ratio: 0.0,
            avg_quantity: 0.0,
            max_quantity: 0.0,
            venue_switch_count: 0,
            cancel_ratio: 0.0,
            quantity_percentile: 0.0,
            self_trade_ratio: 0.0,
            wash_volume_ratio: 0.0,
            anomaly_score: 0.0,
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::NumTrades => self.num_trades as f64,
            Feature::BuySellRatio => self.buy_sell_ratio,
            Feature::AvgQuantity => self.avg_quantity,
            Feature::MaxQuantity => self.max_quantity,
            Feature::VenueSwitchCount => self.venue_switch_count as f64,
            Feature::CancelRatio => self.cancel_ratio,
            Feature::QuantityPercentile => self.quantity_percentile,
            Feature::SelfTradeRatio => self.self_trade_ratio,
            Feature::WashVolumeRatio => self.wash_volume_ratio,
            Feature::AnomalyScore => self.anomaly_score,
        }
    }

    /// Look up a feature by metric name. Unknown names and NaN values are `None`.
    pub fn value(&self, name: &str) -> Option<f64> {
        let feature = name.parse::<Feature>().ok()?;
        let value = self.get(feature);
        (!value.is_nan()).then_some(value)
    }

    /// All numeric metrics keyed by name
    pub fn metrics(&self) -> MetricMap {
        Feature::ALL
            .iter()
            .map(|f| (f.name().to_string(), self.get(*f)))
            .collect()
    }
}
