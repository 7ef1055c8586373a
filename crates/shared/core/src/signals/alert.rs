use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Raised once per matching rule per feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub rule_id: String,
    /// e.g. SPOOFING, WASH_TRADING
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub description: String,
}

/// Deviation of an observed feature value from its market baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub feature: String,
    pub value: f64,
    pub market_p95: f64,
    /// (value - mean) / std
    pub deviation_sigma: f64,
    pub description: String,
}

/// Entry in a case's trigger list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseAlert {
    Rule(Alert),
    Explanation(Evidence),
}

impl From<Alert> for CaseAlert {
    fn from(alert: Alert) -> Self {
        CaseAlert::Rule(alert)
    }
}

impl From<Evidence> for CaseAlert {
    fn from(evidence: Evidence) -> Self {
        CaseAlert::Explanation(evidence)
    }
}
