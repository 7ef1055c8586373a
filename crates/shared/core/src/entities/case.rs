use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::signals::CaseAlert;

/// Unique identifier for an investigation case
pub type CaseId = Uuid;

/// Actor recorded on audit events raised by the engine itself
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Case lifecycle status. Transitions only move forward:
/// `Open -> Investigate -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    /// Opened by the engine, not yet picked up
    Open,
    /// An analyst is working the case
    Investigate,
    /// Resolved by an analyst
    Closed,
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Closed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseStatus::Open => "OPEN",
            CaseStatus::Investigate => "INVESTIGATE",
            CaseStatus::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// Audit action tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseAction {
    CaseOpened,
    InvestigationStarted,
    CaseClosed,
}

impl fmt::Display for CaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseAction::CaseOpened => "CASE_OPENED",
            CaseAction::InvestigationStarted => "INVESTIGATION_STARTED",
            CaseAction::CaseClosed => "CASE_CLOSED",
        };
        f.write_str(s)
    }
}

/// One append-only entry of a case's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvent {
    pub timestamp: DateTime<Utc>,
    /// `SYSTEM` or an analyst identifier
    pub actor: String,
    pub action: CaseAction,
    pub detail: serde_json::Value,
}

impl CaseEvent {
    pub fn new(actor: impl Into<String>, action: CaseAction, detail: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action,
            detail,
        }
    }
}

/// Investigation case opened when detection signals cross policy thresholds.
///
/// Owned by the case manager; everything else sees clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub participant_id: String,
    pub instrument: String,
    pub status: CaseStatus,
    pub priority: Priority,
    /// Anomaly score of the feature vector that triggered the case
    pub anomaly_score: f64,
    pub created_at: DateTime<Utc>,
    /// Audit trail, oldest first
    pub events: Vec<CaseEvent>,
    pub resolution: Option<String>,
    /// Rule alerts and explanation evidence that triggered the case
    pub alerts: Vec<CaseAlert>,
}

impl Case {
    /// Number of rule alerts, excluding explanation evidence
    pub fn rule_alert_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| matches!(a, CaseAlert::Rule(_)))
            .count()
    }

    /// Whether any rule alert of the given type triggered this case
    pub fn has_alert_type(&self, alert_type: &str) -> bool {
        self.alerts.iter().any(|a| match a {
            CaseAlert::Rule(alert) => alert.alert_type == alert_type,
            CaseAlert::Explanation(_) => false,
        })
    }

    pub fn last_event(&self) -> Option<&CaseEvent> {
        self.events.last()
    }
}
