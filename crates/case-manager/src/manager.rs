//! Case lifecycle state machine
//!
//! Cases live in a `DashMap`, so reads from UI-facing queries run concurrently
//! with the detection cycle. Each mutation holds the shard guard for one case
//! only for the duration of the transition.

use crate::error::{CaseError, Result};
use argus_core::{
    Case, CaseAction, CaseAlert, CaseEvent, CaseId, CaseStatus, Priority, SYSTEM_ACTOR,
};
use chrono::Utc;
use dashmap::DashMap;
use log::info;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct CaseManager {
    cases: DashMap<CaseId, Case>,
}

impl CaseManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new case in `OPEN` status with a `CASE_OPENED` audit event
    pub fn open_case(
        &self,
        participant_id: &str,
        instrument: &str,
        alerts: Vec<CaseAlert>,
        anomaly_score: f64,
        priority: Priority,
    ) -> Case {
        let case = Case {
            id: Uuid::new_v4(),
            participant_id: participant_id.to_string(),
            instrument: instrument.to_string(),
            status: CaseStatus::Open,
            priority,
            anomaly_score,
            created_at: Utc::now(),
            events: vec![CaseEvent::new(
                SYSTEM_ACTOR,
                CaseAction::CaseOpened,
                json!({
                    "alert_count": alerts.len(),
                    "trigger_score": anomaly_score,
                }),
            )],
            resolution: None,
            alerts,
        };

        info!(
            "Opened case {} for {} on {} ({}, score {:.3})",
            case.id, case.participant_id, case.instrument, case.priority, case.anomaly_score
        );
        self.cases.insert(case.id, case.clone());
        case
    }

    /// Move an `OPEN` case to `INVESTIGATE`.
    ///
    /// Calling this again on a case already under investigation appends another
    /// `INVESTIGATION_STARTED` event without changing state. Closed cases are
    /// rejected.
    pub fn start_investigation(&self, case_id: CaseId, analyst_id: &str) -> Result<Case> {
        let mut case = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::NotFound(case_id))?;

        if case.status.is_terminal() {
            return Err(CaseError::InvalidTransition {
                case_id,
                from: case.status,
                action: CaseAction::InvestigationStarted,
            });
        }

        case.status = CaseStatus::Investigate;
        case.events.push(CaseEvent::new(
            analyst_id,
            CaseAction::InvestigationStarted,
            json!({}),
        ));

        info!("Case {} under investigation by {}", case_id, analyst_id);
        Ok(case.clone())
    }

    /// Close a case under investigation with a resolution
    pub fn close_case(&self, case_id: CaseId, analyst_id: &str, resolution: &str) -> Result<Case> {
        let mut case = self
            .cases
            .get_mut(&case_id)
            .ok_or(CaseError::NotFound(case_id))?;

        if case.status != CaseStatus::Investigate {
            return Err(CaseError::InvalidTransition {
                case_id,
                from: case.status,
                action: CaseAction::CaseClosed,
            });
        }
        if resolution.trim().is_empty() {
            return Err(CaseError::MissingResolution(case_id));
        }

        case.status = CaseStatus::Closed;
        case.resolution = Some(resolution.to_string());
        case.events.push(CaseEvent::new(
            analyst_id,
            CaseAction::CaseClosed,
            json!({ "resolution": resolution }),
        ));

        info!("Case {} closed by {}: {}", case_id, analyst_id, resolution);
        Ok(case.clone())
    }

    pub fn get(&self, case_id: CaseId) -> Option<Case> {
        self.cases.get(&case_id).map(|c| c.clone())
    }

    /// All cases, newest first
    pub fn list(&self) -> Vec<Case> {
        let mut cases: Vec<Case> = self.cases.iter().map(|c| c.clone()).collect();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        cases
    }

    pub fn list_by_status(&self, status: CaseStatus) -> Vec<Case> {
        self.list()
            .into_iter()
            .filter(|c| c.status == status)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::{Alert, AlertSeverity};
    use std::sync::Arc;

    fn spoofing_alert() -> CaseAlert {
        CaseAlert::Rule(Alert {
            rule_id: "SPOOF-001".to_string(),
            alert_type: "SPOOFING".to_string(),
            severity: AlertSeverity::High,
            description: "High cancel ratio".to_string(),
        })
    }

    fn open(manager: &CaseManager) -> Case {
        manager.open_case(
            "TestTrader",
            "BTC-USDT",
            vec![spoofing_alert()],
            0.85,
            Priority::High,
        )
    }

    #[test]
    fn test_open_case() {
        let manager = CaseManager::new();
        let case = open(&manager);

        assert_eq!(case.participant_id, "TestTrader");
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.priority, Priority::High);
        assert_eq!(case.alerts.len(), 1);
        assert_eq!(case.events.len(), 1);

        let opened = &case.events[0];
        assert_eq!(opened.actor, SYSTEM_ACTOR);
        assert_eq!(opened.action, CaseAction::CaseOpened);
        assert_eq!(opened.detail["alert_count"], 1);
        assert_eq!(opened.detail["trigger_score"], 0.85);
        assert!(case.has_alert_type("SPOOFING"));
    }

    #[test]
    fn test_case_lifecycle() {
        let _ = env_logger::try_init();
        let manager = CaseManager::new();
        let case = manager.open_case("TestTrader", "BTC-USDT", vec![], 0.75, Priority::Medium);

        let investigating = manager.start_investigation(case.id, "analyst_001").unwrap();
        assert_eq!(investigating.status, CaseStatus::Investigate);
        assert_eq!(investigating.events.len(), 2);
        assert_eq!(investigating.events[1].actor, "analyst_001");
        assert_eq!(
            investigating.events[1].action,
            CaseAction::InvestigationStarted
        );

        let closed = manager
            .close_case(case.id, "analyst_001", "False positive")
            .unwrap();
        assert_eq!(closed.status, CaseStatus::Closed);
        assert_eq!(closed.resolution.as_deref(), Some("False positive"));
        assert_eq!(closed.events.len(), 3);
        assert_eq!(closed.events[2].detail["resolution"], "False positive");

        // stored copy matches what callers were handed
        let stored = manager.get(case.id).unwrap();
        assert_eq!(stored.status, CaseStatus::Closed);
        assert_eq!(stored.events.len(), 3);
    }

    #[test]
    fn test_unknown_case_not_found() {
        let manager = CaseManager::new();
        let missing = Uuid::new_v4();

        assert_eq!(
            manager.start_investigation(missing, "a").unwrap_err(),
            CaseError::NotFound(missing)
        );
        assert_eq!(
            manager.close_case(missing, "a", "done").unwrap_err(),
            CaseError::NotFound(missing)
        );
        assert!(manager.get(missing).is_none());
    }

    #[test]
    fn test_repeated_investigation_appends_events() {
        let manager = CaseManager::new();
        let case = open(&manager);

        manager.start_investigation(case.id, "a").unwrap();
        let again = manager.start_investigation(case.id, "b").unwrap();

        assert_eq!(again.status, CaseStatus::Investigate);
        assert_eq!(again.events.len(), 3);
    }

    #[test]
    fn test_no_backward_or_skipped_transitions() {
        let manager = CaseManager::new();
        let case = open(&manager);

        // OPEN cannot jump straight to CLOSED
        assert!(matches!(
            manager.close_case(case.id, "a", "done"),
            Err(CaseError::InvalidTransition {
                from: CaseStatus::Open,
                ..
            })
        ));

        manager.start_investigation(case.id, "a").unwrap();
        manager.close_case(case.id, "a", "done").unwrap();

        assert!(matches!(
            manager.start_investigation(case.id, "a"),
            Err(CaseError::InvalidTransition {
                from: CaseStatus::Closed,
                ..
            })
        ));
        assert!(manager.close_case(case.id, "a", "again").is_err());

        // failed attempts leave the audit trail untouched
        assert_eq!(manager.get(case.id).unwrap().events.len(), 3);
    }

    #[test]
    fn test_close_requires_resolution() {
        let manager = CaseManager::new();
        let case = open(&manager);
        manager.start_investigation(case.id, "a").unwrap();

        assert_eq!(
            manager.close_case(case.id, "a", "   ").unwrap_err(),
            CaseError::MissingResolution(case.id)
        );
        assert_eq!(
            manager.get(case.id).unwrap().status,
            CaseStatus::Investigate
        );
    }

    #[test]
    fn test_list_by_status() {
        let manager = CaseManager::new();
        let a = open(&manager);
        let _b = open(&manager);
        manager.start_investigation(a.id, "x").unwrap();

        assert_eq!(manager.len(), 2);
        assert_eq!(manager.list().len(), 2);
        assert_eq!(manager.list_by_status(CaseStatus::Open).len(), 1);
        assert_eq!(manager.list_by_status(CaseStatus::Investigate)[0].id, a.id);
        assert!(manager.list_by_status(CaseStatus::Closed).is_empty());
    }

    #[test]
    fn test_concurrent_open_and_read() {
        let manager = Arc::new(CaseManager::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let case = manager.open_case(
                            &format!("p{i}"),
                            "BTC-USDT",
                            vec![],
                            0.9,
                            Priority::Medium,
                        );
                        manager.start_investigation(case.id, "analyst").unwrap();
                        let _ = manager.list();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.len(), 200);
        assert_eq!(manager.list_by_status(CaseStatus::Investigate).len(), 200);
    }
}
