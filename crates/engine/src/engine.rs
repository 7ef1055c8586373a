//! Detection cycle orchestration
//!
//! One cycle per submitted batch:
//!
//! 1. append the batch to the rolling buffer and stream each raw trade
//! 2. extract feature vectors over the whole buffer
//! 3. refresh market baselines, refit the scorer and score every vector
//! 4. evaluate rules, explain deviations, open and stream cases
//!
//! Cycles are serialised by one async mutex over the buffer, baselines and
//! scorer. Case queries and stream subscriptions never take that lock.

use crate::config::EngineConfig;
use crate::error::{IngestError, Result};
use crate::hub::{BroadcastHub, Subscription};
use crate::ingest::{IngestAck, TradeRecord};
use argus_case_manager::CaseManager;
use argus_core::{Case, CaseAlert, CaseId, CaseStatus, FeatureVector, Priority, TradeEvent};
use argus_detection::{
    AnomalyScorer, BaselineTracker, EventBuffer, FeatureExtractor, FeatureStats, IsolationForest,
    RuleEngine, explain,
};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of one detection cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Events accepted from this batch
    pub events: usize,
    /// Vectors extracted from the whole buffer, with scores filled in
    pub feature_vectors: Vec<FeatureVector>,
    pub cases: Vec<Case>,
}

struct CycleState {
    buffer: EventBuffer,
    baselines: BaselineTracker,
    scorer: Box<dyn AnomalyScorer>,
}

pub struct SurveillanceEngine {
    config: EngineConfig,
    extractor: FeatureExtractor,
    rules: RuleEngine,
    state: Mutex<CycleState>,
    cases: Arc<CaseManager>,
    trade_hub: BroadcastHub<TradeEvent>,
    case_hub: BroadcastHub<Case>,
}

impl SurveillanceEngine {
    /// Engine with the default isolation forest scorer
    pub fn new(config: EngineConfig, rules: RuleEngine) -> Self {
        let scorer = Box::new(IsolationForest::new(config.scorer.clone()));
        Self::with_scorer(config, rules, scorer)
    }

    pub fn with_scorer(
        config: EngineConfig,
        rules: RuleEngine,
        scorer: Box<dyn AnomalyScorer>,
    ) -> Self {
        info!(
            "Surveillance engine: {} rule(s), scorer {}, buffer {}, window {}s",
            rules.len(),
            scorer.name(),
            config.buffer_capacity,
            config.window_secs
        );
        Self {
            extractor: FeatureExtractor::new(config.window_ns(), config.features.clone()),
            rules,
            state: Mutex::new(CycleState {
                buffer: EventBuffer::new(config.buffer_capacity),
                baselines: BaselineTracker::new(),
                scorer,
            }),
            cases: Arc::new(CaseManager::new()),
            trade_hub: BroadcastHub::new("trades", config.subscriber_capacity),
            case_hub: BroadcastHub::new("cases", config.subscriber_capacity),
            config,
        }
    }

    /// Validate `config` and load rules from its `rules_dir`
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let rules = RuleEngine::load_rules(&config.rules_dir)?;
        Ok(Self::new(config, rules))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Validate and process a batch of wire records.
    ///
    /// The batch is all-or-nothing: one invalid record rejects it and leaves
    /// the buffer untouched.
    pub async fn ingest(&self, records: Vec<TradeRecord>) -> IngestAck {
        let events: std::result::Result<Vec<TradeEvent>, IngestError> =
            records.into_iter().map(TradeEvent::try_from).collect();

        match events {
            Ok(events) => {
                let report = self.process_batch(events).await;
                IngestAck::accepted(report.events, report.cases.len())
            }
            Err(e) => {
                warn!("Rejected batch: {}", e);
                IngestAck::rejected(&e)
            }
        }
    }

    /// Run one detection cycle over `events` plus everything still buffered
    pub async fn process_batch(&self, events: Vec<TradeEvent>) -> CycleReport {
        if events.is_empty() {
            return CycleReport::default();
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let accepted = events.len();
        for event in &events {
            self.trade_hub.publish(event.clone());
        }
        let evicted = state.buffer.append(events);
        if evicted > 0 {
            debug!("Buffer full, evicted {} oldest event(s)", evicted);
        }

        let mut vectors = self.extractor.extract(state.buffer.iter());
        if vectors.is_empty() {
            return CycleReport {
                events: accepted,
                ..Default::default()
            };
        }

        let tracked = &self.config.tracked_features;
        state.baselines.update(&vectors, tracked);
        state.scorer.fit(&vectors, tracked);
        let scores = state.scorer.score(&vectors);
        for (fv, score) in vectors.iter_mut().zip(scores) {
            fv.anomaly_score = score;
        }

        let cases: Vec<Case> = vectors
            .iter()
            .filter_map(|fv| self.assess(fv, state.baselines.baselines()))
            .collect();

        debug!(
            "Cycle: {} event(s), {} buffered, {} vector(s), {} case(s)",
            accepted,
            state.buffer.len(),
            vectors.len(),
            cases.len()
        );

        CycleReport {
            events: accepted,
            feature_vectors: vectors,
            cases,
        }
    }

    /// Open a case for `fv` if it trips a rule or scores as anomalous
    fn assess(&self, fv: &FeatureVector, baselines: &IndexMap<String, FeatureStats>) -> Option<Case> {
        let metrics = fv.metrics();
        let alerts = self.rules.evaluate(&metrics);
        let is_anomaly = fv.anomaly_score > self.config.anomaly_threshold;

        if alerts.is_empty() && !is_anomaly {
            return None;
        }

        let evidence = explain(&metrics, baselines);
        let priority = if !alerts.is_empty() && is_anomaly {
            Priority::High
        } else {
            Priority::Medium
        };

        let triggers: Vec<CaseAlert> = alerts
            .into_iter()
            .map(CaseAlert::from)
            .chain(evidence.into_iter().map(CaseAlert::from))
            .collect();

        let case = self.cases.open_case(
            &fv.participant_id,
            &fv.instrument,
            triggers,
            fv.anomaly_score,
            priority,
        );
        self.case_hub.publish(case.clone());
        Some(case)
    }

    /// Live stream of raw trades, in ingestion order
    pub fn subscribe_trades(&self) -> Subscription<TradeEvent> {
        self.trade_hub.subscribe()
    }

    /// Live stream of newly opened cases
    pub fn subscribe_cases(&self) -> Subscription<Case> {
        self.case_hub.subscribe()
    }

    pub fn case_manager(&self) -> Arc<CaseManager> {
        Arc::clone(&self.cases)
    }

    pub fn get_case(&self, case_id: CaseId) -> Option<Case> {
        self.cases.get(case_id)
    }

    pub fn list_cases(&self, status: Option<CaseStatus>) -> Vec<Case> {
        match status {
            Some(status) => self.cases.list_by_status(status),
            None => self.cases.list(),
        }
    }

    pub fn start_investigation(&self, case_id: CaseId, analyst_id: &str) -> Result<Case> {
        Ok(self.cases.start_investigation(case_id, analyst_id)?)
    }

    pub fn close_case(&self, case_id: CaseId, analyst_id: &str, resolution: &str) -> Result<Case> {
        Ok(self.cases.close_case(case_id, analyst_id, resolution)?)
    }

    pub async fn buffered_events(&self) -> Vec<TradeEvent> {
        self.state.lock().await.buffer.snapshot()
    }

    pub async fn baselines(&self) -> IndexMap<String, FeatureStats> {
        self.state.lock().await.baselines.baselines().clone()
    }

    /// Close both streams; subscribers drain and then see end of stream
    pub fn shutdown(&self) {
        self.trade_hub.close();
        self.case_hub.close();
        info!(
            "Surveillance engine stopped: {} case(s) on record",
            self.cases.len()
        );
    }
}
