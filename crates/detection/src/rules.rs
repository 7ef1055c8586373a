//! Rule Engine
//!
//! Declarative threshold rules evaluated against a feature vector's metric map.
//!
//! A rule definition names an ordered set of conditions such as
//! `"cancel_ratio": "> 0.7"`. Conditions are parsed once at load time into an
//! operator tag and a threshold. Evaluation policy:
//!
//! - conditions are ANDed
//! - a metric missing from the input skips its condition (treated as satisfied),
//!   so a rule can match a sparse or even empty metric map
//! - a malformed condition makes its rule never match; other rules are unaffected
//!
//! The missing-metric passthrough trades false positives on sparse input for
//! availability of the pipeline and is kept deliberately.

use crate::error::{Result, RuleError};
use argus_core::{Alert, AlertSeverity, MetricMap};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SPOOFING_RULE: &str = include_str!("../rules/spoofing.json");
const WASH_TRADING_RULE: &str = include_str!("../rules/wash_trading.json");

/// Comparison operator of a threshold condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

impl Operator {
    pub fn apply(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Lt => value < threshold,
            Operator::Ge => value >= threshold,
            Operator::Le => value <= threshold,
            Operator::Eq => value == threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Eq => "==",
        }
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "==" => Ok(Operator::Eq),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parsed form of a condition string
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare { op: Operator, threshold: f64 },
    /// Unparseable source text; the owning rule never matches
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub metric: String,
    pub predicate: Predicate,
}

impl Condition {
    /// Parse `<operator> <threshold>`, e.g. `"> 0.7"`
    pub fn parse(metric: impl Into<String>, text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let predicate = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(op), Some(threshold), None) => {
                match (op.parse::<Operator>(), threshold.parse::<f64>()) {
                    (Ok(op), Ok(threshold)) => Predicate::Compare { op, threshold },
                    _ => Predicate::Malformed(text.to_string()),
                }
            }
            _ => Predicate::Malformed(text.to_string()),
        };
        Self {
            metric: metric.into(),
            predicate,
        }
    }

    /// Evaluate against a metric map. A missing metric passes.
    pub fn check(&self, metrics: &MetricMap) -> bool {
        let Some(value) = metrics.get(&self.metric) else {
            return true;
        };
        match self.predicate {
            Predicate::Compare { op, threshold } => op.apply(*value, threshold),
            Predicate::Malformed(_) => false,
        }
    }

    /// Build from a raw JSON condition value. Anything but a string is malformed.
    pub fn from_value(metric: impl Into<String>, value: &Value) -> Self {
        match value {
            Value::String(text) => Self::parse(metric, text),
            other => Self {
                metric: metric.into(),
                predicate: Predicate::Malformed(other.to_string()),
            },
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.predicate, Predicate::Malformed(_))
    }
}

/// On-disk rule definition (one JSON document per file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    #[serde(default)]
    pub description: String,
    /// Metric name -> condition string, in declaration order. Kept as raw JSON
    /// so a non-string condition only breaks its own rule.
    #[serde(default)]
    pub when: IndexMap<String, Value>,
}

/// Compiled rule ready for evaluation
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub description: String,
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn compile(def: RuleDefinition) -> Self {
        let conditions: Vec<Condition> = def
            .when
            .iter()
            .map(|(metric, value)| Condition::from_value(metric.clone(), value))
            .collect();

        for condition in conditions.iter().filter(|c| c.is_malformed()) {
            if let Predicate::Malformed(text) = &condition.predicate {
                let err = RuleError::MalformedCondition {
                    metric: condition.metric.clone(),
                    condition: text.clone(),
                };
                warn!("Rule {} will never match: {}", def.id, err);
            }
        }

        Self {
            id: def.id,
            alert_type: def.alert_type,
            severity: def.severity,
            description: def.description,
            conditions,
        }
    }

    /// All conditions hold (missing metrics skipped)
    pub fn matches(&self, metrics: &MetricMap) -> bool {
        self.conditions.iter().all(|c| c.check(metrics))
    }

    pub fn is_well_formed(&self) -> bool {
        !self.conditions.iter().any(Condition::is_malformed)
    }

    fn alert(&self) -> Alert {
        Alert {
            rule_id: self.id.clone(),
            alert_type: self.alert_type.clone(),
            severity: self.severity,
            description: self.description.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RuleDocument {
    One(RuleDefinition),
    Many(Vec<RuleDefinition>),
}

impl RuleDocument {
    fn into_definitions(self) -> Vec<RuleDefinition> {
        match self {
            RuleDocument::One(def) => vec![def],
            RuleDocument::Many(defs) => defs,
        }
    }
}

/// Loaded rule set. Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(defs: impl IntoIterator<Item = RuleDefinition>) -> Self {
        Self {
            rules: defs.into_iter().map(Rule::compile).collect(),
        }
    }

    /// Parse one rule object or an array of rule objects
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: RuleDocument = serde_json::from_str(json)?;
        Ok(Self::from_definitions(doc.into_definitions()))
    }

    /// Built-in spoofing and wash-trading rules
    pub fn default_rules() -> Self {
        let mut defs = Vec::new();
        for json in [SPOOFING_RULE, WASH_TRADING_RULE] {
            match serde_json::from_str::<RuleDocument>(json) {
                Ok(doc) => defs.extend(doc.into_definitions()),
                Err(e) => warn!("Skipping embedded rule: {}", e),
            }
        }
        Self::from_definitions(defs)
    }

    /// Load every `*.json` file in `dir`, in file-name order.
    ///
    /// A missing directory yields an empty rule set. A file that fails to parse
    /// is skipped with a warning; the remaining files still load.
    pub fn load_rules<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            warn!("Rules directory {} not found, no rules loaded", dir.display());
            return Ok(Self::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut defs = Vec::new();
        for path in paths {
            match Self::read_file(&path) {
                Ok(file_defs) => {
                    debug!("Loaded {} rule(s) from {}", file_defs.len(), path.display());
                    defs.extend(file_defs);
                }
                Err(e) => warn!("Skipping rule file: {}", e),
            }
        }

        let engine = Self::from_definitions(defs);
        info!(
            "Loaded {} rule(s) from {} ({} malformed)",
            engine.len(),
            dir.display(),
            engine.rules.iter().filter(|r| !r.is_well_formed()).count()
        );
        Ok(engine)
    }

    fn read_file(path: &Path) -> Result<Vec<RuleDefinition>> {
        let content = std::fs::read_to_string(path)?;
        let doc: RuleDocument =
            serde_json::from_str(&content).map_err(|source| RuleError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(doc.into_definitions())
    }

    /// One alert per matching rule, in rule order. Never fails.
    pub fn evaluate(&self, metrics: &MetricMap) -> Vec<Alert> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(metrics))
            .map(Rule::alert)
            .collect()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> MetricMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn rule_json(id: &str, when: &str) -> String {
        format!(
            r#"{{"id": "{id}", "alert_type": "TEST", "severity": "LOW", "description": "d", "when": {when}}}"#
        )
    }

    #[test]
    fn test_spoofing_detection_high_cancel_ratio() {
        let engine = RuleEngine::default_rules();
        let alerts = engine.evaluate(&metrics(&[
            ("cancel_ratio", 0.8),
            ("quantity_percentile", 96.0),
        ]));

        let spoofing: Vec<_> = alerts
            .iter()
            .filter(|a| a.alert_type == "SPOOFING")
            .collect();
        assert_eq!(spoofing.len(), 1);
    }

    #[test]
    fn test_wash_trading_detection() {
        let engine = RuleEngine::default_rules();
        let alerts = engine.evaluate(&metrics(&[
            ("self_trade_ratio", 0.5),
            ("wash_volume_ratio", 0.5),
        ]));
        assert!(alerts.iter().any(|a| a.alert_type == "WASH_TRADING"));
    }

    #[test]
    fn test_normal_trading_no_alerts() {
        let engine = RuleEngine::default_rules();
        let alerts = engine.evaluate(&metrics(&[
            ("cancel_ratio", 0.1),
            ("quantity_percentile", 50.0),
            ("self_trade_ratio", 0.0),
            ("wash_volume_ratio", 0.0),
        ]));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_missing_metric_skips_condition() {
        let engine = RuleEngine::default_rules();

        // only one spoofing condition present and satisfied
        let alerts = engine.evaluate(&metrics(&[
            ("cancel_ratio", 0.9),
            ("self_trade_ratio", 0.0),
            ("wash_volume_ratio", 0.0),
        ]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, "SPOOFING");

        // an empty map passes every condition of every rule
        assert_eq!(engine.evaluate(&MetricMap::new()).len(), engine.len());
    }

    #[test]
    fn test_operators() {
        let cases = [
            ("> 1", 1.5, true),
            ("> 1", 1.0, false),
            ("< 1", 0.5, true),
            (">= 1", 1.0, true),
            ("<= 1", 1.0, true),
            ("<= 1", 1.1, false),
            ("== 2", 2.0, true),
            ("== 2", 2.1, false),
        ];
        for (text, value, expected) in cases {
            let condition = Condition::parse("x", text);
            assert_eq!(
                condition.check(&metrics(&[("x", value)])),
                expected,
                "{text} on {value}"
            );
        }
    }

    #[test]
    fn test_malformed_condition_fails_closed() {
        let json = format!(
            "[{}, {}]",
            rule_json("BAD", r#"{"x": "greater than 1"}"#),
            rule_json("GOOD", r#"{"x": "> 1"}"#)
        );
        let engine = RuleEngine::from_json_str(&json).unwrap();

        assert!(!engine.rules()[0].is_well_formed());
        let alerts = engine.evaluate(&metrics(&[("x", 5.0)]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id, "GOOD");
    }

    #[test]
    fn test_non_string_condition_only_disables_its_rule() {
        let _ = env_logger::try_init();
        let json = format!(
            "[{}, {}, {}]",
            rule_json("NUMBER", r#"{"x": 0.7}"#),
            rule_json("NULL", r#"{"x": null}"#),
            rule_json("GOOD", r#"{"x": "> 1"}"#)
        );
        let engine = RuleEngine::from_json_str(&json).unwrap();

        assert_eq!(engine.len(), 3);
        assert_eq!(
            engine.rules()[0].conditions[0].predicate,
            Predicate::Malformed("0.7".to_string())
        );
        assert!(!engine.rules()[1].is_well_formed());

        let alerts = engine.evaluate(&metrics(&[("x", 5.0)]));
        let ids: Vec<&str> = alerts.iter().map(|a| a.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["GOOD"]);
    }

    #[test]
    fn test_load_rules_keeps_siblings_of_non_string_condition() {
        let dir = std::env::temp_dir().join(format!("argus-rules-mixed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let json = format!(
            "[{}, {}]",
            rule_json("NUMBER", r#"{"cancel_ratio": 0.7}"#),
            rule_json("GOOD", r#"{"cancel_ratio": "> 0.7"}"#)
        );
        std::fs::write(dir.join("mixed.json"), json).unwrap();

        let engine = RuleEngine::load_rules(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(engine.len(), 2);
        let alerts = engine.evaluate(&metrics(&[("cancel_ratio", 0.9)]));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id, "GOOD");
    }

    #[test]
    fn test_malformed_condition_on_missing_metric_still_skipped() {
        let engine = RuleEngine::from_json_str(&rule_json("BAD", r#"{"x": ">>"}"#)).unwrap();
        assert_eq!(engine.evaluate(&metrics(&[("y", 1.0)])).len(), 1);
        assert!(engine.evaluate(&metrics(&[("x", 1.0)])).is_empty());
    }

    #[test]
    fn test_condition_parse_shapes() {
        assert_eq!(
            Condition::parse("x", ">= 0.5").predicate,
            Predicate::Compare {
                op: Operator::Ge,
                threshold: 0.5
            }
        );
        assert!(Condition::parse("x", ">0.5").is_malformed());
        assert!(Condition::parse("x", "> 0.5 extra").is_malformed());
        assert!(Condition::parse("x", "!= 1").is_malformed());
        assert!(Condition::parse("x", "").is_malformed());
    }

    #[test]
    fn test_conditions_keep_declaration_order() {
        let engine = RuleEngine::from_json_str(&rule_json(
            "ORD",
            r#"{"zeta": "> 1", "alpha": "< 2", "mid": "== 3"}"#,
        ))
        .unwrap();
        let names: Vec<&str> = engine.rules()[0]
            .conditions
            .iter()
            .map(|c| c.metric.as_str())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_load_rules_missing_dir_is_empty() {
        let engine = RuleEngine::load_rules("/definitely/not/a/rules/dir").unwrap();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_load_rules_from_dir() {
        let _ = env_logger::try_init();
        let dir = std::env::temp_dir().join(format!("argus-rules-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.json"), rule_json("B", r#"{"x": "> 1"}"#)).unwrap();
        std::fs::write(dir.join("a.json"), rule_json("A", r#"{"x": "> 0"}"#)).unwrap();
        std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let engine = RuleEngine::load_rules(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        let ids: Vec<&str> = engine.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }
}
