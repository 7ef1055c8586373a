//! Anomaly Scoring
//!
//! Pluggable unsupervised outlier model behind a two-method capability:
//! `fit` retrains on the current batch, `score` maps each vector to [0, 1]
//! where higher means more anomalous.
//!
//! The default backend is an isolation forest. Anomalies are few and
//! different, so random axis-aligned splits isolate them in fewer steps than
//! normal points; the score is `2^(-E[h(x)] / c(psi))` where `h` is the path
//! length and `c` the average path length of an unsuccessful BST search.

use argus_core::FeatureVector;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Score returned for every vector when the model saw fewer than two rows
const NEUTRAL_SCORE: f64 = 0.5;

/// Swappable outlier-detection backend
pub trait AnomalyScorer: Send + Sync {
    /// Retrain from scratch on `vectors`, using `features` as columns.
    /// An empty batch leaves the model untouched.
    fn fit(&mut self, vectors: &[FeatureVector], features: &[String]);

    /// One score in [0, 1] per vector. Returns all zeros before the first
    /// successful fit or for an empty batch.
    fn score(&self, vectors: &[FeatureVector]) -> Vec<f64>;

    fn is_fitted(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Isolation forest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestConfig {
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the batch size)
    pub max_samples: usize,
    /// RNG seed; reapplied on every fit so retraining is reproducible
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_samples: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Isolation forest with column-mean imputation of missing values
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: IsolationForestConfig,
    columns: Vec<String>,
    /// Training means, used to impute missing values
    means: Vec<f64>,
    trees: Vec<Node>,
    sample_size: usize,
    fitted: bool,
}

impl IsolationForest {
    pub fn new(config: IsolationForestConfig) -> Self {
        Self {
            config,
            columns: Vec::new(),
            means: Vec::new(),
            trees: Vec::new(),
            sample_size: 0,
            fitted: false,
        }
    }

    pub fn config(&self) -> &IsolationForestConfig {
        &self.config
    }

    fn raw_rows(&self, vectors: &[FeatureVector]) -> Vec<Vec<f64>> {
        vectors
            .iter()
            .map(|fv| {
                self.columns
                    .iter()
                    .map(|name| fv.value(name).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect()
    }

    fn impute(&self, rows: &mut [Vec<f64>]) {
        for row in rows.iter_mut() {
            for (value, mean) in row.iter_mut().zip(&self.means) {
                if value.is_nan() {
                    *value = *mean;
                }
            }
        }
    }

    fn build(
        rows: &[Vec<f64>],
        indices: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> Node {
        if depth >= height_limit || indices.len() <= 1 {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let n_features = rows.first().map_or(0, Vec::len);
        let splittable: Vec<(usize, f64, f64)> = (0..n_features)
            .filter_map(|j| {
                let (min, max) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| (lo.min(rows[i][j]), hi.max(rows[i][j])),
                );
                (max > min).then_some((j, min, max))
            })
            .collect();

        if splittable.is_empty() {
            return Node::Leaf {
                size: indices.len(),
            };
        }

        let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| rows[i][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Self::build(rows, left, depth + 1, height_limit, rng)),
            right: Box::new(Self::build(rows, right, depth + 1, height_limit, rng)),
        }
    }

    fn path_length(row: &[f64], node: &Node, depth: usize) -> f64 {
        match node {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let next = if row[*feature] <= *threshold {
                    left
                } else {
                    right
                };
                Self::path_length(row, next, depth + 1)
            }
        }
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(IsolationForestConfig::default())
    }
}

impl AnomalyScorer for IsolationForest {
    fn fit(&mut self, vectors: &[FeatureVector], features: &[String]) {
        if vectors.is_empty() {
            return;
        }

        self.columns = features.to_vec();
        let mut rows = self.raw_rows(vectors);
        self.means = (0..self.columns.len())
            .map(|j| {
                let observed: Vec<f64> = rows.iter().map(|r| r[j]).filter(|v| !v.is_nan()).collect();
                if observed.is_empty() {
                    0.0
                } else {
                    observed.iter().sum::<f64>() / observed.len() as f64
                }
            })
            .collect();
        self.impute(&mut rows);

        let n = rows.len();
        self.sample_size = self.config.max_samples.max(1).min(n);
        self.trees.clear();

        if self.sample_size >= 2 {
            let mut rng = StdRng::seed_from_u64(self.config.seed);
            let height_limit = (self.sample_size as f64).log2().ceil() as usize;
            for _ in 0..self.config.n_estimators.max(1) {
                let sample = index::sample(&mut rng, n, self.sample_size).into_vec();
                self.trees
                    .push(Self::build(&rows, sample, 0, height_limit, &mut rng));
            }
        }

        self.fitted = true;
        debug!(
            "Isolation forest fitted: {} rows, {} columns, {} trees",
            n,
            self.columns.len(),
            self.trees.len()
        );
    }

    fn score(&self, vectors: &[FeatureVector]) -> Vec<f64> {
        if !self.fitted || vectors.is_empty() {
            return vec![0.0; vectors.len()];
        }
        if self.trees.is_empty() {
            return vec![NEUTRAL_SCORE; vectors.len()];
        }

        let mut rows = self.raw_rows(vectors);
        self.impute(&mut rows);

        let normaliser = average_path_length(self.sample_size);
        rows.iter()
            .map(|row| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| Self::path_length(row, tree, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2f64.powf(-mean_path / normaliser).clamp(0.0, 1.0)
            })
            .collect()
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn name(&self) -> &'static str {
        "isolation-forest"
    }
}

/// c(n): average path length of an unsuccessful search in a BST of n nodes
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        ["num_trades", "buy_sell_ratio", "avg_quantity", "venue_switch_count"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn vector(pid: &str, buy_sell_ratio: f64, avg_quantity: f64) -> FeatureVector {
        let mut fv = FeatureVector::new(pid, "BTC-USDT", 0);
        fv.num_trades = 1;
        fv.buy_sell_ratio = buy_sell_ratio;
        fv.avg_quantity = avg_quantity;
        fv.venue_switch_count = 1;
        fv
    }

    fn population() -> Vec<FeatureVector> {
        let mut vectors: Vec<FeatureVector> = (0..19)
            .map(|i| vector(&format!("trader-{i}"), 1.0, 0.05))
            .collect();
        vectors.push(vector("Eve", 0.0, 0.5));
        vectors
    }

    #[test]
    fn test_unfitted_scores_zero() {
        let forest = IsolationForest::default();
        assert!(!forest.is_fitted());
        assert_eq!(forest.score(&population()), vec![0.0; 20]);
    }

    #[test]
    fn test_empty_batch() {
        let mut forest = IsolationForest::default();
        forest.fit(&[], &columns());
        assert!(!forest.is_fitted());

        forest.fit(&population(), &columns());
        assert!(forest.score(&[]).is_empty());
    }

    #[test]
    fn test_scores_in_unit_interval() {
        let mut forest = IsolationForest::default();
        let mut vectors = population();
        for (i, fv) in vectors.iter_mut().enumerate() {
            fv.num_trades = (i % 5) as u64;
            fv.avg_quantity += i as f64 * 0.01;
        }
        forest.fit(&vectors, &columns());

        let scores = forest.score(&vectors);
        assert_eq!(scores.len(), vectors.len());
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_isolated_point_scores_high() {
        let mut forest = IsolationForest::default();
        let vectors = population();
        forest.fit(&vectors, &columns());
        let scores = forest.score(&vectors);

        // the outlier is isolated by the first split of every tree
        let expected = 2f64.powf(-1.0 / average_path_length(20));
        assert!((scores[19] - expected).abs() < 1e-9);
        assert!(scores[19] > 0.8);
        assert!(scores[..19].iter().all(|s| *s < 0.5));
    }

    #[test]
    fn test_identical_rows_are_neutral() {
        let mut forest = IsolationForest::default();
        let vectors: Vec<FeatureVector> = (0..8).map(|i| vector(&i.to_string(), 1.0, 1.0)).collect();
        forest.fit(&vectors, &columns());

        for s in forest.score(&vectors) {
            assert!((s - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_row_batch_is_neutral() {
        let mut forest = IsolationForest::default();
        let vectors = vec![vector("Eve", 0.0, 0.5)];
        forest.fit(&vectors, &columns());
        assert!(forest.is_fitted());
        assert_eq!(forest.score(&vectors), vec![NEUTRAL_SCORE]);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let mut vectors = population();
        for (i, fv) in vectors.iter_mut().enumerate() {
            fv.avg_quantity += (i * i) as f64 * 0.003;
        }

        let mut a = IsolationForest::default();
        let mut b = IsolationForest::default();
        a.fit(&vectors, &columns());
        b.fit(&vectors, &columns());
        assert_eq!(a.score(&vectors), b.score(&vectors));
    }

    #[test]
    fn test_missing_columns_imputed() {
        let mut forest = IsolationForest::default();
        let mut cols = columns();
        cols.push("no_such_metric".to_string());
        forest.fit(&population(), &cols);

        let scores = forest.score(&population());
        assert!(scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.244).abs() < 0.01);
    }
}
