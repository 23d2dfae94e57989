//! Correlation Engine
//!
//! Calculates Pearson correlation coefficients between all metric pairs,
//! both same-day and time-lagged.
//!
//! # Pipeline per pair
//!
//! ```text
//! exclusions → aligned pairs (≥5) → r (clamped) → same-day filter
//!                                              → lag search (1..=max_lag)
//! ```

use super::exclusions::is_excluded_pair;
use crate::records::{AlignedData, Category, MetricSeries};
use crate::stats::{approximate_significance, clamp_correlation, pearson_correlation};
use chrono::Duration;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Minimum aligned pairs before a correlation is computed
pub const MIN_PAIRS: usize = 5;

/// Same-category pairs are kept only when |r| ≤ this; stronger ones are
/// obvious or the same measurement twice
const SAME_CATEGORY_CAP: f64 = 0.75;

/// Correlation sweep parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Minimum |r| for an edge to be reported
    #[serde(default = "default_min_correlation")]
    pub min_correlation: f64,

    /// Largest lag (days) searched by the time-lagged pass
    #[serde(default = "default_max_lag")]
    pub max_lag: usize,
}

fn default_min_correlation() -> f64 {
    0.3
}

fn default_max_lag() -> usize {
    3
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            min_correlation: default_min_correlation(),
            max_lag: default_max_lag(),
        }
    }
}

/// Whether an edge relates the same day or a leader to a later follower
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CorrelationType {
    SameDay,
    TimeLagged,
}

/// Human-readable strength
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    /// Classify |r|: strong > 0.7, moderate > 0.5, weak otherwise
    pub fn from_correlation(r: f64) -> Self {
        let abs_r = r.abs();
        if abs_r > 0.7 {
            Strength::Strong
        } else if abs_r > 0.5 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }
}

/// Sign of the relationship
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub fn from_correlation(r: f64) -> Self {
        if r < 0.0 {
            Direction::Negative
        } else {
            Direction::Positive
        }
    }
}

/// A correlation between two metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationEdge {
    /// First metric (the leader for time-lagged edges)
    pub metric1: String,
    /// Second metric (the follower for time-lagged edges)
    pub metric2: String,
    pub category1: Category,
    pub category2: Category,
    /// Pearson coefficient, clamped to [-0.99, 0.99]
    pub correlation: f64,
    /// Days metric1 leads metric2 (0 for same-day)
    pub lag: usize,
    #[serde(rename = "type")]
    pub correlation_type: CorrelationType,
    pub strength: Strength,
    pub direction: Direction,
    /// Number of aligned pairs used
    pub point_count: usize,
    /// Heuristic two-sided significance (lower is more confident)
    pub significance: f64,
}

impl CorrelationEdge {
    fn new(
        leader: &MetricSeries,
        follower: &MetricSeries,
        r: f64,
        lag: usize,
        point_count: usize,
    ) -> Self {
        let correlation = clamp_correlation(r);
        Self {
            metric1: leader.name.clone(),
            metric2: follower.name.clone(),
            category1: leader.category,
            category2: follower.category,
            correlation,
            lag,
            correlation_type: if lag == 0 {
                CorrelationType::SameDay
            } else {
                CorrelationType::TimeLagged
            },
            strength: Strength::from_correlation(correlation),
            direction: Direction::from_correlation(correlation),
            point_count,
            significance: approximate_significance(correlation, point_count),
        }
    }

    /// Whether the edge links two different categories
    pub fn is_cross_category(&self) -> bool {
        self.category1 != self.category2
    }

    /// Whether the edge touches a metric
    pub fn involves(&self, metric: &str) -> bool {
        self.metric1 == metric || self.metric2 == metric
    }
}

/// Best lag found for a leader/follower pair
#[derive(Debug, Clone, Copy)]
struct LagFit {
    lag: usize,
    r: f64,
    point_count: usize,
}

/// Calculate correlations between aligned metrics
pub struct CorrelationEngine {
    data: Arc<AlignedData>,
}

impl CorrelationEngine {
    /// Create a new correlation engine over an aligned snapshot
    pub fn new(data: Arc<AlignedData>) -> Self {
        Self { data }
    }

    /// Calculate correlations for all metric pairs
    ///
    /// Returns edges sorted by absolute correlation (strongest first).
    pub fn compute_correlations(&self, min_correlation: f64, max_lag: usize) -> Vec<CorrelationEdge> {
        let series = self.data.series();
        let pairs: Vec<(usize, usize)> = (0..series.len())
            .flat_map(|i| ((i + 1)..series.len()).map(move |j| (i, j)))
            .collect();

        let mut edges: Vec<CorrelationEdge> = pairs
            .par_iter()
            .flat_map_iter(|&(i, j)| {
                self.analyze_pair(&series[i], &series[j], min_correlation, max_lag)
            })
            .collect();

        sort_edges(&mut edges);

        tracing::debug!(
            metrics = series.len(),
            pairs = pairs.len(),
            edges = edges.len(),
            "Computed correlations"
        );

        edges
    }

    /// Compute correlations with a config
    pub fn compute_with(&self, config: &CorrelationConfig) -> Vec<CorrelationEdge> {
        self.compute_correlations(config.min_correlation, config.max_lag)
    }

    /// Correlations that involve a specific metric
    pub fn correlations_for_metric(
        &self,
        metric_name: &str,
        config: &CorrelationConfig,
    ) -> Vec<CorrelationEdge> {
        self.compute_with(config)
            .into_iter()
            .filter(|e| e.involves(metric_name))
            .collect()
    }

    fn analyze_pair(
        &self,
        a: &MetricSeries,
        b: &MetricSeries,
        min_correlation: f64,
        max_lag: usize,
    ) -> Vec<CorrelationEdge> {
        let mut edges = Vec::new();

        if a.name == b.name || is_excluded_pair(&a.field, &b.field) {
            return edges;
        }

        let (x, y) = a.paired_with(b);
        if x.len() < MIN_PAIRS {
            return edges;
        }

        let Some(raw) = pearson_correlation(&x, &y) else {
            return edges;
        };
        let r = clamp_correlation(raw);

        let same_category = a.category == b.category;
        if !exceeds_same_category_cap(r, same_category) && r.abs() >= min_correlation {
            edges.push(CorrelationEdge::new(a, b, r, 0, x.len()));
        }

        if max_lag > 0 && x.len() >= max_lag + MIN_PAIRS {
            let forward = self.best_lag(a, b, max_lag).map(|fit| (a, b, fit));
            let backward = self.best_lag(b, a, max_lag).map(|fit| (b, a, fit));

            let best = match (forward, backward) {
                (Some(f), Some(bk)) => {
                    if bk.2.r.abs() > f.2.r.abs() {
                        Some(bk)
                    } else {
                        Some(f)
                    }
                }
                (f, bk) => f.or(bk),
            };

            if let Some((leader, follower, fit)) = best {
                if fit.lag > 0 && fit.r.abs() >= min_correlation {
                    edges.push(CorrelationEdge::new(
                        leader,
                        follower,
                        fit.r,
                        fit.lag,
                        fit.point_count,
                    ));
                }
            }
        }

        edges
    }

    /// Search lags 0..=max_lag for the one maximizing |r| when the leader
    /// is shifted `lag` calendar days earlier than the follower.
    fn best_lag(&self, leader: &MetricSeries, follower: &MetricSeries, max_lag: usize) -> Option<LagFit> {
        let dates = self.data.dates();
        let mut best: Option<LagFit> = None;

        for lag in 0..=max_lag {
            let mut x = Vec::new();
            let mut y = Vec::new();

            for (i, lead_value) in leader.valid_points() {
                let target = dates[i] + Duration::days(lag as i64);
                let Some(j) = self.data.date_index(target) else {
                    continue;
                };
                if let Some(follow_value) = follower.get(j) {
                    x.push(lead_value);
                    y.push(follow_value);
                }
            }

            if x.len() < MIN_PAIRS {
                continue;
            }

            let Some(raw) = pearson_correlation(&x, &y) else {
                continue;
            };
            let r = clamp_correlation(raw);

            if best.map_or(true, |b| r.abs() > b.r.abs()) {
                best = Some(LagFit {
                    lag,
                    r,
                    point_count: x.len(),
                });
            }
        }

        best
    }
}

/// Same-category pairs are dropped when |r| > 0.75; cross-category pairs
/// are never capped.
fn exceeds_same_category_cap(r: f64, same_category: bool) -> bool {
    same_category && r.abs() > SAME_CATEGORY_CAP
}

/// Sort by |r| descending, then by names and lag for stable output
pub fn sort_edges(edges: &mut [CorrelationEdge]) {
    edges.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.metric1.cmp(&b.metric1))
            .then_with(|| a.metric2.cmp(&b.metric2))
            .then_with(|| a.lag.cmp(&b.lag))
    });
}
