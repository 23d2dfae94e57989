//! Health Engine
//!
//! One aligned snapshot plus configuration, exposing every analysis.
//!
//! ```text
//! RecordSet → AlignedData (Arc) ─┬─ CorrelationEngine → edges → cascades
//!                                ├─ AnomalyDetector
//!                                ├─ PatternAnalyzer
//!                                └─ HealthScoreCalculator → recommendations
//! ```
//!
//! Every call recomputes from the snapshot; nothing is cached or mutated.

use crate::anomaly::{AnomalyDetector, AnomalyFinding};
use crate::config::Config;
use crate::correlation::{CorrelationEdge, CorrelationEngine};
use crate::patterns::{
    Cascade, ConditionalCorrelation, PatternAnalyzer, ThresholdEffect, Timeline, WeeklyPattern,
};
use crate::records::{load_path, AlignedData, RecordResult, RecordSet};
use crate::score::{
    generate_recommendations, GuardedRecommender, HealthScoreCalculator, Recommendation,
    RecommendationRequest, ScoreResult,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Output of one full analysis pass
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Date the score was computed for
    pub date: Option<NaiveDate>,
    pub days: usize,
    pub metrics: usize,
    pub correlations: Vec<CorrelationEdge>,
    pub anomalies: Vec<AnomalyFinding>,
    pub cascades: Vec<Cascade>,
    pub weekly_patterns: Vec<WeeklyPattern>,
    pub score: Option<ScoreResult>,
    pub recommendations: Vec<Recommendation>,
}

/// Analytics over one record-set
pub struct HealthEngine {
    data: Arc<AlignedData>,
    config: Config,
}

impl HealthEngine {
    /// Align a record-set and build the engine
    pub fn new(records: &RecordSet, config: Config) -> Self {
        let data = AlignedData::align(records);
        tracing::info!(
            days = data.dates().len(),
            metrics = data.len(),
            "Aligned record-set"
        );
        Self {
            data: Arc::new(data),
            config,
        }
    }

    /// Validate and align a JSON record-set
    pub fn from_json(value: &serde_json::Value, config: Config) -> RecordResult<Self> {
        let records = RecordSet::from_json(value)?;
        Ok(Self::new(&records, config))
    }

    /// Load a JSON file or a directory of per-category CSV files
    pub fn load(path: &Path, config: Config) -> RecordResult<Self> {
        let records = load_path(path)?;
        Ok(Self::new(&records, config))
    }

    pub fn data(&self) -> &AlignedData {
        &self.data
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn patterns(&self) -> PatternAnalyzer {
        PatternAnalyzer::new(Arc::clone(&self.data))
    }

    /// Correlations with the configured thresholds
    pub fn compute_correlations(&self) -> Vec<CorrelationEdge> {
        CorrelationEngine::new(Arc::clone(&self.data)).compute_with(&self.config.correlation)
    }

    /// Correlations with explicit thresholds
    pub fn compute_correlations_with(&self, min_correlation: f64, max_lag: usize) -> Vec<CorrelationEdge> {
        CorrelationEngine::new(Arc::clone(&self.data)).compute_correlations(min_correlation, max_lag)
    }

    pub fn correlations_for_metric(&self, metric: &str) -> Vec<CorrelationEdge> {
        CorrelationEngine::new(Arc::clone(&self.data))
            .correlations_for_metric(metric, &self.config.correlation)
    }

    fn anomaly_detector(&self) -> AnomalyDetector {
        AnomalyDetector::new(Arc::clone(&self.data), self.config.anomaly.clone())
    }

    /// Top-ranked anomalies across all metrics
    pub fn detect_all_anomalies(&self) -> Vec<AnomalyFinding> {
        self.anomaly_detector().detect_all_anomalies()
    }

    /// Every anomaly run for one metric, unranked
    pub fn detect_metric_anomalies(&self, metric: &str) -> Vec<AnomalyFinding> {
        self.anomaly_detector().detect_metric_anomalies(metric)
    }

    /// Cascades over freshly computed correlations
    pub fn discover_cascades(&self) -> Vec<Cascade> {
        let edges = self.compute_correlations();
        self.discover_cascades_from(&edges)
    }

    pub fn discover_cascades_from(&self, edges: &[CorrelationEdge]) -> Vec<Cascade> {
        self.patterns().discover_cascades(edges, &self.config.cascade)
    }

    pub fn threshold_effect(&self, input: &str, output: &str) -> Option<ThresholdEffect> {
        self.patterns().threshold_effect(input, output)
    }

    pub fn conditional_correlation(
        &self,
        condition: &str,
        metric_a: &str,
        metric_b: &str,
    ) -> Option<ConditionalCorrelation> {
        self.patterns().conditional_correlation(condition, metric_a, metric_b)
    }

    pub fn weekly_pattern(&self, metric: &str) -> Option<WeeklyPattern> {
        self.patterns().weekly_pattern(metric)
    }

    /// Weekly patterns above the configured variation
    pub fn weekly_patterns(&self) -> Vec<WeeklyPattern> {
        self.patterns()
            .weekly_patterns(self.config.weekly.min_variation_percent)
    }

    /// Timeline layers for `metrics` over `start..=end`, with the edges
    /// among them from a sweep using the configured thresholds
    pub fn timeline(&self, metrics: &[String], start: NaiveDate, end: NaiveDate) -> Timeline {
        let edges = self.compute_correlations();
        self.patterns().timeline(&edges, metrics, start, end)
    }

    fn score_calculator(&self) -> HealthScoreCalculator {
        HealthScoreCalculator::new(Arc::clone(&self.data), self.config.score.lookback_days)
    }

    pub fn score_for_date(&self, date: NaiveDate) -> Option<ScoreResult> {
        self.score_calculator().score_for_date(date)
    }

    pub fn score_latest(&self) -> Option<(NaiveDate, ScoreResult)> {
        self.score_calculator().score_latest()
    }

    /// Deterministic recommendations toward the configured target
    pub fn recommendations(&self, result: &ScoreResult) -> Vec<Recommendation> {
        generate_recommendations(result.score, self.config.score.target_score, &result.breakdown)
    }

    /// Recommendations from the configured source, falling back to rules
    pub async fn guarded_recommendations(&self, result: &ScoreResult) -> Vec<Recommendation> {
        let request = RecommendationRequest {
            current_score: result.score,
            target_score: self.config.score.target_score,
            breakdown: result.breakdown.clone(),
        };
        GuardedRecommender::from_config(&self.config.recommender)
            .recommend(&request)
            .await
    }

    /// Run every analysis, independent ones in parallel
    pub fn report(&self) -> HealthReport {
        let ((correlations, cascades), (anomalies, (weekly_patterns, latest))) = rayon::join(
            || {
                let edges = self.compute_correlations();
                let cascades = self.discover_cascades_from(&edges);
                (edges, cascades)
            },
            || {
                rayon::join(
                    || self.detect_all_anomalies(),
                    || rayon::join(|| self.weekly_patterns(), || self.score_latest()),
                )
            },
        );

        let (date, score) = match latest {
            Some((date, score)) => (Some(date), Some(score)),
            None => (None, None),
        };
        let recommendations = score
            .as_ref()
            .map(|s| self.recommendations(s))
            .unwrap_or_default();

        tracing::info!(
            correlations = correlations.len(),
            anomalies = anomalies.len(),
            cascades = cascades.len(),
            weekly = weekly_patterns.len(),
            score = score.as_ref().map(|s| s.score),
            "Report complete"
        );

        HealthReport {
            date,
            days: self.data.dates().len(),
            metrics: self.data.len(),
            correlations,
            anomalies,
            cascades,
            weekly_patterns,
            score,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordError;
    use serde_json::json;

    fn sample(days: i64) -> serde_json::Value {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut sleep = Vec::new();
        let mut wellness = Vec::new();
        let mut activity = Vec::new();
        for d in 0..days {
            let date = (start + chrono::Duration::days(d)).format("%Y-%m-%d").to_string();
            let hours = 6.0 + (d % 5) as f64 * 0.5;
            sleep.push(json!({"date": date, "sleep_duration_hours": hours, "bedtime": "23:15"}));
            wellness.push(json!({"date": date, "mood_score": hours + 0.1 * (d % 2) as f64}));
            activity.push(json!({"date": date, "steps": 5000 + (d * 37 % 11) * 500}));
        }
        json!({"sleep": sleep, "wellness": wellness, "activity": activity})
    }

    #[test]
    fn test_from_json_contract_violation() {
        let err = HealthEngine::from_json(&json!({"sleep": {"date": "2024-01-01"}}), Config::default());
        assert!(matches!(err, Err(RecordError::CategoryNotList { .. })));

        let err = HealthEngine::from_json(&json!({"sleep": [{"hours": 7}]}), Config::default());
        assert!(matches!(err, Err(RecordError::MissingDate { .. })));
    }

    #[test]
    fn test_report_runs_every_analysis() {
        let engine = HealthEngine::from_json(&sample(30), Config::default()).unwrap();
        let report = engine.report();

        assert_eq!(report.days, 30);
        assert!(report.metrics >= 3);
        assert_eq!(report.date, NaiveDate::from_ymd_opt(2024, 1, 30));
        assert!(report.score.is_some());
        assert!(report.anomalies.len() <= 3);
        assert!(report
            .correlations
            .iter()
            .any(|e| e.involves("sleep_duration_hours") && e.involves("mood_score")));
    }

    #[test]
    fn test_report_is_deterministic() {
        let engine = HealthEngine::from_json(&sample(30), Config::default()).unwrap();
        let a = serde_json::to_string(&engine.report()).unwrap();
        let b = serde_json::to_string(&engine.report()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_metrics_are_omitted() {
        let engine = HealthEngine::from_json(&sample(30), Config::default()).unwrap();
        assert!(engine.threshold_effect("missing", "mood_score").is_none());
        assert!(engine.weekly_pattern("missing").is_none());
        assert!(engine.detect_metric_anomalies("missing").is_empty());
        assert!(engine.correlations_for_metric("missing").is_empty());
    }

    #[test]
    fn test_empty_record_set() {
        let engine = HealthEngine::new(&RecordSet::new(), Config::default());
        let report = engine.report();
        assert_eq!(report.days, 0);
        assert!(report.correlations.is_empty());
        assert!(report.score.is_none());
        assert!(report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_guarded_recommendations_without_service_match_rules() {
        let engine = HealthEngine::from_json(&sample(30), Config::default()).unwrap();
        let (_, score) = engine.score_latest().unwrap();
        assert_eq!(
            engine.guarded_recommendations(&score).await,
            engine.recommendations(&score)
        );
    }
}
