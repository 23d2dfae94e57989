//! Anomaly Detector
//!
//! Flags days where a metric leaves its personal baseline.
//!
//! # Detection Pipeline
//!
//! ```text
//! series → baseline (fixed or rolling) → z-score + practical filter
//!        → consecutive-day runs → severity → cross-metric ranking
//! ```

use super::thresholds::{is_excluded_metric, is_practically_significant, MetricClass};
use crate::records::{AlignedData, Category, MetricSeries};
use crate::stats::mean_std;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// A fixed baseline needs at least this many valid points
pub const MIN_BASELINE_POINTS: usize = 10;

/// z-scores at or above this need no practical-significance check
const EXTREME_Z: f64 = 3.5;

/// Coarse classification of an anomaly's extremity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// high > 3.0, medium > 2.5, low otherwise
    pub fn from_z_score(z: f64) -> Self {
        if z > 3.0 {
            Severity::High
        } else if z > 2.5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Weight used in cross-metric ranking
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Where the "normal" for a day comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BaselineMethod {
    /// First `baseline_days` valid values
    #[default]
    Fixed,
    /// Trailing `rolling_window` valid values before each day
    Rolling,
}

/// Anomaly detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    #[serde(default = "default_baseline_days")]
    pub baseline_days: usize,

    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// z-score a candidate must exceed
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Lower bound on the run length required by any metric class
    #[serde(default = "default_min_consecutive")]
    pub min_consecutive: usize,

    #[serde(default)]
    pub method: BaselineMethod,

    /// Findings returned by `detect_all_anomalies`
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
}

fn default_baseline_days() -> usize {
    14
}

fn default_rolling_window() -> usize {
    7
}

fn default_threshold() -> f64 {
    1.8
}

fn default_min_consecutive() -> usize {
    2
}

fn default_max_findings() -> usize {
    3
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            baseline_days: default_baseline_days(),
            rolling_window: default_rolling_window(),
            threshold: default_threshold(),
            min_consecutive: default_min_consecutive(),
            method: BaselineMethod::default(),
            max_findings: default_max_findings(),
        }
    }
}

/// Mean and standard deviation of a reference window
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    pub std_dev: f64,
}

impl Baseline {
    /// Baseline over a window of values; `None` for an empty window
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let (mean, std_dev) = mean_std(values)?;
        Some(Self { mean, std_dev })
    }

    /// |value − mean| / stdDev, only defined when stdDev > 0
    pub fn z_score(&self, value: f64) -> Option<f64> {
        (self.std_dev > 0.0).then(|| (value - self.mean).abs() / self.std_dev)
    }
}

/// One anomalous day
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnomalyEvent {
    pub metric: String,
    pub date: NaiveDate,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
    /// Signed distance from the baseline mean
    pub deviation: f64,
    pub severity: Severity,
}

/// A run of anomalous days for one metric
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnomalyFinding {
    pub metric: String,
    pub label: String,
    pub category: Category,
    pub occurrences: Vec<AnomalyEvent>,
    pub consecutive_days: usize,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    /// Highest severity among the occurrences
    pub severity: Severity,
}

impl AnomalyFinding {
    fn from_run(series: &MetricSeries, occurrences: Vec<AnomalyEvent>) -> Option<Self> {
        let first = occurrences.first()?;
        let severity = occurrences
            .iter()
            .map(|e| e.severity)
            .max()
            .unwrap_or(Severity::Low);

        Some(Self {
            metric: series.name.clone(),
            label: series.label.clone(),
            category: series.category,
            baseline_mean: first.mean,
            baseline_std_dev: first.std_dev,
            consecutive_days: occurrences.len(),
            occurrences,
            severity,
        })
    }

    /// Largest z-score in the run
    pub fn peak_z_score(&self) -> f64 {
        self.occurrences
            .iter()
            .map(|e| e.z_score)
            .fold(0.0, f64::max)
    }

    /// Date of the last occurrence
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.occurrences.iter().map(|e| e.date).max()
    }

    /// 3×severity + 2×z + run length + category priority
    pub fn rank_score(&self) -> f64 {
        3.0 * self.severity.weight()
            + 2.0 * self.peak_z_score()
            + self.consecutive_days as f64
            + self.category.priority() as f64
    }
}

/// Detects baseline anomalies across aligned metrics
pub struct AnomalyDetector {
    data: Arc<AlignedData>,
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(data: Arc<AlignedData>, config: AnomalyConfig) -> Self {
        Self { data, config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Detect anomalies in every metric and return the top-ranked findings
    ///
    /// At most one finding per category, at most `max_findings` overall.
    pub fn detect_all_anomalies(&self) -> Vec<AnomalyFinding> {
        let findings: Vec<AnomalyFinding> = self
            .data
            .series()
            .iter()
            .flat_map(|s| self.detect_series(s))
            .collect();

        let total = findings.len();
        let ranked = rank_findings(findings, self.config.max_findings);

        tracing::debug!(
            metrics = self.data.series().len(),
            candidates = total,
            reported = ranked.len(),
            "Detected anomalies"
        );

        ranked
    }

    /// All findings for one metric, in date order
    ///
    /// Unknown or excluded metrics yield no findings.
    pub fn detect_metric_anomalies(&self, metric: &str) -> Vec<AnomalyFinding> {
        self.data
            .metric(metric)
            .map(|s| self.detect_series(s))
            .unwrap_or_default()
    }

    fn detect_series(&self, series: &MetricSeries) -> Vec<AnomalyFinding> {
        if is_excluded_metric(&series.field) {
            return Vec::new();
        }

        let events = match self.config.method {
            BaselineMethod::Fixed => self.fixed_candidates(series),
            BaselineMethod::Rolling => self.rolling_candidates(series),
        };

        let required = MetricClass::of(&series.field)
            .min_run()
            .max(self.config.min_consecutive);

        group_runs(events)
            .into_iter()
            .filter_map(|run| {
                if run.len() >= required {
                    return AnomalyFinding::from_run(series, run);
                }

                // Sudden severe spikes are reported even without duration
                let peak = run
                    .into_iter()
                    .max_by(|a, b| a.z_score.partial_cmp(&b.z_score).unwrap_or(Ordering::Equal))?;
                let severe = peak.z_score > 2.5
                    || (peak.z_score > 2.0
                        && is_practically_significant(&series.field, peak.deviation));
                if severe {
                    AnomalyFinding::from_run(series, vec![peak])
                } else {
                    None
                }
            })
            .collect()
    }

    fn fixed_candidates(&self, series: &MetricSeries) -> Vec<AnomalyEvent> {
        let points: Vec<(usize, f64)> = series.valid_points().collect();
        let baseline_days = self.config.baseline_days;

        // The baseline plus at least one day to evaluate
        if points.len() <= baseline_days || baseline_days < MIN_BASELINE_POINTS {
            return Vec::new();
        }

        let window: Vec<f64> = points[..baseline_days].iter().map(|(_, v)| *v).collect();
        let Some(baseline) = Baseline::from_values(&window) else {
            return Vec::new();
        };
        if baseline.std_dev <= 0.0 {
            tracing::trace!(metric = %series.name, "Skipping degenerate baseline");
            return Vec::new();
        }

        points[baseline_days..]
            .iter()
            .filter_map(|&(i, value)| self.evaluate(series, i, value, &baseline))
            .collect()
    }

    fn rolling_candidates(&self, series: &MetricSeries) -> Vec<AnomalyEvent> {
        let points: Vec<(usize, f64)> = series.valid_points().collect();
        let window = self.config.rolling_window.max(2);

        if points.len() <= self.config.baseline_days || points.len() <= window {
            return Vec::new();
        }

        (window..points.len())
            .filter_map(|k| {
                let trailing: Vec<f64> = points[k - window..k].iter().map(|(_, v)| *v).collect();
                let baseline = Baseline::from_values(&trailing)?;
                let (i, value) = points[k];
                self.evaluate(series, i, value, &baseline)
            })
            .collect()
    }

    fn evaluate(
        &self,
        series: &MetricSeries,
        index: usize,
        value: f64,
        baseline: &Baseline,
    ) -> Option<AnomalyEvent> {
        let z_score = baseline.z_score(value)?;
        let deviation = value - baseline.mean;

        if z_score <= self.config.threshold {
            return None;
        }
        if z_score < EXTREME_Z && !is_practically_significant(&series.field, deviation) {
            return None;
        }

        Some(AnomalyEvent {
            metric: series.name.clone(),
            date: *self.data.dates().get(index)?,
            value,
            mean: baseline.mean,
            std_dev: baseline.std_dev,
            z_score,
            deviation,
            severity: Severity::from_z_score(z_score),
        })
    }
}

/// Split date-ordered events into runs of consecutive calendar days
fn group_runs(events: Vec<AnomalyEvent>) -> Vec<Vec<AnomalyEvent>> {
    let mut runs: Vec<Vec<AnomalyEvent>> = Vec::new();

    for event in events {
        match runs.last_mut() {
            Some(run)
                if run
                    .last()
                    .map_or(false, |prev| prev.date + Duration::days(1) == event.date) =>
            {
                run.push(event);
            }
            _ => runs.push(vec![event]),
        }
    }

    runs
}

/// Rank findings by score (ties: most recent first), keep one per category
pub fn rank_findings(mut findings: Vec<AnomalyFinding>, limit: usize) -> Vec<AnomalyFinding> {
    findings.sort_by(|a, b| {
        b.rank_score()
            .partial_cmp(&a.rank_score())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.latest_date().cmp(&a.latest_date()))
            .then_with(|| a.metric.cmp(&b.metric))
    });

    let mut seen: HashSet<Category> = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert(f.category))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DailyRecord, RecordSet};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() + Duration::days(offset)
    }

    /// Baseline alternating around `center` by ±`spread`, then `tail` values
    fn series_records(
        category: Category,
        metric: &str,
        center: f64,
        spread: f64,
        tail: &[f64],
    ) -> Vec<DailyRecord> {
        let mut records = Vec::new();
        for i in 0..14 {
            let v = if i % 2 == 0 { center - spread } else { center + spread };
            records.push(DailyRecord::new(day(i), category).field(metric, v));
        }
        for (k, v) in tail.iter().enumerate() {
            records.push(DailyRecord::new(day(14 + k as i64), category).field(metric, *v));
        }
        records
    }

    fn detector(set: &RecordSet) -> AnomalyDetector {
        AnomalyDetector::new(Arc::new(AlignedData::align(set)), AnomalyConfig::default())
    }

    #[test]
    fn test_z_score_at_two_std_devs() {
        let baseline = Baseline {
            mean: 7.0,
            std_dev: 0.5,
        };
        let z = baseline.z_score(7.0 + 2.0 * 0.5).unwrap();
        assert!((z - 2.0).abs() < 1e-12);

        let degenerate = Baseline {
            mean: 7.0,
            std_dev: 0.0,
        };
        assert_eq!(degenerate.z_score(9.0), None);
    }

    #[test]
    fn test_severe_single_day_sleep_drop() {
        // 14 baseline days around 7.0h, then 3.0h on day 15
        let mut set = RecordSet::new();
        set.extend(series_records(
            Category::Sleep,
            "sleep_duration_hours",
            7.0,
            0.01,
            &[3.0],
        ));
        assert_eq!(set.len(), 15);

        let findings = detector(&set).detect_all_anomalies();
        assert_eq!(findings.len(), 1);

        let finding = &findings[0];
        assert_eq!(finding.metric, "sleep_duration_hours");
        assert_eq!(finding.consecutive_days, 1);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.occurrences[0].date, day(14));
        assert!((finding.baseline_mean - 7.0).abs() < 1e-9);
        assert!(finding.occurrences[0].deviation < 0.0);
    }

    #[test]
    fn test_excluded_metric_never_reported() {
        let mut set = RecordSet::new();
        set.extend(series_records(
            Category::Nutrition,
            "caffeine_cups",
            2.0,
            0.5,
            &[12.0, 15.0, 14.0, 13.0],
        ));

        assert!(detector(&set).detect_all_anomalies().is_empty());
        assert!(detector(&set)
            .detect_metric_anomalies("caffeine_cups")
            .is_empty());
    }

    #[test]
    fn test_excluded_field_shared_across_categories() {
        let mut set = RecordSet::new();
        set.extend(series_records(Category::Sleep, "caffeine_cups", 1.0, 0.5, &[1.0]));
        set.extend(series_records(
            Category::Nutrition,
            "caffeine_cups",
            2.0,
            0.5,
            &[12.0, 12.0, 12.0, 12.0],
        ));

        let detector = detector(&set);
        assert!(detector.data.metric("nutrition_caffeine_cups").is_some());
        assert!(detector.detect_all_anomalies().is_empty());
        assert!(detector
            .detect_metric_anomalies("nutrition_caffeine_cups")
            .is_empty());
    }

    #[test]
    fn test_qualified_metric_keeps_practical_minimum() {
        // Both categories record resting_heart_rate; the vitals one is qualified
        let mut set = RecordSet::new();
        set.extend(series_records(Category::Sleep, "resting_heart_rate", 55.0, 1.0, &[55.0]));
        set.extend(series_records(
            Category::Vitals,
            "resting_heart_rate",
            60.0,
            2.5,
            &[67.0, 67.0, 60.0],
        ));

        let findings = detector(&set).detect_metric_anomalies("vitals_resting_heart_rate");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].consecutive_days, 2);
    }

    #[test]
    fn test_constant_baseline_is_skipped() {
        let mut set = RecordSet::new();
        set.extend(series_records(
            Category::Sleep,
            "sleep_duration_hours",
            7.0,
            0.0,
            &[3.0, 7.0],
        ));

        assert!(detector(&set).detect_all_anomalies().is_empty());
    }

    #[test]
    fn test_insufficient_points_is_skipped() {
        let mut set = RecordSet::new();
        // Baseline only, nothing left to evaluate
        set.extend(series_records(
            Category::Sleep,
            "sleep_duration_hours",
            7.0,
            0.1,
            &[],
        ));

        assert!(detector(&set).detect_all_anomalies().is_empty());
    }

    #[test]
    fn test_short_baseline_is_skipped() {
        let mut set = RecordSet::new();
        set.extend(series_records(
            Category::Sleep,
            "sleep_duration_hours",
            7.0,
            0.1,
            &[3.0],
        ));

        let config = AnomalyConfig {
            baseline_days: MIN_BASELINE_POINTS - 1,
            ..AnomalyConfig::default()
        };
        let detector = AnomalyDetector::new(Arc::new(AlignedData::align(&set)), config);
        assert!(detector.detect_all_anomalies().is_empty());
    }

    #[test]
    fn test_unpractical_moderate_deviation_is_ignored() {
        let mut set = RecordSet::new();
        // z = 3 but only 0.3 bpm away from baseline
        set.extend(series_records(
            Category::Vitals,
            "resting_heart_rate",
            60.0,
            0.1,
            &[60.3, 60.3, 60.0],
        ));

        assert!(detector(&set).detect_all_anomalies().is_empty());
    }

    #[test]
    fn test_fast_vital_two_day_run() {
        let mut set = RecordSet::new();
        // 2.8 sigma, 7 bpm: candidate by practical significance, not severe alone
        set.extend(series_records(
            Category::Vitals,
            "resting_heart_rate",
            60.0,
            2.5,
            &[67.0, 67.0, 60.0],
        ));

        let findings = detector(&set).detect_all_anomalies();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].consecutive_days, 2);
        assert_eq!(findings[0].occurrences[1].date, day(15));
    }

    #[test]
    fn test_body_composition_needs_a_week() {
        // z = 2.2 and 2 kg above baseline: practical but not severe
        let short_run = [62.2, 62.2, 62.2, 60.0];
        let mut set = RecordSet::new();
        set.extend(series_records(
            Category::Vitals,
            "weight_kg",
            60.0,
            1.0,
            &short_run,
        ));
        let findings = detector(&set).detect_all_anomalies();
        assert_eq!(findings.len(), 1);
        // Reported only through the single-day escape hatch
        assert_eq!(findings[0].consecutive_days, 1);

        let long_run = [62.2; 7];
        let mut set = RecordSet::new();
        set.extend(series_records(Category::Vitals, "weight_kg", 60.0, 1.0, &long_run));
        let findings = detector(&set).detect_all_anomalies();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].consecutive_days, 7);
    }

    #[test]
    fn test_rolling_baseline_detects_spike() {
        let mut set = RecordSet::new();
        set.extend(series_records(
            Category::Sleep,
            "sleep_duration_hours",
            7.0,
            0.1,
            &[7.1, 6.9, 2.5, 7.0],
        ));

        let config = AnomalyConfig {
            method: BaselineMethod::Rolling,
            ..AnomalyConfig::default()
        };
        let detector = AnomalyDetector::new(Arc::new(AlignedData::align(&set)), config);
        let findings = detector.detect_metric_anomalies("sleep_duration_hours");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].occurrences[0].date, day(16));
    }

    fn finding(metric: &str, category: Category, date: NaiveDate) -> AnomalyFinding {
        let event = AnomalyEvent {
            metric: metric.to_string(),
            date,
            value: 10.0,
            mean: 5.0,
            std_dev: 1.0,
            z_score: 5.0,
            deviation: 5.0,
            severity: Severity::High,
        };
        AnomalyFinding {
            metric: metric.to_string(),
            label: metric.to_string(),
            category,
            occurrences: vec![event],
            consecutive_days: 1,
            baseline_mean: 5.0,
            baseline_std_dev: 1.0,
            severity: Severity::High,
        }
    }

    #[test]
    fn test_ranking_prefers_category_priority() {
        let findings = vec![
            finding("steps", Category::Activity, day(20)),
            finding("total_calories", Category::Nutrition, day(20)),
            finding("sleep_duration_hours", Category::Sleep, day(20)),
            finding("mood_score", Category::Wellness, day(20)),
            finding("resting_heart_rate", Category::Vitals, day(20)),
        ];

        let ranked = rank_findings(findings, 5);
        let order: Vec<Category> = ranked.iter().map(|f| f.category).collect();
        assert_eq!(
            order,
            vec![
                Category::Vitals,
                Category::Sleep,
                Category::Wellness,
                Category::Nutrition,
                Category::Activity
            ]
        );
    }

    #[test]
    fn test_ranking_one_per_category_and_recent_first() {
        let findings = vec![
            finding("hrv_ms", Category::Vitals, day(10)),
            finding("resting_heart_rate", Category::Vitals, day(12)),
            finding("steps", Category::Activity, day(3)),
        ];

        let ranked = rank_findings(findings, 3);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].metric, "resting_heart_rate");
        assert_eq!(ranked[1].metric, "steps");
    }

    #[test]
    fn test_ranking_truncates_to_limit() {
        let findings = vec![
            finding("steps", Category::Activity, day(1)),
            finding("total_calories", Category::Nutrition, day(1)),
            finding("sleep_duration_hours", Category::Sleep, day(1)),
            finding("mood_score", Category::Wellness, day(1)),
        ];
        assert_eq!(rank_findings(findings, 3).len(), 3);
    }

    #[test]
    fn test_severity_tiers() {
        assert_eq!(Severity::from_z_score(3.1), Severity::High);
        assert_eq!(Severity::from_z_score(3.0), Severity::Medium);
        assert_eq!(Severity::from_z_score(2.6), Severity::Medium);
        assert_eq!(Severity::from_z_score(2.5), Severity::Low);
    }
}
