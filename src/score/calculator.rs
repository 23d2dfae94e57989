//! Health Score Calculator
//!
//! Scores one day of metrics per category with piecewise curves, applies
//! small cross-category bonuses and folds everything into a 0-100 composite.

use crate::anomaly::Severity;
use crate::records::{AlignedData, Category};
use crate::stats::round_to;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Category weights in percent; they sum to exactly 100
pub const WEIGHTS: [(Category, u32); 5] = [
    (Category::Sleep, 25),
    (Category::Activity, 20),
    (Category::Nutrition, 20),
    (Category::Vitals, 20),
    (Category::Wellness, 15),
];

/// Score of a category with no scored factors
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Sleep needed for the activity multiplier
const SLEEP_BONUS_HOURS: f64 = 7.0;
const SLEEP_BONUS_MULTIPLIER: f64 = 1.1;

/// Steps needed for the flat wellness bonus
const STEPS_BONUS_THRESHOLD: f64 = 7000.0;
const STEPS_BONUS_POINTS: f64 = 5.0;

/// Weight of a category as a fraction
pub fn weight_of(category: Category) -> f64 {
    WEIGHTS
        .iter()
        .find(|(c, _)| *c == category)
        .map_or(0.0, |(_, pct)| *pct as f64 / 100.0)
}

/// Scoring curve for one metric
#[derive(Debug, Clone, Copy)]
pub struct FactorCurve {
    pub metric: &'static str,
    pub category: Category,
    pub score: fn(f64) -> f64,
}

/// Every metric that feeds the score
pub const FACTOR_CURVES: &[FactorCurve] = &[
    FactorCurve { metric: "sleep_duration_hours", category: Category::Sleep, score: sleep_duration_score },
    FactorCurve { metric: "sleep_quality", category: Category::Sleep, score: ten_point_score },
    FactorCurve { metric: "deep_sleep_hours", category: Category::Sleep, score: deep_sleep_score },
    FactorCurve { metric: "steps", category: Category::Activity, score: steps_score },
    FactorCurve { metric: "active_minutes", category: Category::Activity, score: active_minutes_score },
    FactorCurve { metric: "total_calories", category: Category::Nutrition, score: calories_score },
    FactorCurve { metric: "sugar_g", category: Category::Nutrition, score: sugar_score },
    FactorCurve { metric: "protein_g", category: Category::Nutrition, score: protein_score },
    FactorCurve { metric: "water_liters", category: Category::Nutrition, score: water_score },
    FactorCurve { metric: "resting_heart_rate", category: Category::Vitals, score: resting_heart_rate_score },
    FactorCurve { metric: "hrv_ms", category: Category::Vitals, score: hrv_score },
    FactorCurve { metric: "blood_pressure_systolic", category: Category::Vitals, score: systolic_score },
    FactorCurve { metric: "mood_score", category: Category::Wellness, score: ten_point_score },
    FactorCurve { metric: "stress_level", category: Category::Wellness, score: stress_score },
    FactorCurve { metric: "energy_level", category: Category::Wellness, score: ten_point_score },
];

pub fn sleep_duration_score(hours: f64) -> f64 {
    match hours {
        h if h > 10.0 => 60.0,
        h if h > 9.0 => 80.0,
        h if h >= 7.0 => 100.0,
        h if h >= 6.0 => 70.0,
        h if h >= 5.0 => 40.0,
        _ => 20.0,
    }
}

/// 1-10 self-rated scales
pub fn ten_point_score(value: f64) -> f64 {
    (value * 10.0).clamp(0.0, 100.0)
}

pub fn deep_sleep_score(hours: f64) -> f64 {
    (hours / 1.5 * 100.0).clamp(0.0, 100.0)
}

pub fn steps_score(steps: f64) -> f64 {
    (steps / 10_000.0 * 100.0).clamp(0.0, 100.0)
}

pub fn active_minutes_score(minutes: f64) -> f64 {
    (minutes / 30.0 * 100.0).clamp(0.0, 100.0)
}

/// Full marks inside 1800-2500 kcal, one point per 10 kcal outside
pub fn calories_score(kcal: f64) -> f64 {
    let off = if kcal < 1800.0 {
        1800.0 - kcal
    } else if kcal > 2500.0 {
        kcal - 2500.0
    } else {
        0.0
    };
    (100.0 - off / 10.0).clamp(0.0, 100.0)
}

/// Full marks up to the 25g soft cap, 50 at 50g, then one point per gram
pub fn sugar_score(grams: f64) -> f64 {
    if grams <= 25.0 {
        100.0
    } else if grams <= 50.0 {
        100.0 - (grams - 25.0) * 2.0
    } else {
        (50.0 - (grams - 50.0)).max(0.0)
    }
}

pub fn protein_score(grams: f64) -> f64 {
    (grams / 50.0 * 100.0).clamp(0.0, 100.0)
}

pub fn water_score(liters: f64) -> f64 {
    (liters / 2.0 * 100.0).clamp(0.0, 100.0)
}

/// Full marks for 60-70 bpm; low rates decay slower than high ones
pub fn resting_heart_rate_score(bpm: f64) -> f64 {
    let score = if bpm < 60.0 {
        100.0 - (60.0 - bpm) * 2.0
    } else if bpm > 70.0 {
        100.0 - (bpm - 70.0) * 4.0
    } else {
        100.0
    };
    score.clamp(0.0, 100.0)
}

pub fn hrv_score(ms: f64) -> f64 {
    (ms / 60.0 * 100.0).clamp(0.0, 100.0)
}

pub fn systolic_score(mmhg: f64) -> f64 {
    let score = if mmhg > 120.0 {
        100.0 - (mmhg - 120.0) * 2.5
    } else if mmhg < 90.0 {
        100.0 - (90.0 - mmhg) * 3.0
    } else {
        100.0
    };
    score.clamp(0.0, 100.0)
}

/// Stress is inverted: 1 scores 100, 10 scores 0
pub fn stress_score(level: f64) -> f64 {
    ((10.0 - level) / 9.0 * 100.0).clamp(0.0, 100.0)
}

/// One scored input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Factor {
    pub value: f64,
    pub score: f64,
}

/// Score of one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    pub score: f64,
    /// Fraction of the composite
    pub weight: f64,
    pub factors: BTreeMap<String, Factor>,
}

impl CategoryScore {
    /// Mean factor score before bonuses
    pub fn base_score(&self) -> f64 {
        if self.factors.is_empty() {
            return NEUTRAL_SCORE;
        }
        self.factors.values().map(|f| f.score).sum::<f64>() / self.factors.len() as f64
    }

    pub fn factor(&self, metric: &str) -> Option<&Factor> {
        self.factors.get(metric)
    }

    /// Weighted room for improvement
    pub fn headroom(&self) -> f64 {
        self.weight * (100.0 - self.score)
    }
}

pub type ScoreBreakdown = BTreeMap<Category, CategoryScore>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Positive,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    /// Composite in [0, 100]
    pub score: u8,
    pub breakdown: ScoreBreakdown,
    pub insights: Vec<Insight>,
}

impl ScoreResult {
    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.breakdown.get(&category)
    }
}

/// Score a day's metric values
///
/// Metric names may carry a category prefix (`vitals_resting_heart_rate`)
/// when the aligner disambiguated a collision.
pub fn score_metrics(values: &BTreeMap<String, f64>) -> ScoreResult {
    let lookup = |curve: &FactorCurve| {
        values
            .get(&format!("{}_{}", curve.category, curve.metric))
            .or_else(|| values.get(curve.metric))
            .copied()
            .filter(|v| v.is_finite())
    };

    let mut breakdown: ScoreBreakdown = WEIGHTS
        .iter()
        .map(|(category, _)| {
            (
                *category,
                CategoryScore {
                    score: NEUTRAL_SCORE,
                    weight: weight_of(*category),
                    factors: BTreeMap::new(),
                },
            )
        })
        .collect();

    for curve in FACTOR_CURVES {
        if let Some(value) = lookup(curve) {
            if let Some(entry) = breakdown.get_mut(&curve.category) {
                entry.factors.insert(
                    curve.metric.to_string(),
                    Factor {
                        value,
                        score: (curve.score)(value),
                    },
                );
            }
        }
    }

    for entry in breakdown.values_mut() {
        entry.score = entry.base_score();
    }

    apply_bonuses(&mut breakdown);

    for entry in breakdown.values_mut() {
        entry.score = round_to(entry.score.clamp(0.0, 100.0), 1);
    }

    let composite: f64 = WEIGHTS
        .iter()
        .filter_map(|(category, pct)| breakdown.get(category).map(|c| c.score * *pct as f64))
        .sum::<f64>()
        / 100.0;
    let score = composite.round().clamp(0.0, 100.0) as u8;

    let insights = generate_insights(&breakdown);

    ScoreResult {
        score,
        breakdown,
        insights,
    }
}

fn factor_value(breakdown: &ScoreBreakdown, category: Category, metric: &str) -> Option<f64> {
    breakdown
        .get(&category)
        .and_then(|c| c.factor(metric))
        .map(|f| f.value)
}

/// Cross-category bonuses, only for categories that were actually scored
fn apply_bonuses(breakdown: &mut ScoreBreakdown) {
    let sleep = factor_value(breakdown, Category::Sleep, "sleep_duration_hours");
    let steps = factor_value(breakdown, Category::Activity, "steps");

    if sleep.is_some_and(|h| h >= SLEEP_BONUS_HOURS) {
        if let Some(activity) = breakdown.get_mut(&Category::Activity) {
            if !activity.factors.is_empty() {
                activity.score = (activity.score * SLEEP_BONUS_MULTIPLIER).min(100.0);
            }
        }
    }

    if steps.is_some_and(|s| s >= STEPS_BONUS_THRESHOLD) {
        if let Some(wellness) = breakdown.get_mut(&Category::Wellness) {
            if !wellness.factors.is_empty() {
                wellness.score = (wellness.score + STEPS_BONUS_POINTS).min(100.0);
            }
        }
    }
}

fn generate_insights(breakdown: &ScoreBreakdown) -> Vec<Insight> {
    let mut insights = Vec::new();

    for (category, entry) in breakdown {
        if entry.factors.is_empty() {
            continue;
        }
        if entry.score >= 85.0 {
            insights.push(Insight {
                kind: InsightKind::Positive,
                message: format!("{} is a strength today ({:.0}/100)", title(*category), entry.score),
                severity: Severity::Low,
            });
        } else if entry.score < 50.0 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                message: format!("{} needs attention ({:.0}/100)", title(*category), entry.score),
                severity: if entry.score < 30.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
            });
        }
    }

    if let Some(hours) = factor_value(breakdown, Category::Sleep, "sleep_duration_hours") {
        if hours < 6.0 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                message: format!("Only {:.1}h of sleep; under 6h affects recovery and mood", hours),
                severity: if hours < 5.0 { Severity::High } else { Severity::Medium },
            });
        }
    }

    if let Some(sugar) = factor_value(breakdown, Category::Nutrition, "sugar_g") {
        if sugar > 50.0 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                message: format!("Sugar intake of {:.0}g is double the 25g soft cap", sugar),
                severity: Severity::Medium,
            });
        }
    }

    if let Some(steps) = factor_value(breakdown, Category::Activity, "steps") {
        if steps >= 10_000.0 {
            insights.push(Insight {
                kind: InsightKind::Positive,
                message: format!("Hit the 10,000 step target with {:.0} steps", steps),
                severity: Severity::Low,
            });
        }
    }

    if let Some(stress) = factor_value(breakdown, Category::Wellness, "stress_level") {
        if stress >= 8.0 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                message: format!("Stress level {:.0}/10 is high", stress),
                severity: Severity::High,
            });
        }
    }

    if breakdown.values().all(|c| c.factors.is_empty()) {
        insights.push(Insight {
            kind: InsightKind::Info,
            message: "No scored metrics for this day; every category is neutral".to_string(),
            severity: Severity::Low,
        });
    }

    insights
}

fn title(category: Category) -> &'static str {
    match category {
        Category::Sleep => "Sleep",
        Category::Nutrition => "Nutrition",
        Category::Activity => "Activity",
        Category::Vitals => "Vitals",
        Category::Wellness => "Wellness",
    }
}

/// Scores days from an aligned snapshot
pub struct HealthScoreCalculator {
    data: Arc<AlignedData>,
    lookback_days: u32,
}

impl HealthScoreCalculator {
    pub fn new(data: Arc<AlignedData>, lookback_days: u32) -> Self {
        Self {
            data,
            lookback_days,
        }
    }

    /// Each metric's value on `date`, or its most recent value within the
    /// lookback window
    pub fn day_snapshot(&self, date: NaiveDate) -> BTreeMap<String, f64> {
        let dates = self.data.dates();
        let earliest = date - Duration::days(self.lookback_days as i64);
        let end = dates.partition_point(|d| *d <= date);

        let mut snapshot = BTreeMap::new();
        for series in self.data.series() {
            let latest = (0..end)
                .rev()
                .take_while(|&i| dates[i] >= earliest)
                .find_map(|i| series.get(i));
            if let Some(value) = latest {
                snapshot.insert(series.name.clone(), value);
            }
        }
        snapshot
    }

    /// Score a date; `None` if nothing was recorded within the lookback
    pub fn score_for_date(&self, date: NaiveDate) -> Option<ScoreResult> {
        let snapshot = self.day_snapshot(date);
        if snapshot.is_empty() {
            return None;
        }
        let result = score_metrics(&snapshot);
        tracing::debug!(date = %date, metrics = snapshot.len(), score = result.score, "Scored day");
        Some(result)
    }

    /// Score the most recent date in the snapshot
    pub fn score_latest(&self) -> Option<(NaiveDate, ScoreResult)> {
        let date = *self.data.dates().last()?;
        self.score_for_date(date).map(|r| (date, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DailyRecord, RecordSet};

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert_eq!(WEIGHTS.iter().map(|(_, p)| p).sum::<u32>(), 100);
        let total: f64 = Category::all().iter().map(|c| weight_of(*c)).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sleep_duration_curve() {
        assert_eq!(sleep_duration_score(8.0), 100.0);
        assert_eq!(sleep_duration_score(9.5), 80.0);
        assert_eq!(sleep_duration_score(6.5), 70.0);
        assert_eq!(sleep_duration_score(5.5), 40.0);
        assert_eq!(sleep_duration_score(4.0), 20.0);
        assert_eq!(sleep_duration_score(11.0), 60.0);
    }

    #[test]
    fn test_factor_curves() {
        assert_eq!(steps_score(5_000.0), 50.0);
        assert_eq!(steps_score(15_000.0), 100.0);
        assert_eq!(resting_heart_rate_score(65.0), 100.0);
        assert!(resting_heart_rate_score(80.0) < resting_heart_rate_score(72.0));
        assert_eq!(sugar_score(20.0), 100.0);
        assert_eq!(sugar_score(50.0), 50.0);
        assert_eq!(stress_score(1.0), 100.0);
        assert_eq!(stress_score(10.0), 0.0);
    }

    #[test]
    fn test_empty_day_is_neutral() {
        let result = score_metrics(&BTreeMap::new());
        assert_eq!(result.score, 50);
        assert!(result.breakdown.values().all(|c| c.score == NEUTRAL_SCORE));
        assert_eq!(result.insights.len(), 1);
        assert_eq!(result.insights[0].kind, InsightKind::Info);
    }

    #[test]
    fn test_bonuses() {
        let result = score_metrics(&metrics(&[
            ("sleep_duration_hours", 8.0),
            ("steps", 8_000.0),
            ("mood_score", 7.0),
        ]));

        // 80 × 1.1
        assert_eq!(result.category(Category::Activity).unwrap().score, 88.0);
        // 70 + 5
        assert_eq!(result.category(Category::Wellness).unwrap().score, 75.0);
    }

    #[test]
    fn test_activity_multiplier_is_capped() {
        let result = score_metrics(&metrics(&[("sleep_duration_hours", 8.0), ("steps", 12_000.0)]));
        assert_eq!(result.category(Category::Activity).unwrap().score, 100.0);
    }

    #[test]
    fn test_composite_is_weighted() {
        let result = score_metrics(&metrics(&[
            ("sleep_duration_hours", 8.0),
            ("steps", 10_000.0),
            ("total_calories", 2_000.0),
            ("resting_heart_rate", 65.0),
            ("mood_score", 10.0),
        ]));
        assert_eq!(result.score, 100);

        let result = score_metrics(&metrics(&[("sleep_duration_hours", 4.0)]));
        // 20×.25 + 50×.20×3 + 50×.15
        assert_eq!(result.score, 43);
    }

    #[test]
    fn test_score_bounds_for_extreme_values() {
        let result = score_metrics(&metrics(&[
            ("sleep_duration_hours", 0.0),
            ("steps", -5.0),
            ("sugar_g", 500.0),
            ("resting_heart_rate", 200.0),
            ("stress_level", 10.0),
        ]));
        assert!(result.score <= 100);
        assert!(result
            .breakdown
            .values()
            .all(|c| (0.0..=100.0).contains(&c.score)));
    }

    #[test]
    fn test_prefixed_metric_names_are_scored() {
        let result = score_metrics(&metrics(&[("vitals_resting_heart_rate", 65.0)]));
        assert!(result
            .category(Category::Vitals)
            .unwrap()
            .factor("resting_heart_rate")
            .is_some());
    }

    #[test]
    fn test_low_sleep_insight() {
        let result = score_metrics(&metrics(&[("sleep_duration_hours", 4.5)]));
        assert!(result
            .insights
            .iter()
            .any(|i| i.kind == InsightKind::Warning && i.severity == Severity::High));
    }

    #[test]
    fn test_day_snapshot_carries_forward() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut records = RecordSet::new();
        for d in 0..10i64 {
            let date = start + Duration::days(d);
            records.push(DailyRecord::new(date, Category::Activity).field("steps", 9_000.0));
            if d < 7 {
                records.push(
                    DailyRecord::new(date, Category::Sleep).field("sleep_duration_hours", 7.5),
                );
            }
        }
        let calculator = HealthScoreCalculator::new(Arc::new(AlignedData::align(&records)), 3);

        // Day 9 is 3 days after the last sleep record
        let day9 = calculator.day_snapshot(start + Duration::days(9));
        assert_eq!(day9.get("sleep_duration_hours"), Some(&7.5));

        let calculator = HealthScoreCalculator {
            lookback_days: 1,
            ..calculator
        };
        let day9 = calculator.day_snapshot(start + Duration::days(9));
        assert!(day9.get("sleep_duration_hours").is_none());
        assert_eq!(day9.get("steps"), Some(&9_000.0));
    }

    #[test]
    fn test_score_latest() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut records = RecordSet::new();
        for d in 0..6i64 {
            records.push(
                DailyRecord::new(date + Duration::days(d), Category::Sleep)
                    .field("sleep_duration_hours", 8.0),
            );
        }
        let calculator = HealthScoreCalculator::new(Arc::new(AlignedData::align(&records)), 3);
        let (latest, result) = calculator.score_latest().unwrap();
        assert_eq!(latest, date + Duration::days(5));
        assert_eq!(result.category(Category::Sleep).unwrap().score, 100.0);
        assert!(calculator.score_for_date(date - Duration::days(30)).is_none());
    }
}
