//! Weekly Patterns
//!
//! Per-weekday statistics for a metric, with the peak-to-trough swing
//! expressed relative to the overall mean.

use crate::records::{AlignedData, MetricSeries};
use crate::stats::{mean, mean_std};
use chrono::{Datelike, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum valid observations for a weekly pattern
pub const MIN_WEEKLY_POINTS: usize = 7;

/// Minimum distinct weekdays observed
pub const MIN_WEEKDAYS: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdayStats {
    /// Full weekday name, e.g. "Monday"
    pub weekday: String,
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeeklyPattern {
    pub metric: String,
    /// Observed weekdays, Monday first
    pub weekdays: Vec<WeekdayStats>,
    pub peak_day: String,
    pub trough_day: String,
    /// (peak mean − trough mean) / overall mean × 100
    pub variation_percent: f64,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Bucket a metric's observations by weekday
pub fn weekly_pattern(data: &AlignedData, series: &MetricSeries) -> Option<WeeklyPattern> {
    let dates = data.dates();
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    let mut all = Vec::new();

    for (i, value) in series.valid_points() {
        let Some(date) = dates.get(i) else {
            continue;
        };
        buckets
            .entry(date.weekday().num_days_from_monday())
            .or_default()
            .push(value);
        all.push(value);
    }

    if all.len() < MIN_WEEKLY_POINTS || buckets.len() < MIN_WEEKDAYS {
        return None;
    }

    let overall = mean(&all)?;
    if overall == 0.0 {
        return None;
    }

    let weekdays: Vec<WeekdayStats> = buckets
        .iter()
        .filter_map(|(&offset, values)| {
            let (mean, std_dev) = mean_std(values)?;
            let day = *WEEK.get(offset as usize)?;
            Some(WeekdayStats {
                weekday: weekday_name(day).to_string(),
                mean,
                std_dev,
                count: values.len(),
            })
        })
        .collect();

    // First maximum / minimum wins, so ties resolve toward Monday
    let peak = weekdays
        .iter()
        .fold(None::<&WeekdayStats>, |best, w| match best {
            Some(b) if b.mean >= w.mean => Some(b),
            _ => Some(w),
        })?;
    let trough = weekdays
        .iter()
        .fold(None::<&WeekdayStats>, |best, w| match best {
            Some(b) if b.mean <= w.mean => Some(b),
            _ => Some(w),
        })?;

    let variation_percent = (peak.mean - trough.mean) / overall.abs() * 100.0;

    Some(WeeklyPattern {
        metric: series.name.clone(),
        peak_day: peak.weekday.clone(),
        trough_day: trough.weekday.clone(),
        variation_percent,
        weekdays,
    })
}

/// Weekly patterns for every metric whose variation reaches `min_variation` percent
pub fn weekly_patterns(data: &AlignedData, min_variation: f64) -> Vec<WeeklyPattern> {
    let mut patterns: Vec<WeeklyPattern> = data
        .series()
        .iter()
        .filter_map(|s| weekly_pattern(data, s))
        .filter(|p| p.variation_percent >= min_variation)
        .collect();

    patterns.sort_by(|a, b| {
        b.variation_percent
            .total_cmp(&a.variation_percent)
            .then_with(|| a.metric.cmp(&b.metric))
    });

    tracing::debug!(
        metrics = data.series().len(),
        patterns = patterns.len(),
        min_variation,
        "Computed weekly patterns"
    );

    patterns
}
