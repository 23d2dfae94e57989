//! Series Alignment
//!
//! Turns per-category record lists into date-indexed numeric series.
//!
//! ```text
//! RecordSet → master date index (sorted union) → MetricSeries per (category, field)
//! ```
//!
//! Every series has exactly one slot per master date, so index `i` in any
//! two series refers to the same calendar day. Missing days are `None`.

use super::types::{Category, FieldValue, RecordSet};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

/// A series is kept only with more than this many valid points
pub const MIN_SERIES_POINTS: usize = 5;

/// Clock-time fields whose names do not contain "time"
const CLOCK_FIELDS: &[&str] = &[
    "bedtime",
    "wake_time",
    "wakeup",
    "caffeine_last_time",
    "breakfast_time",
    "lunch_time",
    "dinner_time",
    "last_meal_time",
    "workout_time",
    "sleep_onset",
];

/// One numeric metric aligned to the master date index
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricSeries {
    /// Category the metric came from
    pub category: Category,
    /// Unique metric name (the field name, category-qualified on collision)
    pub name: String,
    /// Field name as recorded; lookup tables are keyed by this
    pub field: String,
    /// Human-readable label
    pub label: String,
    /// One slot per master date; `None` means absent
    pub values: Vec<Option<f64>>,
}

impl MetricSeries {
    /// Value at a master index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Number of present values
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Present values with their master index, in date order
    pub fn valid_points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
    }

    /// Present values in date order
    pub fn valid_values(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    /// Values of both series at indices where both are present
    pub fn paired_with(&self, other: &MetricSeries) -> (Vec<f64>, Vec<f64>) {
        self.values
            .iter()
            .zip(other.values.iter())
            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
            .unzip()
    }
}

/// Aligned snapshot of every usable metric
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlignedData {
    dates: Vec<NaiveDate>,
    series: Vec<MetricSeries>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AlignedData {
    /// Align a record-set into date-indexed series
    pub fn align(records: &RecordSet) -> Self {
        let dates: Vec<NaiveDate> = records
            .iter()
            .flat_map(|(_, list)| list.iter().map(|r| r.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let positions: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut series = Vec::new();
        let mut used_names: HashSet<String> = HashSet::new();
        let mut omitted = 0usize;

        for (category, list) in records.iter() {
            let mut fields: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();

            for record in list {
                let Some(&pos) = positions.get(&record.date) else {
                    continue;
                };
                for (name, value) in &record.fields {
                    let slots = fields
                        .entry(name.as_str())
                        .or_insert_with(|| vec![None; dates.len()]);
                    if let Some(v) = numeric_value(name, value) {
                        slots[pos] = Some(v);
                    }
                }
            }

            for (field, values) in fields {
                let valid = values.iter().filter(|v| v.is_some()).count();
                if valid <= MIN_SERIES_POINTS {
                    omitted += 1;
                    continue;
                }

                let name = if used_names.contains(field) {
                    format!("{}_{}", category.as_str(), field)
                } else {
                    field.to_string()
                };
                used_names.insert(name.clone());

                series.push(MetricSeries {
                    category,
                    label: humanize(field),
                    field: field.to_string(),
                    name,
                    values,
                });
            }
        }

        tracing::debug!(
            dates = dates.len(),
            metrics = series.len(),
            omitted,
            "Aligned record-set"
        );

        let index = series
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();

        Self {
            dates,
            series,
            index,
        }
    }

    /// Master date index (sorted, distinct)
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// All aligned series
    pub fn series(&self) -> &[MetricSeries] {
        &self.series
    }

    /// Look up a series by metric name
    pub fn metric(&self, name: &str) -> Option<&MetricSeries> {
        self.index.get(name).map(|&i| &self.series[i])
    }

    /// Metric names in canonical order
    pub fn metric_names(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }

    /// Master index of a calendar date
    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Number of aligned metrics
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn numeric_value(name: &str, value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(_) => value.as_number(),
        FieldValue::Text(text) if is_clock_field(name) => parse_clock_time(text),
        FieldValue::Text(_) => None,
    }
}

/// Whether a field holds a clock time rather than a quantity
pub fn is_clock_field(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("time") || CLOCK_FIELDS.contains(&lower.as_str())
}

fn clock_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([aApP][mM])?$").ok())
        .as_ref()
}

/// Parse "HH:MM" (optionally with seconds or am/pm) or decimal hours into
/// a decimal-hour value in [0, 24).
///
/// "14:45" → 14.75, "7:30 pm" → 19.5, "6.25" → 6.25
pub fn parse_clock_time(raw: &str) -> Option<f64> {
    let raw = raw.trim();

    if let Ok(hours) = raw.parse::<f64>() {
        return (hours.is_finite() && (0.0..24.0).contains(&hours)).then_some(hours);
    }

    let caps = clock_pattern()?.captures(raw)?;
    let mut hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    if let Some(meridiem) = caps.get(4) {
        if hours == 0 || hours > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hours = match (pm, hours) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    if hours >= 24 || minutes >= 60 || seconds >= 60 {
        return None;
    }

    Some(hours as f64 + minutes as f64 / 60.0 + seconds as f64 / 3600.0)
}

/// "sleep_duration_hours" → "Sleep Duration Hours"
pub fn humanize(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DailyRecord;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn sleep_set(days: u32) -> RecordSet {
        let mut set = RecordSet::new();
        for d in 1..=days {
            set.push(
                DailyRecord::new(day(d), Category::Sleep)
                    .field("sleep_duration_hours", 6.0 + d as f64 * 0.1)
                    .field("bedtime", format!("23:{:02}", d).as_str()),
            );
        }
        set
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("14:45"), Some(14.75));
        assert_eq!(parse_clock_time("07:30"), Some(7.5));
        assert_eq!(parse_clock_time("6.25"), Some(6.25));
        assert_eq!(parse_clock_time("7:30 pm"), Some(19.5));
        assert_eq!(parse_clock_time("12:00 AM"), Some(0.0));
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("10:75"), None);
        assert_eq!(parse_clock_time("late"), None);
        assert_eq!(parse_clock_time("30"), None);
    }

    #[test]
    fn test_is_clock_field() {
        assert!(is_clock_field("bedtime"));
        assert!(is_clock_field("wake_time"));
        assert!(is_clock_field("dinner_time"));
        assert!(is_clock_field("wakeup"));
        assert!(!is_clock_field("steps"));
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("sleep_duration_hours"), "Sleep Duration Hours");
        assert_eq!(humanize("hrv"), "Hrv");
    }

    #[test]
    fn test_align_master_index_is_sorted_union() {
        let mut set = RecordSet::new();
        // Unsorted input across two categories
        for d in [5, 1, 3, 2, 4, 6, 7] {
            set.push(DailyRecord::new(day(d), Category::Activity).field("steps", d as f64 * 1000.0));
        }
        set.push(DailyRecord::new(day(9), Category::Vitals).field("resting_heart_rate", 60.0));

        let data = AlignedData::align(&set);
        assert_eq!(data.dates().len(), 8);
        assert!(data.dates().windows(2).all(|w| w[0] < w[1]));

        let steps = data.metric("steps").unwrap();
        assert_eq!(steps.values.len(), 8);
        assert_eq!(steps.get(0), Some(1000.0));
        assert_eq!(steps.get(7), None);
        // One vitals point is below the series minimum
        assert!(data.metric("resting_heart_rate").is_none());
    }

    #[test]
    fn test_align_parses_clock_fields() {
        let data = AlignedData::align(&sleep_set(8));
        let bedtime = data.metric("bedtime").unwrap();
        assert_eq!(bedtime.valid_count(), 8);
        assert!((bedtime.get(0).unwrap() - (23.0 + 1.0 / 60.0)).abs() < 1e-9);
        assert_eq!(bedtime.label, "Bedtime");
    }

    #[test]
    fn test_align_drops_unparseable_and_text_values() {
        let mut set = sleep_set(7);
        for d in 1..=7 {
            set.push(DailyRecord::new(day(d), Category::Wellness).field("journal", "fine"));
        }
        set.push(DailyRecord::new(day(8), Category::Sleep).field("bedtime", "whenever"));

        let data = AlignedData::align(&set);
        assert!(data.metric("journal").is_none());
        let bedtime = data.metric("bedtime").unwrap();
        assert_eq!(bedtime.valid_count(), 7);
        assert_eq!(bedtime.get(7), None);
    }

    #[test]
    fn test_align_series_minimum_is_exclusive() {
        let data = AlignedData::align(&sleep_set(5));
        assert!(data.is_empty());

        let data = AlignedData::align(&sleep_set(6));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_align_qualifies_colliding_names() {
        let mut set = RecordSet::new();
        for d in 1..=6 {
            set.push(DailyRecord::new(day(d), Category::Sleep).field("score", d as f64));
            set.push(DailyRecord::new(day(d), Category::Wellness).field("score", d as f64 * 2.0));
        }

        let data = AlignedData::align(&set);
        assert_eq!(data.metric("score").unwrap().category, Category::Sleep);
        assert_eq!(
            data.metric("wellness_score").unwrap().category,
            Category::Wellness
        );
        assert_eq!(data.metric("wellness_score").unwrap().field, "score");
        assert_eq!(data.metric("score").unwrap().field, "score");
    }

    #[test]
    fn test_paired_with_skips_absent() {
        let a = MetricSeries {
            category: Category::Sleep,
            name: "a".into(),
            field: "a".into(),
            label: "A".into(),
            values: vec![Some(1.0), None, Some(3.0), Some(4.0)],
        };
        let b = MetricSeries {
            category: Category::Vitals,
            name: "b".into(),
            field: "b".into(),
            label: "B".into(),
            values: vec![Some(10.0), Some(20.0), None, Some(40.0)],
        };
        let (x, y) = a.paired_with(&b);
        assert_eq!(x, vec![1.0, 4.0]);
        assert_eq!(y, vec![10.0, 40.0]);
    }
}
