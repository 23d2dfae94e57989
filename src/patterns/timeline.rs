//! Timeline Assembly
//!
//! Date-filtered layers for a chosen set of metrics, plus the correlation
//! edges among them, ready for a multi-metric chart.

use crate::correlation::CorrelationEdge;
use crate::records::{AlignedData, Category};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineLayer {
    pub metric: String,
    pub label: String,
    pub category: Category,
    /// One slot per date in `Timeline::dates`
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Timeline {
    pub dates: Vec<NaiveDate>,
    pub layers: Vec<TimelineLayer>,
    pub edges: Vec<CorrelationEdge>,
}

/// Build a timeline for `metrics` over the inclusive range `start..=end`
///
/// Unknown metrics and metrics with no value in range are omitted.
pub fn build_timeline(
    data: &AlignedData,
    edges: &[CorrelationEdge],
    metrics: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Timeline {
    let range: Vec<(usize, NaiveDate)> = data
        .dates()
        .iter()
        .enumerate()
        .filter(|(_, d)| **d >= start && **d <= end)
        .map(|(i, d)| (i, *d))
        .collect();

    let mut layers = Vec::new();
    for name in metrics {
        let Some(series) = data.metric(name) else {
            tracing::debug!(metric = %name, "Timeline metric not found");
            continue;
        };
        if layers.iter().any(|l: &TimelineLayer| &l.metric == name) {
            continue;
        }

        let values: Vec<Option<f64>> = range.iter().map(|(i, _)| series.get(*i)).collect();
        if values.iter().all(Option::is_none) {
            continue;
        }

        layers.push(TimelineLayer {
            metric: series.name.clone(),
            label: series.label.clone(),
            category: series.category,
            values,
        });
    }

    let edges = edges
        .iter()
        .filter(|e| {
            metrics.iter().any(|m| m == &e.metric1) && metrics.iter().any(|m| m == &e.metric2)
        })
        .cloned()
        .collect();

    Timeline {
        dates: range.into_iter().map(|(_, d)| d).collect(),
        layers,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationType, Direction, Strength};
    use crate::records::{DailyRecord, RecordSet};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn data() -> AlignedData {
        let mut records = RecordSet::new();
        for d in 1..=10 {
            records.push(
                DailyRecord::new(day(d), Category::Sleep)
                    .field("sleep_duration", 6.0 + d as f64 * 0.1),
            );
            records.push(
                DailyRecord::new(day(d), Category::Wellness).field("mood_score", 5.0 + (d % 3) as f64),
            );
            // Only on the first six days
            if d <= 6 {
                records.push(DailyRecord::new(day(d), Category::Activity).field("steps", 8000.0));
            }
        }
        AlignedData::align(&records)
    }

    fn edge(m1: &str, m2: &str) -> CorrelationEdge {
        CorrelationEdge {
            metric1: m1.to_string(),
            metric2: m2.to_string(),
            category1: Category::Sleep,
            category2: Category::Wellness,
            correlation: 0.6,
            lag: 0,
            correlation_type: CorrelationType::SameDay,
            strength: Strength::Moderate,
            direction: Direction::Positive,
            point_count: 10,
            significance: 0.02,
        }
    }

    #[test]
    fn test_layers_are_date_filtered() {
        let data = data();
        let metrics = vec!["sleep_duration".to_string(), "mood_score".to_string()];
        let timeline = build_timeline(&data, &[], &metrics, day(3), day(5));

        assert_eq!(timeline.dates, vec![day(3), day(4), day(5)]);
        assert_eq!(timeline.layers.len(), 2);
        assert!(timeline.layers.iter().all(|l| l.values.len() == 3));
    }

    #[test]
    fn test_empty_and_unknown_metrics_are_omitted() {
        let data = data();
        let metrics = vec![
            "steps".to_string(),
            "mood_score".to_string(),
            "does_not_exist".to_string(),
        ];
        let timeline = build_timeline(&data, &[], &metrics, day(8), day(10));

        assert_eq!(timeline.layers.len(), 1);
        assert_eq!(timeline.layers[0].metric, "mood_score");
    }

    #[test]
    fn test_edges_need_both_endpoints_requested() {
        let data = data();
        let edges = vec![edge("sleep_duration", "mood_score"), edge("sleep_duration", "steps")];
        let metrics = vec!["sleep_duration".to_string(), "mood_score".to_string()];
        let timeline = build_timeline(&data, &edges, &metrics, day(1), day(10));

        assert_eq!(timeline.edges.len(), 1);
        assert_eq!(timeline.edges[0].metric2, "mood_score");
    }
}
