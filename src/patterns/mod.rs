//! Pattern Analysis
//!
//! Higher-order patterns built on the aligned snapshot and the correlation
//! graph.
//!
//! ## Architecture
//!
//! - **cascade**: Multi-hop chains across categories (graph search)
//! - **threshold**: Step effects via quantile bins
//! - **conditional**: Correlations that depend on a third metric
//! - **weekly**: Weekday rhythms
//! - **timeline**: Date-filtered layers plus edges for charting

mod cascade;
mod conditional;
mod threshold;
mod timeline;
mod weekly;

pub use cascade::{discover_cascades, Cascade, CascadeConfig, CascadeStep};
pub use conditional::{conditional_correlation, ConditionalCorrelation, MIN_CONDITIONAL_DIFFERENCE};
pub use threshold::{threshold_effect, QuantileBin, ThresholdEffect, QUANTILE_BINS};
pub use timeline::{build_timeline, Timeline, TimelineLayer};
pub use weekly::{weekday_name, weekly_pattern, weekly_patterns, WeekdayStats, WeeklyPattern};

use crate::correlation::CorrelationEdge;
use crate::records::AlignedData;
use chrono::NaiveDate;
use std::sync::Arc;

/// Runs pattern analyses against one aligned snapshot, resolving metric
/// names and omitting unknown ones.
pub struct PatternAnalyzer {
    data: Arc<AlignedData>,
}

impl PatternAnalyzer {
    pub fn new(data: Arc<AlignedData>) -> Self {
        Self { data }
    }

    /// Cascades over a precomputed edge list
    pub fn discover_cascades(&self, edges: &[CorrelationEdge], config: &CascadeConfig) -> Vec<Cascade> {
        discover_cascades(&self.data, edges, config)
    }

    pub fn threshold_effect(&self, input: &str, output: &str) -> Option<ThresholdEffect> {
        let input = self.data.metric(input)?;
        let output = self.data.metric(output)?;
        threshold_effect(input, output)
    }

    pub fn conditional_correlation(
        &self,
        condition: &str,
        metric_a: &str,
        metric_b: &str,
    ) -> Option<ConditionalCorrelation> {
        conditional_correlation(
            self.data.metric(condition)?,
            self.data.metric(metric_a)?,
            self.data.metric(metric_b)?,
        )
    }

    pub fn weekly_pattern(&self, metric: &str) -> Option<WeeklyPattern> {
        weekly_pattern(&self.data, self.data.metric(metric)?)
    }

    pub fn weekly_patterns(&self, min_variation: f64) -> Vec<WeeklyPattern> {
        weekly_patterns(&self.data, min_variation)
    }

    pub fn timeline(
        &self,
        edges: &[CorrelationEdge],
        metrics: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Timeline {
        build_timeline(&self.data, edges, metrics, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Category, DailyRecord, RecordSet};

    fn analyzer() -> PatternAnalyzer {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut records = RecordSet::new();
        for d in 0..30i64 {
            let date = start + chrono::Duration::days(d);
            let sugar = (d * 7 % 30) as f64 * 3.0;
            records.push(DailyRecord::new(date, Category::Nutrition).field("sugar_g", sugar));
            records.push(
                DailyRecord::new(date, Category::Wellness)
                    .field("energy_level", if sugar >= 45.0 { 3.0 } else { 8.0 }),
            );
        }
        PatternAnalyzer::new(Arc::new(AlignedData::align(&records)))
    }

    #[test]
    fn test_unknown_metrics_are_omitted() {
        let analyzer = analyzer();
        assert!(analyzer.threshold_effect("sugar_g", "nope").is_none());
        assert!(analyzer.conditional_correlation("nope", "sugar_g", "energy_level").is_none());
        assert!(analyzer.weekly_pattern("nope").is_none());
    }

    #[test]
    fn test_threshold_by_name() {
        let effect = analyzer().threshold_effect("sugar_g", "energy_level").unwrap();
        assert!(effect.effect_size < 0.0);
        assert_eq!(effect.input_metric, "sugar_g");
    }
}
