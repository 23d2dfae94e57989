//! Conditional Correlation
//!
//! Checks whether the relationship between two metrics changes depending on
//! a third, e.g. caffeine vs sleep only matters on high-stress days.

use crate::correlation::MIN_PAIRS;
use crate::records::MetricSeries;
use crate::stats::{clamp_correlation, median, pearson_correlation};
use serde::Serialize;

/// Minimum |high − low| for a conditional correlation to be reported
pub const MIN_CONDITIONAL_DIFFERENCE: f64 = 0.3;

/// Correlation of A and B on high vs low days of a condition metric
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConditionalCorrelation {
    pub condition_metric: String,
    pub metric_a: String,
    pub metric_b: String,
    /// Split point of the condition metric
    pub median: f64,
    pub high_correlation: f64,
    pub low_correlation: f64,
    /// high − low
    pub difference: f64,
    pub high_count: usize,
    pub low_count: usize,
}

/// Compare corr(A, B) above and below the condition's median
pub fn conditional_correlation(
    condition: &MetricSeries,
    a: &MetricSeries,
    b: &MetricSeries,
) -> Option<ConditionalCorrelation> {
    let triples: Vec<(f64, f64, f64)> = condition
        .values
        .iter()
        .zip(a.values.iter())
        .zip(b.values.iter())
        .filter_map(|((c, x), y)| Some(((*c)?, (*x)?, (*y)?)))
        .collect();

    let conditions: Vec<f64> = triples.iter().map(|t| t.0).collect();
    let split = median(&conditions)?;

    let (high, low): (Vec<_>, Vec<_>) = triples.iter().partition(|t| t.0 >= split);
    if high.len() < MIN_PAIRS || low.len() < MIN_PAIRS {
        return None;
    }

    let correlate = |group: &[&(f64, f64, f64)]| {
        let x: Vec<f64> = group.iter().map(|t| t.1).collect();
        let y: Vec<f64> = group.iter().map(|t| t.2).collect();
        pearson_correlation(&x, &y).map(clamp_correlation)
    };

    let high_correlation = correlate(&high)?;
    let low_correlation = correlate(&low)?;
    let difference = high_correlation - low_correlation;

    if difference.abs() <= MIN_CONDITIONAL_DIFFERENCE {
        return None;
    }

    Some(ConditionalCorrelation {
        condition_metric: condition.name.clone(),
        metric_a: a.name.clone(),
        metric_b: b.name.clone(),
        median: split,
        high_correlation,
        low_correlation,
        difference,
        high_count: high.len(),
        low_count: low.len(),
    })
}
