//! Anomaly Detection
//!
//! Personal-baseline anomalies per metric.
//!
//! - **detector**: Baselines, z-scores, runs, severity and ranking
//! - **thresholds**: Exclusions, practical minimums and metric classes

mod detector;
pub mod thresholds;

pub use detector::{
    rank_findings, AnomalyConfig, AnomalyDetector, AnomalyEvent, AnomalyFinding, Baseline,
    BaselineMethod, Severity, MIN_BASELINE_POINTS,
};
pub use thresholds::{is_excluded_metric, is_practically_significant, practical_minimum, MetricClass};
