//! # healthgraph
//!
//! Personal health analytics over daily per-category records (sleep,
//! nutrition, activity, vitals, wellness).
//!
//! ## Features
//!
//! - **Correlations**: Same-day and time-lagged Pearson correlations with
//!   triviality filtering and a significance signal
//! - **Anomalies**: Personal-baseline z-scores, practical-significance
//!   minimums and consecutive-day runs
//! - **Patterns**: Cross-category cascades, threshold effects, conditional
//!   correlations, weekly rhythms and chart timelines
//! - **Score**: Weighted daily composite with insights and recommendations
//!
//! ## Modules
//!
//! - [`records`]: Record model, loaders and date alignment
//! - [`stats`]: Shared statistical kernels
//! - [`correlation`]: Pairwise correlation sweep
//! - [`anomaly`]: Baseline anomaly detection
//! - [`patterns`]: Higher-order pattern analyses
//! - [`score`]: Health score and recommendations
//! - [`engine`]: [`HealthEngine`] facade over all of the above
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use healthgraph::{Config, HealthEngine};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = HealthEngine::load(Path::new("records.json"), Config::default())?;
//!
//!     for edge in engine.compute_correlations().iter().take(5) {
//!         println!("{} ↔ {}: r = {:.2}", edge.metric1, edge.metric2, edge.correlation);
//!     }
//!
//!     if let Some((date, result)) = engine.score_latest() {
//!         println!("Score for {}: {}", date, result.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod anomaly;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod patterns;
pub mod records;
pub mod score;
pub mod stats;

// Re-export top-level types for convenience
pub use records::{
    AlignedData, Category, DailyRecord, FieldValue, MetricSeries, RecordError, RecordResult,
    RecordSet,
};

pub use correlation::{
    CorrelationConfig, CorrelationEdge, CorrelationEngine, CorrelationType, Direction, Strength,
};

pub use anomaly::{
    AnomalyConfig, AnomalyDetector, AnomalyEvent, AnomalyFinding, Baseline, BaselineMethod,
    Severity,
};

pub use patterns::{
    Cascade, CascadeConfig, CascadeStep, ConditionalCorrelation, PatternAnalyzer, ThresholdEffect,
    Timeline, TimelineLayer, WeeklyPattern,
};

pub use score::{
    GuardedRecommender, HealthScoreCalculator, Recommendation, RecommendError,
    RecommendationSource, ScoreBreakdown, ScoreConfig, ScoreResult,
};

pub use engine::{HealthEngine, HealthReport};

pub use config::{Config, ConfigError, LoggingConfig, WeeklyConfig};
