//! Correlation Analysis
//!
//! Pairwise Pearson correlation between aligned metrics.
//!
//! - **engine**: Same-day and time-lagged correlation sweep
//! - **exclusions**: Static derived-metric and trivial-pair tables

mod engine;
pub mod exclusions;

pub use engine::{
    sort_edges, CorrelationConfig, CorrelationEdge, CorrelationEngine, CorrelationType, Direction,
    Strength, MIN_PAIRS,
};
pub use exclusions::{is_derived_metric, is_excluded_pair, is_trivial_pair};
