//! Health Score
//!
//! Daily composite score and the recommendations that close a gap to a
//! target.
//!
//! - **calculator**: Curves, bonuses, composite, insights, day snapshots
//! - **recommend**: Rule-based generator and guarded external source

mod calculator;
mod recommend;

pub use calculator::{
    score_metrics, weight_of, CategoryScore, Factor, HealthScoreCalculator, Insight, InsightKind,
    ScoreBreakdown, ScoreResult, FACTOR_CURVES, NEUTRAL_SCORE, WEIGHTS,
};
pub use recommend::{
    generate_recommendations, GuardedRecommender, HttpRecommendationSource, Priority,
    Recommendation, RecommendError, RecommendationRequest, RecommendationSource,
    RecommenderConfig, RuleBasedRecommender, MAX_RECOMMENDATIONS,
};

use serde::{Deserialize, Serialize};

/// Score and recommendation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Target composite for recommendations
    #[serde(default = "default_target_score")]
    pub target_score: u8,

    /// Days a metric's last value is carried forward into a day snapshot
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_target_score() -> u8 {
    80
}

fn default_lookback_days() -> u32 {
    3
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            target_score: default_target_score(),
            lookback_days: default_lookback_days(),
        }
    }
}
