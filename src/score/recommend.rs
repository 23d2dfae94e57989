//! Recommendations
//!
//! Turns a score gap into at most three concrete actions.
//!
//! ## Sources
//!
//! - **RuleBasedRecommender**: deterministic rules, always available
//! - **HttpRecommendationSource**: optional external service
//! - **GuardedRecommender**: tries the external service under a timeout and
//!   falls back to the rules on any failure

use super::calculator::{
    active_minutes_score, calories_score, protein_score, resting_heart_rate_score,
    sleep_duration_score, steps_score, stress_score, sugar_score, systolic_score, water_score,
    CategoryScore, ScoreBreakdown,
};
use crate::records::Category;
use crate::stats::round_to;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;
use thiserror::Error;

/// Most recommendations returned for one request
pub const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// high ≥ 5 points, medium ≥ 2, low otherwise
    pub fn from_impact(impact: f64) -> Self {
        if impact >= 5.0 {
            Priority::High
        } else if impact >= 2.0 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub category: Category,
    pub action: String,
    pub detail: String,
    /// Estimated composite score points gained
    pub impact: f64,
    pub priority: Priority,
}

/// Input for every recommendation source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub current_score: u8,
    pub target_score: u8,
    pub breakdown: ScoreBreakdown,
}

impl RecommendationRequest {
    pub fn gap(&self) -> i32 {
        self.target_score as i32 - self.current_score as i32
    }
}

/// Errors from a recommendation source
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Recommendation service returned {status}")]
    Status { status: u16 },

    #[error("Recommendation service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Recommendation service unavailable")]
    Unavailable,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that can suggest actions for a score gap
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, RecommendError>;
}

/// A candidate action: the factor it moves and the score it would reach
struct Candidate {
    metric: &'static str,
    improved_score: f64,
    action: String,
    detail: String,
}

/// Composite points gained if `metric` in `entry` reached `improved_score`
fn estimate_impact(entry: &CategoryScore, metric: &str, improved_score: f64) -> f64 {
    let Some(current) = entry.factor(metric) else {
        return 0.0;
    };
    let gain = (improved_score - current.score).max(0.0) / entry.factors.len() as f64;
    round_to(gain * entry.weight, 1)
}

fn value(entry: &CategoryScore, metric: &str) -> Option<f64> {
    entry.factor(metric).map(|f| f.value)
}

fn candidates(category: Category, entry: &CategoryScore) -> Vec<Candidate> {
    let mut out = Vec::new();

    match category {
        Category::Sleep => {
            if let Some(hours) = value(entry, "sleep_duration_hours").filter(|h| *h < 7.0) {
                let more = round_to(7.0 - hours, 1);
                out.push(Candidate {
                    metric: "sleep_duration_hours",
                    improved_score: sleep_duration_score(7.0),
                    action: format!("Aim for {:.1} more hours of sleep", more),
                    detail: format!(
                        "You slept {:.1}h; 7-9h scores full marks. Try moving bedtime earlier.",
                        hours
                    ),
                });
            }
        }
        Category::Activity => {
            if let Some(steps) = value(entry, "steps").filter(|s| *s < 10_000.0) {
                let deficit = ((10_000.0 - steps) / 100.0).ceil() * 100.0;
                out.push(Candidate {
                    metric: "steps",
                    improved_score: steps_score(10_000.0),
                    action: format!("Add {:.0} steps", deficit),
                    detail: format!("{:.0} of 10,000 steps; a 20 minute walk covers about 2,000.", steps),
                });
            }
            if let Some(minutes) = value(entry, "active_minutes").filter(|m| *m < 30.0) {
                out.push(Candidate {
                    metric: "active_minutes",
                    improved_score: active_minutes_score(30.0),
                    action: format!("Add {:.0} active minutes", 30.0 - minutes),
                    detail: "30 minutes of moderate activity scores full marks.".to_string(),
                });
            }
        }
        Category::Nutrition => {
            if let Some(sugar) = value(entry, "sugar_g").filter(|s| *s > 25.0) {
                out.push(Candidate {
                    metric: "sugar_g",
                    improved_score: sugar_score(25.0),
                    action: "Keep sugar under 25g".to_string(),
                    detail: format!("Today's sugar was {:.0}g.", sugar),
                });
            }
            if let Some(kcal) = value(entry, "total_calories")
                .filter(|k| !(1800.0..=2500.0).contains(k))
            {
                let target = if kcal < 1800.0 { 1800.0 } else { 2500.0 };
                out.push(Candidate {
                    metric: "total_calories",
                    improved_score: calories_score(target),
                    action: format!("Bring calories to about {:.0} kcal", target),
                    detail: format!("{:.0} kcal is outside the 1,800-2,500 kcal range.", kcal),
                });
            }
            if let Some(protein) = value(entry, "protein_g").filter(|p| *p < 50.0) {
                out.push(Candidate {
                    metric: "protein_g",
                    improved_score: protein_score(50.0),
                    action: format!("Add {:.0}g of protein", 50.0 - protein),
                    detail: "Aim for at least 50g of protein a day.".to_string(),
                });
            }
            if let Some(water) = value(entry, "water_liters").filter(|w| *w < 2.0) {
                out.push(Candidate {
                    metric: "water_liters",
                    improved_score: water_score(2.0),
                    action: format!("Drink {:.1} more liters of water", 2.0 - water),
                    detail: "2 liters a day scores full marks.".to_string(),
                });
            }
        }
        Category::Vitals => {
            if let Some(bpm) = value(entry, "resting_heart_rate").filter(|b| *b > 70.0) {
                out.push(Candidate {
                    metric: "resting_heart_rate",
                    improved_score: resting_heart_rate_score(70.0),
                    action: "Bring resting heart rate toward 60-70 bpm".to_string(),
                    detail: format!(
                        "Resting heart rate is {:.0} bpm; regular cardio and sleep lower it.",
                        bpm
                    ),
                });
            }
            if let Some(mmhg) = value(entry, "blood_pressure_systolic").filter(|s| *s > 120.0) {
                out.push(Candidate {
                    metric: "blood_pressure_systolic",
                    improved_score: systolic_score(120.0),
                    action: "Lower systolic pressure under 120 mmHg".to_string(),
                    detail: format!("Systolic pressure is {:.0} mmHg; cut sodium and keep moving.", mmhg),
                });
            }
        }
        Category::Wellness => {
            if let Some(stress) = value(entry, "stress_level").filter(|s| *s > 4.0) {
                out.push(Candidate {
                    metric: "stress_level",
                    improved_score: stress_score(3.0),
                    action: "Schedule 10 minutes of stress relief".to_string(),
                    detail: format!(
                        "Stress is {:.0}/10; breathing exercises or a walk bring it down.",
                        stress
                    ),
                });
            }
        }
    }

    out
}

fn generic_action(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Sleep => ("Keep a consistent sleep schedule", "Same bedtime and wake time every day."),
        Category::Activity => ("Move a little more each day", "Short walks after meals add up."),
        Category::Nutrition => ("Plan balanced meals", "Protein, vegetables and water at every meal."),
        Category::Vitals => ("Track vitals regularly", "Morning measurements give the most stable baseline."),
        Category::Wellness => ("Check in with yourself daily", "Log mood and stress to spot what helps."),
    }
}

/// Deterministic recommendations for closing the gap to `target_score`
///
/// Categories are visited by weighted headroom. Each contributes its single
/// highest-impact action; generation stops after three actions or once the
/// summed impact covers the gap.
pub fn generate_recommendations(
    current_score: u8,
    target_score: u8,
    breakdown: &ScoreBreakdown,
) -> Vec<Recommendation> {
    let gap = target_score as f64 - current_score as f64;
    if gap <= 0.0 {
        return Vec::new();
    }

    let mut ranked: Vec<(&Category, &CategoryScore)> = breakdown.iter().collect();
    ranked.sort_by(|a, b| {
        b.1.headroom()
            .partial_cmp(&a.1.headroom())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.0.priority().cmp(&a.0.priority()))
    });

    let mut recommendations = Vec::new();
    let mut covered = 0.0;

    for (category, entry) in &ranked {
        if recommendations.len() >= MAX_RECOMMENDATIONS || covered >= gap {
            break;
        }

        let best = candidates(**category, entry)
            .into_iter()
            .map(|c| {
                let impact = estimate_impact(entry, c.metric, c.improved_score);
                (c, impact)
            })
            .filter(|(_, impact)| *impact > 0.0)
            .fold(None::<(Candidate, f64)>, |best, (c, impact)| match best {
                Some((b, bi)) if bi >= impact => Some((b, bi)),
                _ => Some((c, impact)),
            });

        if let Some((candidate, impact)) = best {
            covered += impact;
            recommendations.push(Recommendation {
                category: **category,
                action: candidate.action,
                detail: candidate.detail,
                impact,
                priority: Priority::from_impact(impact),
            });
        }
    }

    if recommendations.is_empty() {
        let mut lowest: Vec<(&Category, &CategoryScore)> =
            breakdown.iter().filter(|(_, c)| c.score < 100.0).collect();
        lowest.sort_by(|a, b| {
            a.1.score
                .partial_cmp(&b.1.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.priority().cmp(&a.0.priority()))
        });

        recommendations = lowest
            .into_iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|(category, entry)| {
                let (action, detail) = generic_action(*category);
                let impact = round_to(entry.headroom() * 0.25, 1);
                Recommendation {
                    category: *category,
                    action: action.to_string(),
                    detail: detail.to_string(),
                    impact,
                    priority: Priority::from_impact(impact),
                }
            })
            .collect();
    }

    tracing::debug!(
        current = current_score,
        target = target_score,
        count = recommendations.len(),
        covered,
        "Generated recommendations"
    );

    recommendations
}

/// The deterministic rule set as a source
#[derive(Debug, Clone, Default)]
pub struct RuleBasedRecommender;

#[async_trait]
impl RecommendationSource for RuleBasedRecommender {
    fn name(&self) -> &str {
        "rules"
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        Ok(generate_recommendations(
            request.current_score,
            request.target_score,
            &request.breakdown,
        ))
    }
}

/// External recommendation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Use the external service when a URL is set
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint accepting a JSON `RecommendationRequest` via POST
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    3000
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Recommendation service reached over HTTP
pub struct HttpRecommendationSource {
    client: Client,
    url: String,
}

impl HttpRecommendationSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RecommendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommendationSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RecommendError::Unavailable
                } else {
                    RecommendError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(RecommendError::Status {
                status: response.status().as_u16(),
            });
        }

        let mut recommendations: Vec<Recommendation> = response
            .json()
            .await
            .map_err(|e| RecommendError::InvalidResponse(e.to_string()))?;

        if recommendations.is_empty() && request.gap() > 0 {
            return Err(RecommendError::InvalidResponse(
                "empty recommendation list".to_string(),
            ));
        }
        recommendations.truncate(MAX_RECOMMENDATIONS);
        Ok(recommendations)
    }
}

/// Wraps an optional external source with a timeout and a rule-based fallback.
///
/// Never fails: any error or timeout from the external source is logged and
/// answered by the rules.
pub struct GuardedRecommender {
    primary: Option<Box<dyn RecommendationSource>>,
    fallback: RuleBasedRecommender,
    timeout: Duration,
}

impl GuardedRecommender {
    /// Rules only
    pub fn rules() -> Self {
        Self {
            primary: None,
            fallback: RuleBasedRecommender,
            timeout: Duration::from_millis(default_timeout_ms()),
        }
    }

    pub fn with_source(source: Box<dyn RecommendationSource>, timeout: Duration) -> Self {
        Self {
            primary: Some(source),
            fallback: RuleBasedRecommender,
            timeout,
        }
    }

    /// Build from configuration; a missing URL or a client build failure
    /// leaves rules only
    pub fn from_config(config: &RecommenderConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        match (&config.url, config.enabled) {
            (Some(url), true) => match HttpRecommendationSource::new(url.clone(), timeout) {
                Ok(source) => Self::with_source(Box::new(source), timeout),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to build recommendation client, using rules");
                    Self::rules()
                }
            },
            _ => Self::rules(),
        }
    }

    pub async fn recommend(&self, request: &RecommendationRequest) -> Vec<Recommendation> {
        if request.gap() <= 0 {
            return Vec::new();
        }

        if let Some(primary) = &self.primary {
            match tokio::time::timeout(self.timeout, primary.recommend(request)).await {
                Ok(Ok(recommendations)) => {
                    tracing::debug!(
                        source = primary.name(),
                        count = recommendations.len(),
                        "External recommendations received"
                    );
                    return recommendations;
                }
                Ok(Err(e)) => {
                    tracing::warn!(source = primary.name(), error = %e, "Recommendation source failed, using rules");
                }
                Err(_) => {
                    tracing::warn!(
                        source = primary.name(),
                        error = %RecommendError::Timeout(self.timeout),
                        "Recommendation source timed out, using rules"
                    );
                }
            }
        }

        self.fallback(request).await
    }

    /// Rules-only answer, skipping the external source
    pub async fn fallback(&self, request: &RecommendationRequest) -> Vec<Recommendation> {
        self.fallback.recommend(request).await.unwrap_or_default()
    }
}
