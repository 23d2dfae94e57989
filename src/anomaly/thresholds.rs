//! Static lookup tables for anomaly detection.

/// Metrics whose natural day-to-day variance makes flagging meaningless
pub const EXCLUDED_METRICS: &[&str] = &[
    "breakfast_time",
    "lunch_time",
    "dinner_time",
    "last_meal_time",
    "workout_time",
    "bedtime",
    "wake_time",
    "caffeine_last_time",
    "caffeine_cups",
    "snack_calories",
    "meals_count",
    "meal_count",
    "social_interactions",
    "screen_time_before_bed",
    "screen_time_before_bed_minutes",
];

/// Smallest absolute deviation from baseline that matters in practice
pub const PRACTICAL_MINIMUMS: &[(&str, f64)] = &[
    ("resting_heart_rate", 5.0),
    ("heart_rate_avg", 8.0),
    ("hrv_ms", 10.0),
    ("blood_pressure_systolic", 10.0),
    ("blood_pressure_diastolic", 7.0),
    ("spo2", 2.0),
    ("body_temperature", 0.5),
    ("stress_level", 2.0),
    ("mood_score", 2.0),
    ("energy_level", 2.0),
    ("sleep_duration_hours", 1.5),
    ("deep_sleep_hours", 0.5),
    ("rem_sleep_hours", 0.5),
    ("sleep_quality", 2.0),
    ("total_calories", 500.0),
    ("protein_g", 40.0),
    ("sugar_g", 25.0),
    ("water_liters", 1.0),
    ("steps", 3000.0),
    ("active_minutes", 30.0),
    ("distance_km", 3.0),
    ("weight_kg", 1.5),
    ("body_fat_percent", 2.0),
    ("muscle_mass_kg", 1.0),
];

/// Whether a metric is never checked for anomalies
pub fn is_excluded_metric(name: &str) -> bool {
    EXCLUDED_METRICS.contains(&name)
}

/// Practical-significance minimum for a metric, if it has one
pub fn practical_minimum(name: &str) -> Option<f64> {
    PRACTICAL_MINIMUMS
        .iter()
        .find(|(metric, _)| *metric == name)
        .map(|(_, min)| *min)
}

/// Whether a deviation exceeds the metric's practical minimum.
///
/// Metrics absent from the table are never practically significant.
pub fn is_practically_significant(name: &str, deviation: f64) -> bool {
    practical_minimum(name).map_or(false, |min| deviation.abs() > min)
}

/// How quickly a metric legitimately changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricClass {
    /// Heart rate, HRV, stress, blood pressure
    FastVital,
    /// Weight, body fat, muscle mass
    BodyComposition,
    /// Everything else
    Standard,
}

impl MetricClass {
    pub fn of(name: &str) -> Self {
        let lower = name.to_lowercase();
        if ["heart_rate", "hrv", "stress", "blood_pressure", "pulse"]
            .iter()
            .any(|k| lower.contains(k))
        {
            MetricClass::FastVital
        } else if ["weight", "body_fat", "muscle", "bmi"]
            .iter()
            .any(|k| lower.contains(k))
        {
            MetricClass::BodyComposition
        } else {
            MetricClass::Standard
        }
    }

    /// Minimum consecutive anomalous days before a run is reported
    pub fn min_run(&self) -> usize {
        match self {
            MetricClass::FastVital => 2,
            MetricClass::BodyComposition => 7,
            MetricClass::Standard => 3,
        }
    }
}
