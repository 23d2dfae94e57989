//! Static exclusion tables for the correlation sweep.
//!
//! Derived metrics are arithmetic components of another reported metric;
//! correlating them with their total is tautological. Trivial pairs are
//! same-domain relationships that are physiologically obvious and not
//! actionable.

/// Metrics that are sub-totals or components of another metric
pub const DERIVED_METRICS: &[&str] = &[
    "breakfast_calories",
    "lunch_calories",
    "dinner_calories",
    "snack_calories",
    "protein_calories",
    "carb_calories",
    "fat_calories",
    "light_sleep_hours",
    "awake_hours",
    "bmr_calories",
];

/// Obvious same-category relationships (order-insensitive)
pub const TRIVIAL_PAIRS: &[(&str, &str)] = &[
    ("sleep_duration_hours", "deep_sleep_hours"),
    ("sleep_duration_hours", "rem_sleep_hours"),
    ("sleep_duration_hours", "time_in_bed_hours"),
    ("sleep_duration_hours", "sleep_efficiency"),
    ("deep_sleep_hours", "rem_sleep_hours"),
    ("bedtime", "wake_time"),
    ("steps", "distance_km"),
    ("steps", "active_minutes"),
    ("steps", "calories_burned"),
    ("distance_km", "calories_burned"),
    ("distance_km", "active_minutes"),
    ("active_minutes", "calories_burned"),
    ("workout_minutes", "calories_burned"),
    ("total_calories", "protein_g"),
    ("total_calories", "carbs_g"),
    ("total_calories", "fat_g"),
    ("total_calories", "sugar_g"),
    ("carbs_g", "sugar_g"),
    ("blood_pressure_systolic", "blood_pressure_diastolic"),
    ("heart_rate_avg", "resting_heart_rate"),
    ("weight_kg", "bmi"),
    ("weight_kg", "muscle_mass_kg"),
    ("body_fat_percent", "bmi"),
    ("stress_level", "anxiety_level"),
];

/// Whether a metric is a derived quantity
pub fn is_derived_metric(name: &str) -> bool {
    DERIVED_METRICS.contains(&name)
}

/// Whether two metrics form a trivial pair, in either order
pub fn is_trivial_pair(a: &str, b: &str) -> bool {
    TRIVIAL_PAIRS
        .iter()
        .any(|(x, y)| (*x == a && *y == b) || (*x == b && *y == a))
}

/// Whether a pair should be skipped before any statistics are computed
pub fn is_excluded_pair(a: &str, b: &str) -> bool {
    is_derived_metric(a) || is_derived_metric(b) || is_trivial_pair(a, b)
}
