//! Core record types for the health analytics engine
//!
//! This module defines the input side of the engine:
//! - `Category`: The five health record categories
//! - `FieldValue`: A single named field of a daily record
//! - `DailyRecord`: One day of one category
//! - `RecordSet`: All records, keyed by category

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a health record
///
/// The declaration order is the canonical category order used when
/// iterating a record-set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Sleep duration, stages, quality, bed/wake times
    Sleep,
    /// Calories, macros, meal timing, caffeine
    Nutrition,
    /// Steps, distance, active minutes, workouts
    Activity,
    /// Heart rate, HRV, blood pressure, body composition
    Vitals,
    /// Mood, stress, energy, social and screen habits
    Wellness,
}

impl Category {
    /// Get all categories for iteration
    pub fn all() -> &'static [Category] {
        &[
            Category::Sleep,
            Category::Nutrition,
            Category::Activity,
            Category::Vitals,
            Category::Wellness,
        ]
    }

    /// Parse a category from its record-set key
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "sleep" => Some(Category::Sleep),
            "nutrition" => Some(Category::Nutrition),
            "activity" => Some(Category::Activity),
            "vitals" => Some(Category::Vitals),
            "wellness" => Some(Category::Wellness),
            _ => None,
        }
    }

    /// Lowercase key used in record-sets and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sleep => "sleep",
            Category::Nutrition => "nutrition",
            Category::Activity => "activity",
            Category::Vitals => "vitals",
            Category::Wellness => "wellness",
        }
    }

    /// Ranking priority when several categories compete for attention.
    ///
    /// vitals > sleep > wellness > nutrition > activity
    pub fn priority(&self) -> u8 {
        match self {
            Category::Vitals => 5,
            Category::Sleep => 4,
            Category::Wellness => 3,
            Category::Nutrition => 2,
            Category::Activity => 1,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single field value as it arrives in a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric measurement
    Number(f64),
    /// Free text, typically a clock time such as "22:45"
    Text(String),
}

impl FieldValue {
    /// Numeric value, if this is a finite number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Parse a raw cell (CSV or similar) into a field value.
    ///
    /// Returns `None` for empty cells.
    pub fn from_cell(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match cell.parse::<f64>() {
            Ok(v) => Some(FieldValue::Number(v)),
            Err(_) => Some(FieldValue::Text(cell.to_string())),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// One day of one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyRecord {
    /// Calendar date of the record
    pub date: NaiveDate,
    /// Category the record belongs to
    pub category: Category,
    /// Named fields (everything except `date`)
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl DailyRecord {
    /// Create an empty record for a day
    pub fn new(date: NaiveDate, category: Category) -> Self {
        Self {
            date,
            category,
            fields: BTreeMap::new(),
        }
    }

    /// Builder method: add a field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// All records of a user, keyed by category
///
/// Records inside a category are not assumed to be sorted or unique per day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordSet {
    categories: BTreeMap<Category, Vec<DailyRecord>>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to its category
    pub fn push(&mut self, record: DailyRecord) {
        self.categories
            .entry(record.category)
            .or_default()
            .push(record);
    }

    /// Builder method: add a record
    pub fn with(mut self, record: DailyRecord) -> Self {
        self.push(record);
        self
    }

    /// Extend a category with many records
    pub fn extend(&mut self, records: impl IntoIterator<Item = DailyRecord>) {
        for record in records {
            self.push(record);
        }
    }

    /// Records for one category (empty if none)
    pub fn records(&self, category: Category) -> &[DailyRecord] {
        self.categories
            .get(&category)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate categories in canonical order with their records
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[DailyRecord])> {
        self.categories.iter().map(|(c, r)| (*c, r.as_slice()))
    }

    /// Total number of records across categories
    pub fn len(&self) -> usize {
        self.categories.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
