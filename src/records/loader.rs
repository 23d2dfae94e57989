//! Record Loading
//!
//! Builds a `RecordSet` from a JSON value, a JSON file, or a directory of
//! per-category CSV files (`sleep.csv`, `nutrition.csv`, ...).
//!
//! The JSON form is the engine's input contract: an object keyed by
//! category, each value a list of flat objects carrying an ISO `date`.

use super::error::{RecordError, RecordResult};
use super::types::{Category, DailyRecord, FieldValue, RecordSet};
use chrono::NaiveDate;
use serde_json::Value;
use std::path::Path;

impl RecordSet {
    /// Build a record-set from a JSON value, validating the input contract
    pub fn from_json(value: &Value) -> RecordResult<Self> {
        let root = value.as_object().ok_or(RecordError::NotAnObject)?;
        let mut set = RecordSet::new();

        for (key, records) in root {
            let list = records
                .as_array()
                .ok_or_else(|| RecordError::CategoryNotList {
                    category: key.clone(),
                })?;

            let category = match Category::from_key(key) {
                Some(c) => c,
                None => {
                    tracing::warn!(category = %key, "Skipping unknown record category");
                    continue;
                }
            };

            for (index, record) in list.iter().enumerate() {
                set.push(parse_record(category, key, index, record)?);
            }
        }

        tracing::debug!(records = set.len(), "Parsed record-set");
        Ok(set)
    }
}

fn parse_record(
    category: Category,
    key: &str,
    index: usize,
    record: &Value,
) -> RecordResult<DailyRecord> {
    let object = record
        .as_object()
        .ok_or_else(|| RecordError::RecordNotObject {
            category: key.to_string(),
            index,
        })?;

    let raw_date = object.get("date").ok_or_else(|| RecordError::MissingDate {
        category: key.to_string(),
        index,
    })?;

    let date = raw_date
        .as_str()
        .and_then(parse_date)
        .ok_or_else(|| RecordError::InvalidDate {
            category: key.to_string(),
            index,
            value: raw_date.to_string(),
        })?;

    let mut daily = DailyRecord::new(date, category);
    for (name, value) in object {
        if name == "date" {
            continue;
        }
        // Nulls, booleans and nested values carry no measurement
        match value {
            Value::Number(n) => {
                if let Some(v) = n.as_f64() {
                    daily.fields.insert(name.clone(), FieldValue::Number(v));
                }
            }
            Value::String(s) if !s.trim().is_empty() => {
                daily
                    .fields
                    .insert(name.clone(), FieldValue::Text(s.trim().to_string()));
            }
            _ => {}
        }
    }

    Ok(daily)
}

/// Parse an ISO calendar date, tolerating a trailing time component
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Load a record-set from a JSON file
pub fn load_json(path: &Path) -> RecordResult<RecordSet> {
    let content = std::fs::read_to_string(path).map_err(|e| RecordError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let value: Value = serde_json::from_str(&content)?;
    RecordSet::from_json(&value)
}

/// Load a record-set from a directory of `<category>.csv` files
///
/// Missing category files are skipped. Every file must have a header row
/// with a `date` column; rows without a valid date are contract violations.
pub fn load_csv_dir(dir: &Path) -> RecordResult<RecordSet> {
    let mut set = RecordSet::new();

    for category in Category::all() {
        let path = dir.join(format!("{}.csv", category.as_str()));
        if !path.exists() {
            continue;
        }

        let records = load_csv_file(&path, *category)?;
        tracing::debug!(
            category = %category,
            records = records.len(),
            "Loaded CSV records"
        );
        set.extend(records);
    }

    Ok(set)
}

/// Load a single category CSV file
pub fn load_csv_file(path: &Path, category: Category) -> RecordResult<Vec<DailyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let date_column = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| RecordError::MissingDate {
            category: category.as_str().to_string(),
            index: 0,
        })?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let raw_date = row.get(date_column).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| RecordError::InvalidDate {
            category: category.as_str().to_string(),
            index,
            value: raw_date.to_string(),
        })?;

        let mut daily = DailyRecord::new(date, category);
        for (col, header) in headers.iter().enumerate() {
            if col == date_column {
                continue;
            }
            if let Some(value) = row.get(col).and_then(FieldValue::from_cell) {
                daily.fields.insert(header.to_string(), value);
            }
        }
        records.push(daily);
    }

    Ok(records)
}

/// Load from either a JSON file or a CSV directory
pub fn load_path(path: &Path) -> RecordResult<RecordSet> {
    if path.is_dir() {
        load_csv_dir(path)
    } else {
        load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_from_json_parses_fields() {
        let value = json!({
            "sleep": [
                {"date": "2024-03-02", "sleep_duration_hours": 7.5, "bedtime": "23:15"},
                {"date": "2024-03-01", "sleep_duration_hours": 6.0, "note": null}
            ],
            "vitals": []
        });

        let set = RecordSet::from_json(&value).unwrap();
        let sleep = set.records(Category::Sleep);
        assert_eq!(sleep.len(), 2);
        assert_eq!(
            sleep[0].fields.get("bedtime"),
            Some(&FieldValue::Text("23:15".to_string()))
        );
        assert!(!sleep[1].fields.contains_key("note"));
    }

    #[test]
    fn test_from_json_rejects_non_list_category() {
        let value = json!({"sleep": {"date": "2024-03-01"}});
        let err = RecordSet::from_json(&value).unwrap_err();
        assert!(matches!(err, RecordError::CategoryNotList { .. }));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_from_json_rejects_missing_date() {
        let value = json!({"activity": [{"date": "2024-03-01", "steps": 1}, {"steps": 5000}]});
        let err = RecordSet::from_json(&value).unwrap_err();
        assert!(matches!(err, RecordError::MissingDate { index: 1, .. }));
    }

    #[test]
    fn test_from_json_rejects_bad_date_and_root() {
        let value = json!({"activity": [{"date": "yesterday"}]});
        assert!(matches!(
            RecordSet::from_json(&value),
            Err(RecordError::InvalidDate { .. })
        ));

        assert!(matches!(
            RecordSet::from_json(&json!([1, 2])),
            Err(RecordError::NotAnObject)
        ));

        assert!(matches!(
            RecordSet::from_json(&json!({"sleep": [42]})),
            Err(RecordError::RecordNotObject { .. })
        ));
    }

    #[test]
    fn test_from_json_skips_unknown_category() {
        let value = json!({"finance": [{"date": "2024-03-01", "spend": 12}]});
        let set = RecordSet::from_json(&value).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_csv_dir() {
        let dir = tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("sleep.csv")).unwrap();
        writeln!(file, "date,sleep_duration_hours,bedtime").unwrap();
        writeln!(file, "2024-03-01,7.2,23:30").unwrap();
        writeln!(file, "2024-03-02,,22:45").unwrap();

        let set = load_csv_dir(dir.path()).unwrap();
        let sleep = set.records(Category::Sleep);
        assert_eq!(sleep.len(), 2);
        assert_eq!(
            sleep[0].fields.get("sleep_duration_hours"),
            Some(&FieldValue::Number(7.2))
        );
        assert!(!sleep[1].fields.contains_key("sleep_duration_hours"));
        assert_eq!(set.records(Category::Activity).len(), 0);
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, r#"{"wellness": [{"date": "2024-03-01", "mood_score": 7}]}"#)
            .unwrap();

        let set = load_path(&path).unwrap();
        assert_eq!(set.records(Category::Wellness).len(), 1);
    }

    #[test]
    fn test_load_json_missing_file() {
        let err = load_json(Path::new("/nonexistent/records.json")).unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
    }
}
