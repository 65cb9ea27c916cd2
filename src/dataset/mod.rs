//! Read-only dataset handle and its loader.
//!
//! The query core only ever sees an immutable, column-typed record set;
//! this module is the collaborator that produces one. It parses a JSON
//! array-of-objects source and normalizes the configured numeric columns,
//! coercing currency/rating strings (`"₹1,099"`, `"4.2 out of 5"`) into
//! numbers so comparisons and aggregations work without per-query
//! cleaning. Values that carry no digits at all stay as they are and are
//! simply ignored by numeric operations downstream.

use std::path::Path;

use regex::Regex;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::types::{Record, Value};
use crate::{CoreError, Result};

/// Columns normalized when the caller does not pick their own set.
/// Mirrors the product-catalog source this pipeline grew up on.
pub const DEFAULT_NUMERIC_FIELDS: &[&str] = &[
    "rating",
    "rating_count",
    "discounted_price",
    "actual_price",
    "discount_percentage",
];

/// The read-only record set handed to the query core. Threaded explicitly
/// through every call — there is no ambient dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load from a JSON file holding an array of flat objects.
    pub fn from_json_file(path: impl AsRef<Path>, numeric_fields: &[&str]) -> Result<Dataset> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text, numeric_fields)
    }

    /// Load from JSON text, coercing `numeric_fields` as described above.
    pub fn from_json_str(text: &str, numeric_fields: &[&str]) -> Result<Dataset> {
        let doc: Json =
            serde_json::from_str(text).map_err(|e| CoreError::Dataset(e.to_string()))?;
        let Some(items) = doc.as_array() else {
            return Err(CoreError::Dataset(
                "expected a top-level JSON array of records".to_string(),
            ));
        };

        let cleaner = NumericCleaner::new();
        let mut records = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for item in items {
            match item.as_object() {
                Some(map) => {
                    let mut record = Record::new();
                    for (key, value) in map {
                        let mut value = json_value(value);
                        if numeric_fields.contains(&key.as_str()) {
                            value = cleaner.coerce(value);
                        }
                        record.insert(key.clone(), value);
                    }
                    records.push(record);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "non-object entries dropped while loading dataset");
        }
        debug!(records = records.len(), "dataset loaded");
        Ok(Dataset::new(records))
    }
}

fn json_value(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or(0.0))),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_value).collect()),
        // Nested objects flatten poorly into a scalar record; keep the
        // raw JSON text so nothing is silently lost.
        Json::Object(_) => Value::String(value.to_string()),
    }
}

/// Extracts the first numeric token out of a decorated string.
struct NumericCleaner {
    token: Regex,
}

impl NumericCleaner {
    fn new() -> Self {
        Self {
            token: Regex::new(r"-?\d+(?:\.\d+)?").expect("static pattern"),
        }
    }

    /// `"₹1,099"` → 1099.0, `"4.2 out of 5"` → 4.2, `"64%"` → 64.0.
    /// Numbers pass through; strings without digits stay strings.
    fn coerce(&self, value: Value) -> Value {
        let Value::String(s) = &value else {
            return value;
        };
        let stripped = s.replace(',', "");
        match self.token.find(&stripped) {
            Some(m) => match m.as_str().parse::<f64>() {
                Ok(v) => Value::Float(v),
                Err(_) => value,
            },
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_coerces_decorated_numbers() {
        let data = r#"[
            {"product_name": "USB Cable", "discounted_price": "₹1,099", "rating": "4.2"},
            {"product_name": "Speaker", "discounted_price": "₹399.50", "rating": "3.9 out of 5"}
        ]"#;
        let dataset = Dataset::from_json_str(data, DEFAULT_NUMERIC_FIELDS).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.records()[0].get("discounted_price"),
            Some(&Value::Float(1099.0))
        );
        assert_eq!(dataset.records()[1].get("rating"), Some(&Value::Float(3.9)));
    }

    #[test]
    fn digitless_strings_stay_as_is() {
        let data = r#"[{"rating": "n/a", "name": "thing"}]"#;
        let dataset = Dataset::from_json_str(data, DEFAULT_NUMERIC_FIELDS).unwrap();
        assert_eq!(
            dataset.records()[0].get("rating"),
            Some(&Value::String("n/a".to_string()))
        );
    }

    #[test]
    fn untouched_fields_keep_their_type() {
        let data = r#"[{"product_name": "12 pack", "rating": 4}]"#;
        let dataset = Dataset::from_json_str(data, DEFAULT_NUMERIC_FIELDS).unwrap();
        assert_eq!(
            dataset.records()[0].get("product_name"),
            Some(&Value::String("12 pack".to_string()))
        );
        assert_eq!(dataset.records()[0].get("rating"), Some(&Value::Int(4)));
    }

    #[test]
    fn top_level_non_array_is_an_error() {
        assert!(Dataset::from_json_str(r#"{"not": "an array"}"#, &[]).is_err());
    }
}
