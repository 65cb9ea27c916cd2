//! Column profiling behind the `schema-info` kind.
//!
//! Profiles the full record set, not the filtered subset: schema questions
//! are about the dataset, not about a query's match set.

use std::collections::{HashMap, HashSet};

use crate::types::{Record, Value};

/// Per-column summary. Numeric columns carry min/max/mean; the rest carry
/// their most frequent values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub column: String,
    pub data_type: &'static str,
    pub non_null: usize,
    pub missing: usize,
    pub distinct: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub top_values: Vec<(String, usize)>,
}

const TOP_VALUES: usize = 5;

/// Profile every column appearing anywhere in the record set, in
/// first-appearance order.
pub fn profile_columns(records: &[Record]) -> Vec<ColumnProfile> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
    }

    columns
        .into_iter()
        .map(|column| profile_column(records, column))
        .collect()
}

fn profile_column(records: &[Record], column: String) -> ColumnProfile {
    let mut non_null = 0usize;
    let mut numeric: Vec<f64> = Vec::new();
    let mut saw_string = false;
    let mut saw_bool = false;
    let mut saw_list = false;
    // Distinct values and frequencies over the string form, first-seen order.
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let value = match record.get(&column) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };
        non_null += 1;
        match value {
            Value::Int(_) | Value::Float(_) => numeric.push(value.as_f64().unwrap_or(0.0)),
            Value::String(_) => saw_string = true,
            Value::Bool(_) => saw_bool = true,
            Value::List(_) => saw_list = true,
            Value::Null => unreachable!("nulls filtered above"),
        }
        let key = value.to_string();
        match index.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    let all_numeric = !numeric.is_empty() && !saw_string && !saw_bool && !saw_list;
    let data_type = if non_null == 0 {
        "null"
    } else if all_numeric {
        "number"
    } else if saw_string && numeric.is_empty() && !saw_bool && !saw_list {
        "string"
    } else if saw_bool && numeric.is_empty() && !saw_string && !saw_list {
        "bool"
    } else if saw_list && numeric.is_empty() && !saw_string && !saw_bool {
        "list"
    } else {
        "mixed"
    };

    let (min, max, mean) = if all_numeric {
        let sum: f64 = numeric.iter().sum();
        let min = numeric.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = numeric.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (Some(min), Some(max), Some(sum / numeric.len() as f64))
    } else {
        (None, None, None)
    };

    let distinct = counts.len();
    let top_values = if all_numeric {
        Vec::new()
    } else {
        let mut ranked = counts;
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(TOP_VALUES);
        ranked
    };

    ColumnProfile {
        column,
        data_type,
        non_null,
        missing: records.len() - non_null,
        distinct,
        min,
        max,
        mean,
        top_values,
    }
}
