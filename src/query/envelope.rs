//! Result envelope: the uniform `(result_kind, rows, metadata)` triple
//! handed to the presentation layer.
//!
//! Each aggregation variant flattens into plain row mappings —
//! `{group, count}`, `{field, average}`, `{group, value, record}` and so
//! on — so the consumer never needs to know the engine's typed result.

use serde::Serialize;
use serde_json::{json, Map, Value as Json};

use crate::query::aggregate::AggregateResult;
use crate::query::ir::{AggOp, QueryIr, QueryKind};
use crate::query::schema::ColumnProfile;
use crate::types::Record;

pub type JsonMap = Map<String, Json>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    pub result_kind: String,
    pub rows: Vec<JsonMap>,
    pub metadata: JsonMap,
}

impl ResultEnvelope {
    fn new(kind: QueryKind) -> Self {
        Self {
            result_kind: kind.as_tag().to_string(),
            rows: Vec::new(),
            metadata: JsonMap::new(),
        }
    }
}

/// Two decimal places, the display precision of every numeric result.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn record_json(record: &Record) -> Json {
    serde_json::to_value(record).unwrap_or(Json::Null)
}

fn row(entries: Vec<(&str, Json)>) -> JsonMap {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Envelope for the aggregating kinds.
pub fn from_aggregate(ir: &QueryIr, result: AggregateResult) -> ResultEnvelope {
    let mut envelope = ResultEnvelope::new(ir.kind);
    match result {
        AggregateResult::Empty => {}
        AggregateResult::Count(n) => {
            envelope.rows.push(row(vec![("count", json!(n))]));
            envelope.metadata.insert("total".into(), json!(n));
        }
        AggregateResult::GroupedCount(entries) => {
            let total: usize = entries.iter().map(|(_, n)| n).sum();
            envelope.metadata.insert("total".into(), json!(total));
            envelope.metadata.insert("groups".into(), json!(entries.len()));
            for (group, n) in entries {
                envelope.rows.push(row(vec![
                    ("group", json!(group)),
                    ("count", json!(n)),
                ]));
            }
        }
        AggregateResult::Scalar { field, value } => {
            let label = scalar_label(ir.kind);
            envelope.rows.push(row(vec![
                ("field", json!(field)),
                (label, json!(round2(value))),
            ]));
        }
        AggregateResult::Grouped { field, op, entries } => {
            let label = match op {
                AggOp::Avg => "average",
                AggOp::Sum => "sum",
                AggOp::Max => "max",
                AggOp::Min => "min",
                AggOp::Count => "count",
            };
            envelope.metadata.insert("field".into(), json!(field));
            envelope.metadata.insert("groups".into(), json!(entries.len()));
            for (group, value) in entries {
                envelope.rows.push(row(vec![
                    ("group", json!(group)),
                    (label, json!(round2(value))),
                ]));
            }
        }
        AggregateResult::Extremum { field, value, record } => {
            envelope.rows.push(row(vec![
                ("field", json!(field)),
                ("value", json!(round2(value))),
                ("record", record_json(&record)),
            ]));
        }
        AggregateResult::GroupedExtremum { field, entries } => {
            envelope.metadata.insert("field".into(), json!(field));
            envelope.metadata.insert("groups".into(), json!(entries.len()));
            for (group, value, record) in entries {
                envelope.rows.push(row(vec![
                    ("group", json!(group)),
                    ("value", json!(round2(value))),
                    ("record", record_json(&record)),
                ]));
            }
        }
    }
    envelope
}

/// Envelope for `Select`: the already-sorted, already-limited rows.
pub fn from_select(ir: &QueryIr, matched: usize, rows: Vec<&Record>) -> ResultEnvelope {
    let mut envelope = ResultEnvelope::new(ir.kind);
    envelope.metadata.insert("count".into(), json!(rows.len()));
    envelope.metadata.insert("matched".into(), json!(matched));
    envelope
        .metadata
        .insert("limited".into(), json!(ir.limit.is_some()));
    for record in rows {
        match record_json(record) {
            Json::Object(map) => envelope.rows.push(map),
            other => {
                envelope.rows.push(row(vec![("record", other)]));
            }
        }
    }
    envelope
}

/// Envelope for `SchemaInfo`: one row per column profile.
pub fn from_schema(ir: &QueryIr, num_rows: usize, profiles: Vec<ColumnProfile>) -> ResultEnvelope {
    let mut envelope = ResultEnvelope::new(ir.kind);
    envelope.metadata.insert("num_rows".into(), json!(num_rows));
    envelope
        .metadata
        .insert("num_columns".into(), json!(profiles.len()));
    for profile in profiles {
        let mut entry = row(vec![
            ("column", json!(profile.column)),
            ("type", json!(profile.data_type)),
            ("non_null", json!(profile.non_null)),
            ("missing", json!(profile.missing)),
            ("distinct", json!(profile.distinct)),
        ]);
        if let (Some(min), Some(max), Some(mean)) = (profile.min, profile.max, profile.mean) {
            entry.insert("min".into(), json!(round2(min)));
            entry.insert("max".into(), json!(round2(max)));
            entry.insert("mean".into(), json!(round2(mean)));
        }
        if !profile.top_values.is_empty() {
            let top: Vec<Json> = profile
                .top_values
                .into_iter()
                .map(|(value, n)| json!({"value": value, "count": n}))
                .collect();
            entry.insert("top_values".into(), Json::Array(top));
        }
        envelope.rows.push(entry);
    }
    envelope
}

fn scalar_label(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Average => "average",
        QueryKind::Sum => "sum",
        // Max/Min produce Extremum results; a scalar under those kinds can
        // only come from hand-built engine output.
        _ => "value",
    }
}
