//! Query core: IR, predicate evaluation, aggregation and result shaping.

pub mod aggregate;
pub mod envelope;
pub mod eval;
pub mod ir;
pub mod parse;
pub mod schema;

use tracing::debug;

use crate::types::{Record, Value};
use envelope::ResultEnvelope;
use ir::{QueryIr, QueryKind, SortDirection};

/// Run one IR against a record set: filter, aggregate, package.
///
/// Pure and idempotent — the same IR over the same records yields
/// identical output, and the record set is never mutated.
pub fn execute(records: &[Record], ir: &QueryIr) -> ResultEnvelope {
    let subset = eval::apply_filter(records, &ir.filter);
    debug!(matched = subset.len(), kind = ir.kind.as_tag(), "filter applied");

    match ir.kind {
        QueryKind::Select => {
            let matched = subset.len();
            let mut rows = subset;
            if let Some(sort) = &ir.sort {
                sort_rows(&mut rows, &sort.field, sort.direction);
            }
            rows.truncate(ir.effective_select_limit());
            envelope::from_select(ir, matched, rows)
        }
        QueryKind::SchemaInfo => {
            // Schema questions describe the dataset, not the match set.
            envelope::from_schema(ir, records.len(), schema::profile_columns(records))
        }
        QueryKind::Count
        | QueryKind::Average
        | QueryKind::Sum
        | QueryKind::Max
        | QueryKind::Min
        | QueryKind::Group => {
            let result = aggregate::aggregate(
                &subset,
                ir.kind,
                ir.aggregation.as_ref(),
                ir.group_by.as_deref(),
            );
            envelope::from_aggregate(ir, result)
        }
    }
}

/// Stable sort on one field. Numeric pairs compare by magnitude, anything
/// else by string form; records missing the field sort last either way.
fn sort_rows(rows: &mut [&Record], field: &str, direction: SortDirection) {
    use std::cmp::Ordering;

    rows.sort_by(|a, b| {
        let ord = match (a.get(field), b.get(field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(va), Some(vb)) => compare_values(va, vb),
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record;
    use serde_json::json;

    fn catalog() -> Vec<Record> {
        vec![
            record([
                ("name", Value::from("USB Cable")),
                ("category", Value::from("Cables")),
                ("rating", Value::from(3.5)),
            ]),
            record([
                ("name", Value::from("HDMI Cable")),
                ("category", Value::from("Cables")),
                ("rating", Value::from(4.2)),
            ]),
            record([
                ("name", Value::from("Speaker")),
                ("category", Value::from("Audio")),
                ("rating", Value::from(4.9)),
            ]),
        ]
    }

    #[test]
    fn select_sorts_and_limits() {
        let records = catalog();
        let ir = QueryIr::new(QueryKind::Select)
            .with_sort("rating", SortDirection::Descending)
            .with_limit(2);
        let envelope = execute(&records, &ir);
        assert_eq!(envelope.rows.len(), 2);
        assert_eq!(envelope.rows[0].get("name"), Some(&json!("Speaker")));
        assert_eq!(envelope.metadata.get("matched"), Some(&json!(3)));
    }

    #[test]
    fn select_applies_default_cap() {
        let records: Vec<Record> = (0..30)
            .map(|i| record([("n", Value::from(i as i64))]))
            .collect();
        let ir = QueryIr::new(QueryKind::Select);
        let envelope = execute(&records, &ir);
        assert_eq!(envelope.rows.len(), ir::DEFAULT_SELECT_LIMIT);
        assert_eq!(envelope.metadata.get("limited"), Some(&json!(false)));
    }

    #[test]
    fn records_missing_sort_field_go_last() {
        let records = vec![
            record([("name", Value::from("unrated"))]),
            record([("name", Value::from("rated")), ("rating", Value::from(1.0))]),
        ];
        let ir = QueryIr::new(QueryKind::Select).with_sort("rating", SortDirection::Descending);
        let envelope = execute(&records, &ir);
        assert_eq!(envelope.rows[0].get("name"), Some(&json!("rated")));
    }

    #[test]
    fn execute_is_idempotent() {
        let records = catalog();
        let ir = QueryIr::new(QueryKind::Count).with_filter(ir::Predicate::gt("rating", 4.0));
        assert_eq!(execute(&records, &ir), execute(&records, &ir));
    }

    #[test]
    fn empty_dataset_is_a_normal_case() {
        let ir = QueryIr::new(QueryKind::Count);
        let envelope = execute(&[], &ir);
        assert_eq!(envelope.rows[0].get("count"), Some(&json!(0)));
    }
}
