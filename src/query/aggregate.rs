//! Aggregation over a filtered record subset.
//!
//! Consumes the evaluator's subset plus the IR's aggregation/group-by
//! clause and produces a typed result. Ordering rules are part of the
//! contract: grouped counts sort by descending count with first-seen
//! tie-break, grouped metrics by descending value, grouped extrema keep
//! the first-appearance order of their group keys, and an exact extremum
//! tie keeps the first record encountered. Malformed or empty input
//! degrades to [`AggregateResult::Empty`] — never an error.

use std::collections::HashMap;

use tracing::debug;

use crate::query::ir::{AggOp, Aggregation, QueryKind};
use crate::types::Record;

/// Typed outcome of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    /// Degenerate input: nothing to aggregate, or a malformed request
    /// (e.g. an averaging kind with no aggregation field).
    Empty,
    Count(usize),
    GroupedCount(Vec<(String, usize)>),
    Scalar {
        field: String,
        value: f64,
    },
    Grouped {
        field: String,
        op: AggOp,
        entries: Vec<(String, f64)>,
    },
    Extremum {
        field: String,
        value: f64,
        record: Record,
    },
    GroupedExtremum {
        field: String,
        entries: Vec<(String, f64, Record)>,
    },
}

/// Apply the aggregating kinds (`Count`, `Average`, `Sum`, `Max`, `Min`,
/// `Group`) to an already-filtered subset. `Select` and `SchemaInfo`
/// bypass the engine entirely.
pub fn aggregate(
    subset: &[&Record],
    kind: QueryKind,
    aggregation: Option<&Aggregation>,
    group_by: Option<&str>,
) -> AggregateResult {
    let op = match effective_op(kind, aggregation) {
        Some(op) => op,
        None => return AggregateResult::Empty,
    };

    // A group query with no grouping column: refuse to guess one.
    if kind == QueryKind::Group && group_by.is_none() {
        return AggregateResult::Empty;
    }

    // Grouping and aggregating on the identical field is definitionally
    // degenerate for anything but a count; substitute count semantics.
    let op = match (group_by, aggregation) {
        (Some(group), Some(agg)) if agg.field == group && op != AggOp::Count => {
            debug!(field = group, "group_by equals aggregation field; counting instead");
            AggOp::Count
        }
        _ => op,
    };

    if op == AggOp::Count {
        return match group_by {
            None => AggregateResult::Count(subset.len()),
            Some(group) => grouped_count(subset, group),
        };
    }

    // Non-count operations need a field to aggregate over.
    let field = match aggregation {
        Some(agg) => agg.field.as_str(),
        None => return AggregateResult::Empty,
    };

    match (op, group_by) {
        (AggOp::Avg, None) => mean(&numeric_values(subset, field))
            .map(|value| AggregateResult::Scalar {
                field: field.to_string(),
                value,
            })
            .unwrap_or(AggregateResult::Empty),
        (AggOp::Sum, None) => AggregateResult::Scalar {
            field: field.to_string(),
            value: numeric_values(subset, field).iter().sum(),
        },
        (AggOp::Avg, Some(group)) => grouped_metric(subset, group, field, AggOp::Avg),
        (AggOp::Sum, Some(group)) => grouped_metric(subset, group, field, AggOp::Sum),
        (AggOp::Max, None) => extremum(subset, field, true),
        (AggOp::Min, None) => extremum(subset, field, false),
        (AggOp::Max, Some(group)) => grouped_extremum(subset, group, field, true),
        (AggOp::Min, Some(group)) => grouped_extremum(subset, group, field, false),
        (AggOp::Count, _) => unreachable!("count handled above"),
    }
}

/// The operation a kind stands for. `Group` takes it from the aggregation
/// clause (count when absent); non-aggregating kinds have none.
fn effective_op(kind: QueryKind, aggregation: Option<&Aggregation>) -> Option<AggOp> {
    match kind {
        QueryKind::Count => Some(AggOp::Count),
        QueryKind::Average => Some(AggOp::Avg),
        QueryKind::Sum => Some(AggOp::Sum),
        QueryKind::Max => Some(AggOp::Max),
        QueryKind::Min => Some(AggOp::Min),
        QueryKind::Group => Some(aggregation.map(|a| a.op).unwrap_or(AggOp::Count)),
        QueryKind::Select | QueryKind::SchemaInfo => None,
    }
}

/// Partition the subset by the string form of the grouping field,
/// preserving first-appearance order of the keys. Records missing the
/// field fall out of every partition.
fn partition<'a>(subset: &[&'a Record], group: &str) -> Vec<(String, Vec<&'a Record>)> {
    let mut order: Vec<(String, Vec<&'a Record>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for &record in subset {
        let Some(value) = record.get(group) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let key = value.to_string();
        match index.get(&key) {
            Some(&i) => order[i].1.push(record),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![record]));
            }
        }
    }
    order
}

fn grouped_count(subset: &[&Record], group: &str) -> AggregateResult {
    if subset.is_empty() {
        return AggregateResult::Empty;
    }
    let mut entries: Vec<(String, usize)> = partition(subset, group)
        .into_iter()
        .map(|(key, members)| (key, members.len()))
        .collect();
    // Stable sort: ties keep first-seen key order.
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    AggregateResult::GroupedCount(entries)
}

fn numeric_values(subset: &[&Record], field: &str) -> Vec<f64> {
    subset
        .iter()
        .filter_map(|r| r.get(field).and_then(|v| v.as_f64()))
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn grouped_metric(subset: &[&Record], group: &str, field: &str, op: AggOp) -> AggregateResult {
    let mut entries: Vec<(String, f64)> = Vec::new();
    for (key, members) in partition(subset, group) {
        let values = numeric_values(&members, field);
        let value = match op {
            AggOp::Sum => values.iter().sum(),
            AggOp::Avg => match mean(&values) {
                Some(m) => m,
                // A partition with no numeric values has no average.
                None => continue,
            },
            _ => unreachable!("grouped_metric only handles sum/avg"),
        };
        entries.push((key, value));
    }
    if entries.is_empty() {
        return AggregateResult::Empty;
    }
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    AggregateResult::Grouped {
        field: field.to_string(),
        op,
        entries,
    }
}

/// Single extremal record; a strict comparison keeps the first record
/// encountered on exact ties.
fn pick_extremal<'a>(members: &[&'a Record], field: &str, want_max: bool) -> Option<(&'a Record, f64)> {
    let mut best: Option<(&Record, f64)> = None;
    for &record in members {
        let Some(value) = record.get(field).and_then(|v| v.as_f64()) else {
            continue;
        };
        best = match best {
            None => Some((record, value)),
            Some((_, current)) if (want_max && value > current) || (!want_max && value < current) => {
                Some((record, value))
            }
            keep => keep,
        };
    }
    best
}

fn extremum(subset: &[&Record], field: &str, want_max: bool) -> AggregateResult {
    match pick_extremal(subset, field, want_max) {
        Some((record, value)) => AggregateResult::Extremum {
            field: field.to_string(),
            value,
            record: (*record).clone(),
        },
        None => AggregateResult::Empty,
    }
}

fn grouped_extremum(subset: &[&Record], group: &str, field: &str, want_max: bool) -> AggregateResult {
    let mut entries: Vec<(String, f64, Record)> = Vec::new();
    // Partitions stay in first-appearance order of their key.
    for (key, members) in partition(subset, group) {
        if let Some((record, value)) = pick_extremal(&members, field, want_max) {
            entries.push((key, value, record.clone()));
        }
    }
    if entries.is_empty() {
        return AggregateResult::Empty;
    }
    AggregateResult::GroupedExtremum {
        field: field.to_string(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{record, Record, Value};

    fn refs(records: &[Record]) -> Vec<&Record> {
        records.iter().collect()
    }

    fn agg(field: &str, op: AggOp) -> Aggregation {
        Aggregation {
            field: field.to_string(),
            op,
        }
    }

    #[test]
    fn count_of_empty_subset_is_zero() {
        let result = aggregate(&[], QueryKind::Count, None, None);
        assert_eq!(result, AggregateResult::Count(0));
    }

    #[test]
    fn average_skips_non_numeric_values() {
        let records = vec![
            record([("price", Value::from(10.0))]),
            record([("price", Value::from(20.0))]),
            record([("price", Value::from("n/a"))]),
        ];
        let result = aggregate(
            &refs(&records),
            QueryKind::Average,
            Some(&agg("price", AggOp::Avg)),
            None,
        );
        assert_eq!(
            result,
            AggregateResult::Scalar {
                field: "price".into(),
                value: 15.0,
            }
        );
    }

    #[test]
    fn average_of_nothing_is_empty_sum_is_zero() {
        let records = vec![record([("name", Value::from("x"))])];
        let subset = refs(&records);
        assert_eq!(
            aggregate(&subset, QueryKind::Average, Some(&agg("price", AggOp::Avg)), None),
            AggregateResult::Empty
        );
        assert_eq!(
            aggregate(&subset, QueryKind::Sum, Some(&agg("price", AggOp::Sum)), None),
            AggregateResult::Scalar {
                field: "price".into(),
                value: 0.0,
            }
        );
    }

    #[test]
    fn missing_aggregation_field_degrades_to_empty() {
        let records = vec![record([("price", Value::from(10.0))])];
        assert_eq!(
            aggregate(&refs(&records), QueryKind::Average, None, None),
            AggregateResult::Empty
        );
    }

    #[test]
    fn grouped_count_orders_by_descending_count_first_seen_ties() {
        let records = vec![
            record([("category", Value::from("B"))]),
            record([("category", Value::from("A"))]),
            record([("category", Value::from("A"))]),
            record([("category", Value::from("C"))]),
        ];
        let result = aggregate(&refs(&records), QueryKind::Count, None, Some("category"));
        assert_eq!(
            result,
            AggregateResult::GroupedCount(vec![
                ("A".into(), 2),
                ("B".into(), 1),
                ("C".into(), 1),
            ])
        );
    }

    #[test]
    fn grouped_max_keeps_first_appearance_order() {
        let records = vec![
            record([("category", Value::from("A")), ("price", Value::from(10.0))]),
            record([("category", Value::from("B")), ("price", Value::from(20.0))]),
            record([("category", Value::from("A")), ("price", Value::from(30.0))]),
        ];
        let result = aggregate(
            &refs(&records),
            QueryKind::Max,
            Some(&agg("price", AggOp::Max)),
            Some("category"),
        );
        match result {
            AggregateResult::GroupedExtremum { entries, .. } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].0, "A");
                assert_eq!(entries[0].1, 30.0);
                assert_eq!(entries[1].0, "B");
                assert_eq!(entries[1].1, 20.0);
            }
            other => panic!("expected grouped extremum, got {:?}", other),
        }
    }

    #[test]
    fn extremum_tie_keeps_first_record() {
        let records = vec![
            record([("name", Value::from("first")), ("rating", Value::from(4.9))]),
            record([("name", Value::from("second")), ("rating", Value::from(4.9))]),
        ];
        let result = aggregate(
            &refs(&records),
            QueryKind::Max,
            Some(&agg("rating", AggOp::Max)),
            None,
        );
        match result {
            AggregateResult::Extremum { record, .. } => {
                assert_eq!(record.get("name"), Some(&Value::from("first")));
            }
            other => panic!("expected extremum, got {:?}", other),
        }
    }

    #[test]
    fn min_over_entirely_missing_field_is_empty() {
        let records = vec![record([("name", Value::from("x"))])];
        assert_eq!(
            aggregate(&refs(&records), QueryKind::Min, Some(&agg("price", AggOp::Min)), None),
            AggregateResult::Empty
        );
    }

    #[test]
    fn degenerate_group_by_aggregation_field_counts_instead() {
        let records = vec![
            record([("category", Value::from("A"))]),
            record([("category", Value::from("A"))]),
            record([("category", Value::from("B"))]),
        ];
        let result = aggregate(
            &refs(&records),
            QueryKind::Group,
            Some(&agg("category", AggOp::Sum)),
            Some("category"),
        );
        assert_eq!(
            result,
            AggregateResult::GroupedCount(vec![("A".into(), 2), ("B".into(), 1)])
        );
    }

    #[test]
    fn group_kind_without_aggregation_counts() {
        let records = vec![
            record([("category", Value::from("A"))]),
            record([("category", Value::from("B"))]),
        ];
        let result = aggregate(&refs(&records), QueryKind::Group, None, Some("category"));
        assert!(matches!(result, AggregateResult::GroupedCount(_)));
    }

    #[test]
    fn group_kind_without_group_by_is_empty() {
        let records = vec![record([("category", Value::from("A"))])];
        let result = aggregate(&refs(&records), QueryKind::Group, None, None);
        assert_eq!(result, AggregateResult::Empty);
    }

    #[test]
    fn grouped_sum_orders_by_descending_value() {
        let records = vec![
            record([("category", Value::from("A")), ("price", Value::from(5.0))]),
            record([("category", Value::from("B")), ("price", Value::from(50.0))]),
            record([("category", Value::from("A")), ("price", Value::from(10.0))]),
        ];
        let result = aggregate(
            &refs(&records),
            QueryKind::Group,
            Some(&agg("price", AggOp::Sum)),
            Some("category"),
        );
        assert_eq!(
            result,
            AggregateResult::Grouped {
                field: "price".into(),
                op: AggOp::Sum,
                entries: vec![("B".into(), 50.0), ("A".into(), 15.0)],
            }
        );
    }
}
