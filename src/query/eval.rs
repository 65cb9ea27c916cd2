//! Predicate evaluation over an in-memory record set.
//!
//! A pure, order-preserving filter. Records are matched by position, so
//! duplicate records survive AND/OR combination correctly, and nothing in
//! here can fail: missing fields, non-numeric operands and malformed
//! literals make a leaf not match — upstream documents come from a
//! language model and must never crash the pipeline.

use std::cmp::Ordering;

use crate::query::ir::{CompareOp, Predicate};
use crate::types::{Record, Value};

/// Filter `records` down to the matching subset, preserving input order.
pub fn apply_filter<'a>(records: &'a [Record], predicate: &Predicate) -> Vec<&'a Record> {
    if predicate.matches_all() {
        return records.iter().collect();
    }
    records.iter().filter(|r| matches(r, predicate)).collect()
}

/// Does a single record satisfy the predicate?
///
/// `And` is the intersection and `Or` the union of the children's match
/// sets; evaluated per record position, those are plain conjunction and
/// disjunction.
pub fn matches(record: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::All => true,
        Predicate::And(children) => children.iter().all(|c| matches(record, c)),
        // An empty combinator constrains nothing, same as `All`.
        Predicate::Or(children) => children.is_empty() || children.iter().any(|c| matches(record, c)),
        Predicate::Leaf { field, op, value } => match_leaf(record, field, *op, value),
    }
}

fn match_leaf(record: &Record, field: &str, op: CompareOp, literal: &Value) -> bool {
    let actual = record.get(field);
    match op {
        CompareOp::Eq => actual.is_some_and(|a| a.same_scalar(literal)),
        // Missing differs from any literal.
        CompareOp::Ne => actual.map_or(true, |a| !a.same_scalar(literal)),
        CompareOp::Gt => numeric_cmp(actual, literal).is_some_and(|ord| ord == Ordering::Greater),
        CompareOp::Gte => numeric_cmp(actual, literal).is_some_and(|ord| ord != Ordering::Less),
        CompareOp::Lt => numeric_cmp(actual, literal).is_some_and(|ord| ord == Ordering::Less),
        CompareOp::Lte => numeric_cmp(actual, literal).is_some_and(|ord| ord != Ordering::Greater),
        CompareOp::Contains => actual.is_some_and(|a| contains_ci(a, literal)),
        CompareOp::In => match (actual, literal) {
            (Some(a), Value::List(members)) => members.iter().any(|m| a.same_scalar(m)),
            _ => false,
        },
    }
}

/// Ordering between a record value and a literal, defined only when both
/// sides are numeric. `None` means the leaf does not match.
fn numeric_cmp(actual: Option<&Value>, literal: &Value) -> Option<Ordering> {
    let a = actual?.as_f64()?;
    let b = literal.as_f64()?;
    a.partial_cmp(&b)
}

/// Case-insensitive containment of the literal's string form within the
/// record value's string form.
fn contains_ci(actual: &Value, literal: &Value) -> bool {
    if actual.is_null() {
        return false;
    }
    let haystack = actual.to_string().to_lowercase();
    let needle = literal.to_string().to_lowercase();
    haystack.contains(&needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record;

    fn catalog() -> Vec<Record> {
        vec![
            record([
                ("name", Value::from("USB Cable")),
                ("category", Value::from("Cables")),
                ("rating", Value::from(3.5)),
                ("price", Value::from(10.0)),
            ]),
            record([
                ("name", Value::from("HDMI Cable")),
                ("category", Value::from("Cables")),
                ("rating", Value::from(4.2)),
                ("price", Value::from(20.0)),
            ]),
            record([
                ("name", Value::from("Speaker")),
                ("category", Value::from("Audio")),
                ("rating", Value::from(4.9)),
            ]),
        ]
    }

    #[test]
    fn gt_keeps_records_above_threshold_in_order() {
        let records = catalog();
        let subset = apply_filter(&records, &Predicate::gt("rating", 4.0));
        let ratings: Vec<f64> = subset
            .iter()
            .map(|r| r.get("rating").unwrap().as_f64().unwrap())
            .collect();
        assert_eq!(ratings, vec![4.2, 4.9]);
    }

    #[test]
    fn empty_predicate_is_identity() {
        let records = catalog();
        let subset = apply_filter(&records, &Predicate::All);
        assert_eq!(subset.len(), records.len());
        let subset = apply_filter(&records, &Predicate::And(vec![]));
        assert_eq!(subset.len(), records.len());
    }

    #[test]
    fn comparison_skips_missing_and_non_numeric() {
        let records = vec![
            record([("price", Value::from(5.0))]),
            record([("price", Value::from("n/a"))]),
            record([("name", Value::from("no price"))]),
        ];
        let subset = apply_filter(&records, &Predicate::gt("price", 1.0));
        assert_eq!(subset.len(), 1);
    }

    #[test]
    fn non_numeric_literal_matches_nothing() {
        let records = catalog();
        let p = Predicate::leaf("rating", CompareOp::Gt, Value::from("high"));
        assert!(apply_filter(&records, &p).is_empty());
    }

    #[test]
    fn ne_treats_missing_as_different() {
        let records = catalog();
        let subset = apply_filter(&records, &Predicate::ne("price", 10.0));
        // HDMI Cable (20.0) and Speaker (missing) both differ.
        assert_eq!(subset.len(), 2);
    }

    #[test]
    fn contains_is_case_insensitive_and_skips_missing() {
        let records = catalog();
        let subset = apply_filter(&records, &Predicate::contains("name", "cable"));
        assert_eq!(subset.len(), 2);
        let subset = apply_filter(&records, &Predicate::contains("missing_field", "x"));
        assert!(subset.is_empty());
    }

    #[test]
    fn contains_uses_string_form_of_numbers() {
        let records = vec![record([("year", Value::from(2024_i64))])];
        let subset = apply_filter(&records, &Predicate::contains("year", "202"));
        assert_eq!(subset.len(), 1);
    }

    #[test]
    fn one_of_membership() {
        let records = catalog();
        let p = Predicate::one_of(
            "category",
            vec![Value::from("Audio"), Value::from("Video")],
        );
        let subset = apply_filter(&records, &p);
        assert_eq!(subset.len(), 1);
    }

    #[test]
    fn eq_never_coerces_string_to_number() {
        let records = vec![record([("code", Value::from("42"))])];
        assert!(apply_filter(&records, &Predicate::eq("code", 42_i64)).is_empty());
        assert_eq!(apply_filter(&records, &Predicate::eq("code", "42")).len(), 1);
    }

    #[test]
    fn and_or_combination_over_duplicates() {
        let dup = record([("rating", Value::from(4.5))]);
        let records = vec![dup.clone(), dup];
        let p = Predicate::or(vec![
            Predicate::gt("rating", 4.0),
            Predicate::lt("rating", 1.0),
        ]);
        // Both duplicate positions match exactly once.
        assert_eq!(apply_filter(&records, &p).len(), 2);
    }

    #[test]
    fn unknown_field_yields_no_matches() {
        let records = catalog();
        assert!(apply_filter(&records, &Predicate::eq("ghost", 1_i64)).is_empty());
    }
}
