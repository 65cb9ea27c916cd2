//! JSON boundary: decode the upstream generator's query document into the IR.
//!
//! The upstream language-model service emits a JSON object with keys
//! `type`, `collection`, `filter`, `aggregation`, `group_by`, `sort` and
//! `limit`, where `filter` uses document-store operator objects (`$and`,
//! `$or`, `$gt`, `$regex`, …). Decoding is total: unknown keys are ignored
//! and malformed fragments fall back to their defaults, so a partially
//! specified document still yields a usable IR. The only fallible entry
//! point is [`QueryIr::from_json_str`], which surfaces JSON syntax errors.

use serde_json::Value as Json;

use crate::query::ir::{AggOp, Aggregation, CompareOp, Predicate, QueryIr, QueryKind, SortSpec};
use crate::query::ir::{SortDirection, DEFAULT_COLLECTION};
use crate::types::Value;
use crate::{CoreError, Result};

impl QueryIr {
    /// Decode a query document. Never fails: anything unrecognizable
    /// decodes to the defaults (`select` over the whole collection).
    pub fn from_json(doc: &Json) -> QueryIr {
        let Some(map) = doc.as_object() else {
            return QueryIr::new(QueryKind::Select);
        };

        let kind = map
            .get("type")
            .and_then(Json::as_str)
            .and_then(QueryKind::from_tag)
            .unwrap_or(QueryKind::Select);

        let collection = map
            .get("collection")
            .and_then(Json::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_COLLECTION)
            .to_string();

        let filter = map.get("filter").map(decode_predicate).unwrap_or(Predicate::All);

        let aggregation = map.get("aggregation").and_then(decode_aggregation);
        let group_by = map
            .get("group_by")
            .and_then(Json::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let sort = map.get("sort").and_then(decode_sort);
        let limit = map
            .get("limit")
            .and_then(Json::as_i64)
            .filter(|n| *n > 0)
            .map(|n| n as usize);

        QueryIr {
            kind,
            collection,
            filter,
            aggregation,
            group_by,
            sort,
            limit,
        }
    }

    /// Decode from raw text. JSON syntax errors are the caller's to
    /// handle; everything past the syntax layer defaults as in
    /// [`QueryIr::from_json`].
    pub fn from_json_str(text: &str) -> Result<QueryIr> {
        let doc: Json =
            serde_json::from_str(text).map_err(|e| CoreError::Query(e.to_string()))?;
        Ok(QueryIr::from_json(&doc))
    }
}

fn decode_predicate(doc: &Json) -> Predicate {
    let Some(map) = doc.as_object() else {
        return Predicate::All;
    };

    let mut children = Vec::new();
    for (key, value) in map {
        match key.as_str() {
            "$and" => {
                if let Some(items) = value.as_array() {
                    children.push(Predicate::And(items.iter().map(decode_predicate).collect()));
                }
            }
            "$or" => {
                if let Some(items) = value.as_array() {
                    children.push(Predicate::Or(items.iter().map(decode_predicate).collect()));
                }
            }
            field => decode_field(field, value, &mut children),
        }
    }

    if children.len() > 1 {
        Predicate::And(children)
    } else {
        children.pop().unwrap_or(Predicate::All)
    }
}

fn decode_field(field: &str, value: &Json, out: &mut Vec<Predicate>) {
    let Some(ops) = value.as_object() else {
        out.push(Predicate::Leaf {
            field: field.to_string(),
            op: CompareOp::Eq,
            value: decode_value(value),
        });
        return;
    };

    // A comparison object may carry several operator keys; each becomes its
    // own single-operator leaf, conjoined by the surrounding And.
    for (op_key, op_value) in ops {
        let op = match op_key.as_str() {
            "$gt" => CompareOp::Gt,
            "$gte" => CompareOp::Gte,
            "$lt" => CompareOp::Lt,
            "$lte" => CompareOp::Lte,
            "$ne" => CompareOp::Ne,
            "$eq" => CompareOp::Eq,
            "$in" => CompareOp::In,
            "$regex" => CompareOp::Contains,
            // `$options` modifies `$regex`; containment is already
            // case-insensitive, so the modifier carries no information.
            _ => continue,
        };
        out.push(Predicate::Leaf {
            field: field.to_string(),
            op,
            value: decode_value(op_value),
        });
    }
}

fn decode_value(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(decode_value).collect()),
        // Nested documents have no scalar meaning in a record; a Null
        // literal simply never matches.
        Json::Object(_) => Value::Null,
    }
}

fn decode_aggregation(value: &Json) -> Option<Aggregation> {
    let map = value.as_object()?;
    let field = map
        .get("field")
        .and_then(Json::as_str)
        .filter(|s| !s.is_empty())?
        .to_string();
    let op = map
        .get("operation")
        .or_else(|| map.get("op"))
        .and_then(Json::as_str)
        .and_then(AggOp::from_tag)
        .unwrap_or(AggOp::Count);
    Some(Aggregation { field, op })
}

fn decode_sort(value: &Json) -> Option<SortSpec> {
    let map = value.as_object()?;
    let field = map
        .get("field")
        .and_then(Json::as_str)
        .filter(|s| !s.is_empty())?
        .to_string();

    // The generator uses Mongo-style order integers; string directions are
    // accepted for hand-written documents.
    let direction = match map.get("order") {
        Some(order) => {
            if order.as_i64() == Some(1) {
                SortDirection::Ascending
            } else if let Some(tag) = order.as_str() {
                if tag.eq_ignore_ascii_case("asc") || tag.eq_ignore_ascii_case("ascending") {
                    SortDirection::Ascending
                } else {
                    SortDirection::Descending
                }
            } else {
                SortDirection::Descending
            }
        }
        None => SortDirection::Descending,
    };

    Some(SortSpec { field, direction })
}
