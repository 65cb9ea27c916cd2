//! Document-store compiler: Mongo-style filter objects and pipelines.
//!
//! The predicate tree maps one-to-one onto operator tokens (`$gt`,
//! `$regex`, …) in a JSON value built structurally — the only string
//! assembly here is the outer `db.<collection>.<call>(...)` wrapper.
//! Pipeline stage order is fixed: match → group/sort → (extremum) project.

use serde_json::{json, Value as Json};

use crate::dialects::{QueryCompiler, TargetDialect};
use crate::query::ir::{AggOp, CompareOp, Predicate, QueryIr, QueryKind, SortDirection};
use crate::types::Value;

pub struct DocumentStoreCompiler;

impl DocumentStoreCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentStoreCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCompiler for DocumentStoreCompiler {
    fn compile(&self, ir: &QueryIr) -> String {
        match ir.kind {
            QueryKind::Count => compile_count(ir),
            QueryKind::Average => compile_metric(ir, "$avg", "average"),
            QueryKind::Sum => compile_metric(ir, "$sum", "sum"),
            QueryKind::Max => compile_extremum(ir, true),
            QueryKind::Min => compile_extremum(ir, false),
            QueryKind::Group => compile_group(ir),
            QueryKind::SchemaInfo => compile_schema(ir),
            QueryKind::Select => compile_select(ir),
        }
    }

    fn dialect(&self) -> TargetDialect {
        TargetDialect::DocumentStore
    }
}

/// Recursive predicate → filter-object rendering.
pub fn filter_object(predicate: &Predicate) -> Json {
    match predicate {
        Predicate::All => json!({}),
        Predicate::Leaf { field, op, value } => json!({ field.clone(): leaf_object(*op, value) }),
        Predicate::And(children) => combinator("$and", children),
        Predicate::Or(children) => combinator("$or", children),
    }
}

fn combinator(token: &str, children: &[Predicate]) -> Json {
    let mut rendered: Vec<Json> = children
        .iter()
        .filter(|c| !c.matches_all())
        .map(filter_object)
        .collect();
    if rendered.len() > 1 {
        json!({ token: rendered })
    } else {
        rendered.pop().unwrap_or_else(|| json!({}))
    }
}

fn leaf_object(op: CompareOp, value: &Value) -> Json {
    let literal = value_json(value);
    match op {
        CompareOp::Eq => literal,
        CompareOp::Ne => json!({"$ne": literal}),
        CompareOp::Gt => json!({"$gt": literal}),
        CompareOp::Gte => json!({"$gte": literal}),
        CompareOp::Lt => json!({"$lt": literal}),
        CompareOp::Lte => json!({"$lte": literal}),
        CompareOp::Contains => json!({"$regex": value.to_string(), "$options": "i"}),
        CompareOp::In => match literal {
            Json::Array(_) => json!({"$in": literal}),
            other => json!({"$in": [other]}),
        },
    }
}

fn value_json(value: &Value) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

fn pretty(value: &Json) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Leading `$match` stage, present only when the filter constrains anything.
fn match_stage(ir: &QueryIr) -> Option<Json> {
    if ir.filter.matches_all() {
        None
    } else {
        Some(json!({"$match": filter_object(&ir.filter)}))
    }
}

fn pipeline_call(ir: &QueryIr, stages: Vec<Json>) -> String {
    format!("db.{}.aggregate({})", ir.collection, pretty(&Json::Array(stages)))
}

fn compile_count(ir: &QueryIr) -> String {
    match &ir.group_by {
        Some(group) => {
            let mut stages = Vec::new();
            stages.extend(match_stage(ir));
            stages.push(json!({"$group": {"_id": format!("${group}"), "count": {"$sum": 1}}}));
            stages.push(json!({"$sort": {"count": -1}}));
            pipeline_call(ir, stages)
        }
        None => {
            if ir.filter.matches_all() {
                format!("db.{}.countDocuments()", ir.collection)
            } else {
                format!(
                    "db.{}.countDocuments({})",
                    ir.collection,
                    pretty(&filter_object(&ir.filter))
                )
            }
        }
    }
}

fn compile_metric(ir: &QueryIr, token: &str, label: &str) -> String {
    let field = match &ir.aggregation {
        Some(agg) => agg.field.clone(),
        None => {
            return format!(
                "// {} query without an aggregation field; nothing to compile\ndb.{}.find({})",
                label,
                ir.collection,
                pretty(&filter_object(&ir.filter))
            )
        }
    };
    let mut stages = Vec::new();
    stages.extend(match_stage(ir));
    // Null values would poison the average; exclude them up front.
    if token == "$avg" {
        stages.push(json!({"$match": {field.clone(): {"$ne": null}}}));
    }
    let id = match &ir.group_by {
        Some(group) => json!(format!("${group}")),
        None => Json::Null,
    };
    stages.push(json!({"$group": {"_id": id, label: {token: format!("${field}")}}}));
    if ir.group_by.is_some() {
        stages.push(json!({"$sort": {label: -1}}));
    }
    pipeline_call(ir, stages)
}

fn compile_extremum(ir: &QueryIr, want_max: bool) -> String {
    let field = ir
        .aggregation
        .as_ref()
        .map(|a| a.field.clone())
        .unwrap_or_else(|| "value".to_string());
    let order = if want_max { -1 } else { 1 };
    let label = if want_max { "max_value" } else { "min_value" };

    match &ir.group_by {
        Some(group) => {
            let mut stages = Vec::new();
            stages.extend(match_stage(ir));
            stages.push(json!({"$sort": {field.clone(): order}}));
            stages.push(json!({"$group": {
                "_id": format!("${group}"),
                label: {"$first": format!("${field}")},
                "doc": {"$first": "$$ROOT"}
            }}));
            stages.push(json!({"$project": {"_id": 1, label: 1, "doc": 1}}));
            pipeline_call(ir, stages)
        }
        None => format!(
            "db.{}.find({}).sort({}).limit(1)",
            ir.collection,
            pretty(&filter_object(&ir.filter)),
            pretty(&json!({ field: order })),
        ),
    }
}

fn compile_group(ir: &QueryIr) -> String {
    let Some(group) = &ir.group_by else {
        return format!(
            "// group query without a group_by field; nothing to compile\ndb.{}.find({})",
            ir.collection,
            pretty(&filter_object(&ir.filter))
        );
    };

    let (token, label, order) = match ir.aggregation.as_ref().map(|a| a.op) {
        Some(AggOp::Avg) => ("$avg", "average", -1),
        Some(AggOp::Sum) => ("$sum", "sum", -1),
        Some(AggOp::Max) => ("$max", "max", -1),
        Some(AggOp::Min) => ("$min", "min", 1),
        _ => ("$sum", "count", -1),
    };

    let mut stages = Vec::new();
    stages.extend(match_stage(ir));
    let accumulator = if label == "count" {
        json!({"$sum": 1})
    } else {
        let field = ir
            .aggregation
            .as_ref()
            .map(|a| a.field.clone())
            .unwrap_or_default();
        json!({ token: format!("${field}") })
    };
    stages.push(json!({"$group": {"_id": format!("${group}"), label: accumulator}}));
    stages.push(json!({"$sort": {label: order}}));
    pipeline_call(ir, stages)
}

fn compile_select(ir: &QueryIr) -> String {
    let mut call = format!(
        "db.{}.find({})",
        ir.collection,
        pretty(&filter_object(&ir.filter))
    );
    if let Some(sort) = &ir.sort {
        let order = match sort.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        call.push_str(&format!(".sort({})", pretty(&json!({sort.field.clone(): order}))));
    }
    if let Some(limit) = ir.limit {
        call.push_str(&format!(".limit({})", limit));
    }
    call
}

fn compile_schema(ir: &QueryIr) -> String {
    format!(
        "// schema inspection: sample one document, then collection stats\ndb.{}.aggregate([{{\"$sample\": {{\"size\": 1}}}}])\ndb.{}.stats()",
        ir.collection, ir.collection
    )
}
