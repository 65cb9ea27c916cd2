//! Graph-pattern compiler: Cypher-style pattern matching.
//!
//! Renders a single-node `MATCH` plus a `WHERE` built from the predicate
//! tree and a `RETURN`/`ORDER BY`/`LIMIT` tail per kind. Leaves under an
//! `OR` are flattened into the top-level AND — a documented
//! simplification, flagged in the output rather than hidden.

use crate::dialects::{QueryCompiler, TargetDialect};
use crate::query::ir::{AggOp, CompareOp, Predicate, QueryIr, QueryKind, SortDirection};
use crate::types::Value;

pub struct GraphPatternCompiler {
    /// Node variable in the generated pattern.
    var: &'static str,
}

impl GraphPatternCompiler {
    pub fn new() -> Self {
        Self { var: "n" }
    }
}

impl Default for GraphPatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Node label derived from the collection name: singular, capitalized
/// (`products` → `Product`).
fn node_label(collection: &str) -> String {
    let singular = collection.strip_suffix('s').unwrap_or(collection);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Node".to_string(),
    }
}

/// Property names may not carry dots in a pattern; the loader flattens
/// nested fields with underscores and the compiler follows suit.
fn property(field: &str) -> String {
    field.replace('.', "_")
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "\\'")),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl QueryCompiler for GraphPatternCompiler {
    fn compile(&self, ir: &QueryIr) -> String {
        let var = self.var;
        let mut parts = vec![format!("MATCH ({}:{})", var, node_label(&ir.collection))];

        let conditions: Vec<String> = ir
            .filter
            .all_leaves()
            .into_iter()
            .filter_map(|leaf| self.condition(leaf))
            .collect();
        if !conditions.is_empty() {
            parts.push(format!("WHERE {}", conditions.join(" AND ")));
        }
        if ir.filter.contains_or() {
            parts.push("// OR branches flattened into the AND chain above".to_string());
        }

        match ir.kind {
            QueryKind::Count => match &ir.group_by {
                Some(group) => {
                    parts.push(format!(
                        "RETURN {}.{} AS group, COUNT({}) AS count",
                        var,
                        property(group),
                        var
                    ));
                    parts.push("ORDER BY count DESC".to_string());
                }
                None => parts.push(format!("RETURN COUNT({}) AS count", var)),
            },
            QueryKind::Average => self.metric_tail(ir, "AVG", "average", &mut parts),
            QueryKind::Sum => self.metric_tail(ir, "SUM", "total", &mut parts),
            QueryKind::Max => self.extremum_tail(ir, true, &mut parts),
            QueryKind::Min => self.extremum_tail(ir, false, &mut parts),
            QueryKind::Group => self.group_tail(ir, &mut parts),
            QueryKind::SchemaInfo => {
                // Pattern matching has nothing to say about schema; hand
                // back the introspection call.
                return "CALL db.schema.visualization()".to_string();
            }
            QueryKind::Select => {
                parts.push(format!("RETURN {}", var));
                if let Some(sort) = &ir.sort {
                    let dir = match sort.direction {
                        SortDirection::Ascending => "ASC",
                        SortDirection::Descending => "DESC",
                    };
                    parts.push(format!("ORDER BY {}.{} {}", var, property(&sort.field), dir));
                }
                parts.push(format!("LIMIT {}", ir.effective_select_limit()));
            }
        }

        parts.join("\n")
    }

    fn dialect(&self) -> TargetDialect {
        TargetDialect::GraphPattern
    }
}

impl GraphPatternCompiler {
    fn condition(&self, leaf: &Predicate) -> Option<String> {
        let Predicate::Leaf { field, op, value } = leaf else {
            return None;
        };
        let prop = format!("{}.{}", self.var, property(field));
        Some(match op {
            CompareOp::Eq => format!("{} = {}", prop, literal(value)),
            CompareOp::Ne => format!("{} <> {}", prop, literal(value)),
            CompareOp::Gt => format!("{} > {}", prop, literal(value)),
            CompareOp::Gte => format!("{} >= {}", prop, literal(value)),
            CompareOp::Lt => format!("{} < {}", prop, literal(value)),
            CompareOp::Lte => format!("{} <= {}", prop, literal(value)),
            CompareOp::Contains => format!("{} =~ '(?i).*{}.*'", prop, value),
            CompareOp::In => match value {
                Value::List(_) => format!("{} IN {}", prop, literal(value)),
                single => format!("{} IN [{}]", prop, literal(single)),
            },
        })
    }

    fn metric_tail(&self, ir: &QueryIr, func: &str, alias: &str, parts: &mut Vec<String>) {
        let var = self.var;
        let Some(agg) = &ir.aggregation else {
            parts.push(format!("RETURN COUNT({}) AS count", var));
            parts.push(format!("// no aggregation field given; {} left undefined", alias));
            return;
        };
        let prop = property(&agg.field);
        match &ir.group_by {
            Some(group) => {
                parts.push(format!(
                    "RETURN {}.{} AS group, {}({}.{}) AS {}",
                    var,
                    property(group),
                    func,
                    var,
                    prop,
                    alias
                ));
                parts.push(format!("ORDER BY {} DESC", alias));
            }
            None => parts.push(format!("RETURN {}({}.{}) AS {}", func, var, prop, alias)),
        }
    }

    fn extremum_tail(&self, ir: &QueryIr, want_max: bool, parts: &mut Vec<String>) {
        let var = self.var;
        let (func, dir, alias) = if want_max {
            ("MAX", "DESC", "max_value")
        } else {
            ("MIN", "ASC", "min_value")
        };
        let Some(agg) = &ir.aggregation else {
            parts.push(format!("RETURN {}", var));
            parts.push("// no aggregation field given; returning bare nodes".to_string());
            return;
        };
        let prop = property(&agg.field);
        match &ir.group_by {
            Some(group) => {
                parts.push(format!(
                    "RETURN {}.{} AS group, {}({}.{}) AS {}",
                    var,
                    property(group),
                    func,
                    var,
                    prop,
                    alias
                ));
                parts.push(format!("ORDER BY {} {}", alias, dir));
            }
            None => {
                parts.push(format!("RETURN {}, {}.{}", var, var, prop));
                parts.push(format!("ORDER BY {}.{} {}", var, prop, dir));
                parts.push("LIMIT 1".to_string());
            }
        }
    }

    fn group_tail(&self, ir: &QueryIr, parts: &mut Vec<String>) {
        let var = self.var;
        let Some(group) = &ir.group_by else {
            parts.push(format!("RETURN COUNT({}) AS count", var));
            parts.push("// no group_by field given; counting instead".to_string());
            return;
        };
        let group_prop = property(group);
        let op = ir.aggregation.as_ref().map(|a| a.op).unwrap_or(AggOp::Count);
        match op {
            AggOp::Count => {
                parts.push(format!(
                    "RETURN {}.{} AS group, COUNT({}) AS count",
                    var, group_prop, var
                ));
                parts.push("ORDER BY count DESC".to_string());
            }
            AggOp::Avg | AggOp::Sum | AggOp::Max | AggOp::Min => {
                let (func, alias, dir) = match op {
                    AggOp::Avg => ("AVG", "average", "DESC"),
                    AggOp::Sum => ("SUM", "total", "DESC"),
                    AggOp::Max => ("MAX", "max_value", "DESC"),
                    AggOp::Min => ("MIN", "min_value", "ASC"),
                    AggOp::Count => unreachable!("handled above"),
                };
                let field = ir
                    .aggregation
                    .as_ref()
                    .map(|a| property(&a.field))
                    .unwrap_or_default();
                parts.push(format!(
                    "RETURN {}.{} AS group, {}({}.{}) AS {}",
                    var, group_prop, func, var, field, alias
                ));
                parts.push(format!("ORDER BY {} {}", alias, dir));
            }
        }
    }
}
