//! Column-family compiler: HBase-shell scan/count/get statements.
//!
//! Filter leaves render as `SingleColumnValueFilter` clauses joined as a
//! logical AND — the only combinator the filter chain expresses. An `OR`
//! anywhere in the predicate is flagged in a comment instead of silently
//! dropping a branch. Column names are qualified by a fixed field →
//! column-family table.

use crate::dialects::{QueryCompiler, TargetDialect};
use crate::query::ir::{AggOp, CompareOp, Predicate, QueryIr, QueryKind};
use crate::types::Value;

/// Field → column-family assignment. Rating-like fields live in one
/// family, financial fields in another, everything else in the default.
#[derive(Debug, Clone)]
pub struct FamilyMap {
    pub families: Vec<(String, Vec<String>)>,
    pub default_family: String,
}

impl Default for FamilyMap {
    fn default() -> Self {
        Self {
            families: vec![
                (
                    "ratings".to_string(),
                    vec!["rating".to_string(), "score".to_string()],
                ),
                (
                    "financial".to_string(),
                    vec![
                        "budget".to_string(),
                        "gross".to_string(),
                        "price".to_string(),
                        "discounted_price".to_string(),
                        "actual_price".to_string(),
                    ],
                ),
            ],
            default_family: "info".to_string(),
        }
    }
}

impl FamilyMap {
    pub fn family_for(&self, field: &str) -> &str {
        self.families
            .iter()
            .find(|(_, fields)| fields.iter().any(|f| f == field))
            .map(|(family, _)| family.as_str())
            .unwrap_or(&self.default_family)
    }

    pub fn qualified(&self, field: &str) -> String {
        format!("{}:{}", self.family_for(field), field)
    }
}

pub struct ColumnFamilyCompiler {
    families: FamilyMap,
}

impl ColumnFamilyCompiler {
    pub fn new(families: FamilyMap) -> Self {
        Self { families }
    }
}

impl Default for ColumnFamilyCompiler {
    fn default() -> Self {
        Self::new(FamilyMap::default())
    }
}

impl QueryCompiler for ColumnFamilyCompiler {
    fn compile(&self, ir: &QueryIr) -> String {
        let clauses = self.filter_clauses(&ir.filter);
        let mut lines: Vec<String> = Vec::new();

        match ir.kind {
            QueryKind::Count => {
                if clauses.is_empty() {
                    lines.push(format!("count '{}'", ir.collection));
                } else {
                    lines.push(self.scan(ir, &[], &clauses, None));
                    lines.push("# Count the rows returned by the scan".to_string());
                }
            }
            QueryKind::Average | QueryKind::Sum | QueryKind::Max | QueryKind::Min => {
                let field = ir.aggregation.as_ref().map(|a| a.field.as_str());
                let mut columns = Vec::new();
                if let Some(field) = field {
                    columns.push(self.families.qualified(field));
                }
                if let Some(group) = &ir.group_by {
                    columns.push(self.families.qualified(group));
                }
                lines.push(self.scan(ir, &columns, &clauses, None));
                let verb = match ir.kind {
                    QueryKind::Average => "average",
                    QueryKind::Sum => "sum",
                    QueryKind::Max => "maximum",
                    _ => "minimum",
                };
                match field {
                    Some(field) => lines.push(format!(
                        "# Compute the {} of {} client-side over the scanned rows",
                        verb,
                        self.families.qualified(field)
                    )),
                    None => lines.push(format!(
                        "# No aggregation field given; scan only, {} left undefined",
                        verb
                    )),
                }
            }
            QueryKind::Group => {
                let mut columns = Vec::new();
                if let Some(group) = &ir.group_by {
                    columns.push(self.families.qualified(group));
                }
                if let Some(agg) = &ir.aggregation {
                    if agg.op != AggOp::Count {
                        columns.push(self.families.qualified(&agg.field));
                    }
                }
                lines.push(self.scan(ir, &columns, &clauses, None));
                match &ir.group_by {
                    Some(group) => lines.push(format!(
                        "# Group the scanned rows client-side by {}",
                        self.families.qualified(group)
                    )),
                    None => lines.push("# No group_by field given; scan only".to_string()),
                }
            }
            QueryKind::SchemaInfo => {
                lines.push(format!("describe '{}'", ir.collection));
            }
            QueryKind::Select => {
                lines.push(self.scan(ir, &[], &clauses, Some(ir.effective_select_limit())));
            }
        }

        let has_in = ir
            .filter
            .conjunctive_leaves()
            .iter()
            .any(|l| matches!(l, Predicate::Leaf { op: CompareOp::In, .. }));
        if has_in {
            lines.push(
                "# IN filters have no single-filter form; scan and filter client-side".to_string(),
            );
        }
        if ir.filter.contains_or() {
            lines.push(
                "# OR is not expressible in a SingleColumnValueFilter chain; \
                 run one scan per branch and merge"
                    .to_string(),
            );
        }

        lines.join("\n")
    }

    fn dialect(&self) -> TargetDialect {
        TargetDialect::ColumnFamily
    }
}

impl ColumnFamilyCompiler {
    /// AND-joined `SingleColumnValueFilter` clauses for the conjunctive
    /// leaves; `In` has no single-filter equivalent and is skipped here
    /// (the commentary layer reports it).
    fn filter_clauses(&self, predicate: &Predicate) -> Vec<String> {
        predicate
            .conjunctive_leaves()
            .iter()
            .filter_map(|leaf| {
                let Predicate::Leaf { field, op, value } = leaf else {
                    return None;
                };
                let family = self.families.family_for(field);
                match op {
                    CompareOp::Contains => Some(format!(
                        "SingleColumnValueFilter('{}', '{}', =, 'regexstring:(?i).*{}.*')",
                        family, field, value
                    )),
                    CompareOp::In => None,
                    _ => Some(format!(
                        "SingleColumnValueFilter('{}', '{}', {}, 'binary:{}')",
                        family,
                        field,
                        shell_op(*op),
                        binary_literal(value)
                    )),
                }
            })
            .collect()
    }

    fn scan(
        &self,
        ir: &QueryIr,
        columns: &[String],
        clauses: &[String],
        limit: Option<usize>,
    ) -> String {
        let mut options: Vec<String> = Vec::new();
        if !columns.is_empty() {
            let list: Vec<String> = columns.iter().map(|c| format!("'{}'", c)).collect();
            options.push(format!("COLUMNS => [{}]", list.join(", ")));
        }
        if !clauses.is_empty() {
            options.push(format!("FILTER => \"{}\"", clauses.join(" AND ")));
        }
        if let Some(limit) = limit {
            options.push(format!("LIMIT => {}", limit));
        }
        if options.is_empty() {
            format!("scan '{}'", ir.collection)
        } else {
            format!("scan '{}', {{{}}}", ir.collection, options.join(", "))
        }
    }
}

fn shell_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Ne => "!=",
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
        CompareOp::Contains | CompareOp::In => "=",
    }
}

fn binary_literal(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(ir: &QueryIr) -> String {
        ColumnFamilyCompiler::default().compile(ir)
    }

    #[test]
    fn count_without_filter_is_bare_count() {
        let text = compile(&QueryIr::new(QueryKind::Count));
        assert_eq!(text, "count 'products'");
    }

    #[test]
    fn count_with_filter_scans() {
        let ir = QueryIr::new(QueryKind::Count).with_filter(Predicate::gt("rating", 4.0));
        let text = compile(&ir);
        assert!(text.contains("SingleColumnValueFilter('ratings', 'rating', >, 'binary:4')"));
    }

    #[test]
    fn families_qualify_columns() {
        let map = FamilyMap::default();
        assert_eq!(map.qualified("rating"), "ratings:rating");
        assert_eq!(map.qualified("gross"), "financial:gross");
        assert_eq!(map.qualified("name"), "info:name");
    }

    #[test]
    fn aggregation_scan_restricts_columns() {
        let ir = QueryIr::new(QueryKind::Average)
            .with_aggregation("price", AggOp::Avg)
            .with_group_by("category");
        let text = compile(&ir);
        assert!(text.contains("COLUMNS => ['financial:price', 'info:category']"));
        assert!(text.contains("# Compute the average"));
    }

    #[test]
    fn and_leaves_join_in_one_filter() {
        let ir = QueryIr::new(QueryKind::Select).with_filter(Predicate::and(vec![
            Predicate::eq("category", "Cables"),
            Predicate::gte("rating", 4.0),
        ]));
        let text = compile(&ir);
        assert!(text.contains(
            "SingleColumnValueFilter('info', 'category', =, 'binary:Cables') AND \
             SingleColumnValueFilter('ratings', 'rating', >=, 'binary:4')"
        ));
    }

    #[test]
    fn or_filter_gets_flagged_not_dropped() {
        let ir = QueryIr::new(QueryKind::Select).with_filter(Predicate::or(vec![
            Predicate::eq("category", "Audio"),
            Predicate::eq("category", "Cables"),
        ]));
        let text = compile(&ir);
        assert!(text.contains("# OR is not expressible"));
    }

    #[test]
    fn contains_renders_case_insensitive_regexstring() {
        let ir = QueryIr::new(QueryKind::Select).with_filter(Predicate::contains("name", "usb"));
        let text = compile(&ir);
        assert!(text.contains("'regexstring:(?i).*usb.*'"));
    }

    #[test]
    fn select_applies_limit_option() {
        let ir = QueryIr::new(QueryKind::Select).with_limit(7);
        let text = compile(&ir);
        assert!(text.contains("LIMIT => 7"));
    }

    #[test]
    fn every_kind_produces_output() {
        for kind in [
            QueryKind::Select,
            QueryKind::Count,
            QueryKind::Average,
            QueryKind::Sum,
            QueryKind::Max,
            QueryKind::Min,
            QueryKind::Group,
            QueryKind::SchemaInfo,
        ] {
            assert!(!compile(&QueryIr::new(kind)).is_empty(), "{:?}", kind);
        }
    }
}
