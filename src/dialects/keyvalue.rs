//! Key-value compiler: Redis-style command sequences.
//!
//! The key-value model has no query language, so this renderer emits the
//! command sequence an operator would run, with `#` commentary for every
//! step the store cannot do server-side (numeric filters, aggregation
//! across keys). Equality filters on an indexed field become direct
//! set/sorted-set lookups; everything else falls back to an
//! enumerate-then-filter recipe. Deliberately lossy but informative.

use crate::dialects::{QueryCompiler, TargetDialect};
use crate::query::ir::{AggOp, CompareOp, Predicate, QueryIr, QueryKind, SortDirection};

/// A field backed by one membership set per value, plus a catalog set of
/// all values (`category:<value>`, `categories:all`).
#[derive(Debug, Clone)]
pub struct SetIndex {
    pub field: String,
    pub key_prefix: String,
    pub catalog_key: String,
}

/// A field mirrored into a sorted set (`products:by_rating`), optionally
/// per set-index value (`category:<value>:by_rating`).
#[derive(Debug, Clone)]
pub struct ZsetIndex {
    pub field: String,
    pub suffix: String,
}

/// Key layout the dataset was loaded under.
#[derive(Debug, Clone)]
pub struct KeySpace {
    /// Prefix of the whole-collection keys: `products:all`, `products:by_*`.
    pub prefix: String,
    /// Prefix of the per-record hashes: `product:<id>`.
    pub entity: String,
    pub set_indexes: Vec<SetIndex>,
    pub zset_indexes: Vec<ZsetIndex>,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self {
            prefix: "products".to_string(),
            entity: "product".to_string(),
            set_indexes: vec![SetIndex {
                field: "category".to_string(),
                key_prefix: "category".to_string(),
                catalog_key: "categories:all".to_string(),
            }],
            zset_indexes: vec![
                ZsetIndex {
                    field: "rating".to_string(),
                    suffix: "rating".to_string(),
                },
                ZsetIndex {
                    field: "discounted_price".to_string(),
                    suffix: "price".to_string(),
                },
                ZsetIndex {
                    field: "price".to_string(),
                    suffix: "price".to_string(),
                },
            ],
        }
    }
}

impl KeySpace {
    fn set_index(&self, field: &str) -> Option<&SetIndex> {
        self.set_indexes.iter().find(|i| i.field == field)
    }

    fn zset_index(&self, field: &str) -> Option<&ZsetIndex> {
        self.zset_indexes.iter().find(|i| i.field == field)
    }
}

pub struct KeyValueCompiler {
    keyspace: KeySpace,
}

impl KeyValueCompiler {
    pub fn new(keyspace: KeySpace) -> Self {
        Self { keyspace }
    }
}

impl Default for KeyValueCompiler {
    fn default() -> Self {
        Self::new(KeySpace::default())
    }
}

/// The filter pieces this target can act on.
struct FilterView<'a> {
    /// `(index, value)` for the first equality/containment leaf on a
    /// set-indexed field.
    set_lookup: Option<(&'a SetIndex, String)>,
    /// Human-readable renderings of everything handled client-side.
    residual: Vec<String>,
    has_or: bool,
}

fn filter_view<'a>(keyspace: &'a KeySpace, predicate: &Predicate) -> FilterView<'a> {
    let mut view = FilterView {
        set_lookup: None,
        residual: Vec::new(),
        has_or: predicate.contains_or(),
    };
    for leaf in predicate.conjunctive_leaves() {
        let Predicate::Leaf { field, op, value } = leaf else {
            continue;
        };
        match op {
            CompareOp::Eq | CompareOp::Contains if keyspace.set_index(field).is_some() => {
                if view.set_lookup.is_none() {
                    let index = keyspace.set_index(field).expect("checked above");
                    view.set_lookup = Some((index, value.to_string()));
                } else {
                    view.residual.push(format!("{} {} {}", field, op.as_symbol(), value));
                }
            }
            _ => view.residual.push(format!("{} {} {}", field, op.as_symbol(), value)),
        }
    }
    view
}

impl QueryCompiler for KeyValueCompiler {
    fn compile(&self, ir: &QueryIr) -> String {
        let ks = &self.keyspace;
        let view = filter_view(ks, &ir.filter);
        let mut lines: Vec<String> = Vec::new();

        match ir.kind {
            QueryKind::Count => self.compile_count(ir, &view, &mut lines),
            QueryKind::Average | QueryKind::Sum => self.compile_metric(ir, &view, &mut lines),
            QueryKind::Max | QueryKind::Min => self.compile_extremum(ir, &view, &mut lines),
            QueryKind::Group => self.compile_group(ir, &view, &mut lines),
            QueryKind::SchemaInfo => {
                lines.push(format!("SCAN 0 MATCH {}:* COUNT 100", ks.entity));
                lines.push("# Inspect a sample hash for the field layout".to_string());
                lines.push(format!("HGETALL {}:<id>", ks.entity));
            }
            QueryKind::Select => self.compile_select(ir, &view, &mut lines),
        }

        for residual in &view.residual {
            lines.push(format!("# Filter client-side where {}", residual));
        }
        if view.has_or {
            lines.push("# OR branches require separate lookups merged client-side".to_string());
        }

        lines.join("\n")
    }

    fn dialect(&self) -> TargetDialect {
        TargetDialect::KeyValue
    }
}

impl KeyValueCompiler {
    fn members_lookup(&self, view: &FilterView, lines: &mut Vec<String>) {
        match &view.set_lookup {
            Some((index, value)) => {
                lines.push(format!("SMEMBERS {}:{}", index.key_prefix, value));
                lines.push(format!("# All ids with {} = {}", index.field, value));
            }
            None => {
                lines.push(format!("SMEMBERS {}:all", self.keyspace.prefix));
                lines.push("# All ids".to_string());
            }
        }
    }

    fn compile_count(&self, _ir: &QueryIr, view: &FilterView, lines: &mut Vec<String>) {
        match &view.set_lookup {
            Some((index, value)) => {
                lines.push(format!("SCARD {}:{}", index.key_prefix, value));
                lines.push(format!("# Count ids with {} = {}", index.field, value));
            }
            None => {
                lines.push(format!("SCARD {}:all", self.keyspace.prefix));
                lines.push("# Count all ids".to_string());
            }
        }
        if !view.residual.is_empty() {
            lines.push("# Residual filters below make this an upper bound".to_string());
        }
    }

    fn compile_metric(&self, ir: &QueryIr, view: &FilterView, lines: &mut Vec<String>) {
        let field = ir
            .aggregation
            .as_ref()
            .map(|a| a.field.as_str())
            .unwrap_or("<field>");
        let word = if ir.kind == QueryKind::Average { "average" } else { "sum" };
        self.members_lookup(view, lines);
        lines.push(format!("# For each id: HGET {}:<id> {}", self.keyspace.entity, field));
        lines.push(format!("# Compute the {} of {} client-side", word, field));
    }

    fn compile_extremum(&self, ir: &QueryIr, view: &FilterView, lines: &mut Vec<String>) {
        let field = ir
            .aggregation
            .as_ref()
            .map(|a| a.field.as_str())
            .unwrap_or("<field>");
        let word = if ir.kind == QueryKind::Max { "Max" } else { "Min" };

        match self.keyspace.zset_index(field) {
            Some(index) => {
                let command = if ir.kind == QueryKind::Max { "ZREVRANGE" } else { "ZRANGE" };
                let key = match &view.set_lookup {
                    Some((set, value)) => {
                        format!("{}:{}:by_{}", set.key_prefix, value, index.suffix)
                    }
                    None => format!("{}:by_{}", self.keyspace.prefix, index.suffix),
                };
                lines.push(format!("{} {} 0 0 WITHSCORES", command, key));
                lines.push(format!("# {} {} via the sorted-set index", word, field));
                lines.push(format!("HGETALL {}:<id>", self.keyspace.entity));
                lines.push("# Fetch the full record for the winning id".to_string());
            }
            None => {
                self.members_lookup(view, lines);
                lines.push(format!("# For each id: HGET {}:<id> {}", self.keyspace.entity, field));
                lines.push(format!(
                    "# No sorted-set index on {}; pick the {} client-side",
                    field,
                    word.to_lowercase()
                ));
            }
        }
    }

    fn compile_group(&self, ir: &QueryIr, _view: &FilterView, lines: &mut Vec<String>) {
        let group = ir.group_by.as_deref().unwrap_or("<field>");
        let op = ir.aggregation.as_ref().map(|a| a.op).unwrap_or(AggOp::Count);

        match self.keyspace.set_index(group) {
            Some(index) => {
                lines.push(format!("SMEMBERS {}", index.catalog_key));
                lines.push(format!("# All distinct {} values", group));
                lines.push("# For each value:".to_string());
                lines.push(format!("#   SCARD {}:<value>", index.key_prefix));
                if op != AggOp::Count {
                    let field = ir
                        .aggregation
                        .as_ref()
                        .map(|a| a.field.as_str())
                        .unwrap_or("<field>");
                    lines.push(format!(
                        "#   For each member id: HGET {}:<id> {}",
                        self.keyspace.entity, field
                    ));
                    lines.push(format!("#   Compute the {} of {} client-side", op.as_tag(), field));
                }
            }
            None => {
                lines.push(format!("SMEMBERS {}:all", self.keyspace.prefix));
                lines.push(format!(
                    "# No membership index on {}; group ids client-side by HGET {}:<id> {}",
                    group, self.keyspace.entity, group
                ));
            }
        }
    }

    fn compile_select(&self, ir: &QueryIr, view: &FilterView, lines: &mut Vec<String>) {
        self.members_lookup(view, lines);
        lines.push(format!("# For each id: HGETALL {}:<id>", self.keyspace.entity));
        if let Some(sort) = &ir.sort {
            match self.keyspace.zset_index(&sort.field) {
                Some(index) => {
                    let command = match sort.direction {
                        SortDirection::Descending => "ZREVRANGE",
                        SortDirection::Ascending => "ZRANGE",
                    };
                    lines.push(format!(
                        "# Order ids with {} {}:by_{} 0 -1",
                        command, self.keyspace.prefix, index.suffix
                    ));
                }
                None => lines.push(format!("# Sort by {} client-side", sort.field)),
            }
        }
        lines.push(format!("# Keep the first {} records", ir.effective_select_limit()));
    }
}
