//! Backend-agnostic query intermediate representation.
//!
//! Every incoming request is described by one [`QueryIr`]: what to compute
//! ([`QueryKind`]), over which records ([`Predicate`]), and how to shape the
//! result (aggregation, grouping, sort, limit). The IR is constructed once —
//! by the upstream language-model boundary or directly in tests — consumed
//! by the in-memory execution path and by each target compiler, and never
//! mutated afterwards.

use crate::types::Value;

/// Row cap applied to `Select` results when the IR carries no limit.
pub const DEFAULT_SELECT_LIMIT: usize = 20;

/// Collection queried when the request does not name one.
pub const DEFAULT_COLLECTION: &str = "products";

/// The active query variant. Exactly one applies per request and every
/// consumer matches on it exhaustively, so adding a kind forces updates in
/// the aggregation engine and all four compilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Count,
    Average,
    Sum,
    Max,
    Min,
    Group,
    SchemaInfo,
}

impl QueryKind {
    /// Tag used on the JSON boundary and in the result envelope. Mirrors
    /// the upstream generator's short names.
    pub fn as_tag(&self) -> &'static str {
        match self {
            QueryKind::Select => "select",
            QueryKind::Count => "count",
            QueryKind::Average => "avg",
            QueryKind::Sum => "sum",
            QueryKind::Max => "max",
            QueryKind::Min => "min",
            QueryKind::Group => "group",
            QueryKind::SchemaInfo => "schema",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "select" => Some(QueryKind::Select),
            "count" => Some(QueryKind::Count),
            "avg" | "average" => Some(QueryKind::Average),
            "sum" => Some(QueryKind::Sum),
            "max" => Some(QueryKind::Max),
            "min" => Some(QueryKind::Min),
            "group" => Some(QueryKind::Group),
            "schema" | "schema_info" | "schema-info" => Some(QueryKind::SchemaInfo),
            _ => None,
        }
    }
}

/// Comparison operator carried by a predicate leaf. A leaf holds exactly
/// one operator; multi-operator comparison objects on the JSON boundary
/// are split into an `And` of single-operator leaves at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive substring containment on the string form of the field.
    Contains,
    /// Membership in a list literal.
    In,
}

impl CompareOp {
    pub fn as_symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Contains => "~",
            CompareOp::In => "in",
        }
    }
}

/// Recursive filter expression. `All` matches every record and is the
/// default when a request carries no filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,
    Leaf {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn leaf(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Leaf {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, CompareOp::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, CompareOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, CompareOp::Lte, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field, CompareOp::Ne, value)
    }

    pub fn contains(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::leaf(field, CompareOp::Contains, Value::String(pattern.into()))
    }

    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::leaf(field, CompareOp::In, Value::List(values))
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Or(children)
    }

    /// True when the predicate places no constraint on any record.
    pub fn matches_all(&self) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Leaf { .. } => false,
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().all(|c| c.matches_all())
            }
        }
    }

    /// The conjunctive leaves reachable without crossing an `Or` node.
    /// Compilers for targets that only express AND chains consume this.
    pub fn conjunctive_leaves(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_conjunctive(&mut out);
        out
    }

    fn collect_conjunctive<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Predicate::All => {}
            Predicate::Leaf { .. } => out.push(self),
            Predicate::And(children) => {
                for child in children {
                    child.collect_conjunctive(out);
                }
            }
            Predicate::Or(_) => {}
        }
    }

    /// Every leaf in the tree, in traversal order, regardless of the
    /// combinators above it. The graph compiler flattens to this.
    pub fn all_leaves(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_all(&mut out);
        out
    }

    fn collect_all<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Predicate::All => {}
            Predicate::Leaf { .. } => out.push(self),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_all(out);
                }
            }
        }
    }

    /// True when an `Or` combinator appears anywhere in the tree.
    pub fn contains_or(&self) -> bool {
        match self {
            Predicate::All | Predicate::Leaf { .. } => false,
            Predicate::Or(children) => !children.is_empty(),
            Predicate::And(children) => children.iter().any(|c| c.contains_or()),
        }
    }
}

/// Aggregation operation applied per group for `Group` queries. For the
/// dedicated kinds (`Average`, `Sum`, …) the kind itself names the
/// operation and this enum mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    Count,
    Avg,
    Sum,
    Max,
    Min,
}

impl AggOp {
    pub fn as_tag(&self) -> &'static str {
        match self {
            AggOp::Count => "count",
            AggOp::Avg => "avg",
            AggOp::Sum => "sum",
            AggOp::Max => "max",
            AggOp::Min => "min",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "count" => Some(AggOp::Count),
            "avg" | "average" | "mean" => Some(AggOp::Avg),
            "sum" => Some(AggOp::Sum),
            "max" => Some(AggOp::Max),
            "min" => Some(AggOp::Min),
            _ => None,
        }
    }
}

/// The `(field, operation)` pair attached to aggregating kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub field: String,
    pub op: AggOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// The canonical description of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryIr {
    pub kind: QueryKind,
    pub collection: String,
    pub filter: Predicate,
    pub aggregation: Option<Aggregation>,
    pub group_by: Option<String>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
}

impl QueryIr {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            collection: DEFAULT_COLLECTION.to_string(),
            filter: Predicate::All,
            aggregation: None,
            group_by: None,
            sort: None,
            limit: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_aggregation(mut self, field: impl Into<String>, op: AggOp) -> Self {
        self.aggregation = Some(Aggregation {
            field: field.into(),
            op,
        });
        self
    }

    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Row cap for `Select` results: the explicit limit, or the
    /// implementation default.
    pub fn effective_select_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SELECT_LIMIT)
    }
}
