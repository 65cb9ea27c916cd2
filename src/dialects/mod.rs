//! Multi-Target Query Compilers
//!
//! Each compiler is a pure renderer from the backend-agnostic IR to one
//! store's native query syntax, shown side by side to the user:
//! - Document store (Mongo-style filter objects and aggregation pipelines)
//! - Key-value store (Redis-style command sequences over hashes and sets)
//! - Column-family store (HBase-shell scan/count statements)
//! - Graph store (Cypher-style pattern matching)
//!
//! Compilers are total: every valid IR renders to a non-empty string, and
//! operations a target cannot express natively degrade to an explanatory
//! commented recipe instead of disappearing.

pub mod columnfamily;
pub mod document;
pub mod graph;
pub mod keyvalue;

pub use columnfamily::{ColumnFamilyCompiler, FamilyMap};
pub use document::DocumentStoreCompiler;
pub use graph::GraphPatternCompiler;
pub use keyvalue::{KeySpace, KeyValueCompiler};

use crate::query::ir::QueryIr;

/// The four supported target models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetDialect {
    DocumentStore,
    KeyValue,
    ColumnFamily,
    GraphPattern,
}

impl TargetDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetDialect::DocumentStore => "document",
            TargetDialect::KeyValue => "key-value",
            TargetDialect::ColumnFamily => "column-family",
            TargetDialect::GraphPattern => "graph",
        }
    }
}

/// Renderer from IR to one target's query text. Compilation never fails;
/// whatever the IR says, the output is a non-empty, human-readable string.
pub trait QueryCompiler: Send + Sync {
    fn compile(&self, ir: &QueryIr) -> String;
    fn dialect(&self) -> TargetDialect;
}

/// One compiled rendering, labelled with its target.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub dialect: TargetDialect,
    pub text: String,
}

/// Registry of compilers, one per target, in display order.
pub struct CompilerRegistry {
    compilers: Vec<Box<dyn QueryCompiler>>,
}

impl Default for CompilerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerRegistry {
    pub fn new() -> Self {
        Self {
            compilers: vec![
                Box::new(DocumentStoreCompiler::new()),
                Box::new(KeyValueCompiler::new(KeySpace::default())),
                Box::new(ColumnFamilyCompiler::new(FamilyMap::default())),
                Box::new(GraphPatternCompiler::new()),
            ],
        }
    }

    pub fn register(&mut self, compiler: Box<dyn QueryCompiler>) {
        self.compilers.push(compiler);
    }

    /// Render the IR once per registered target.
    pub fn compile_all(&self, ir: &QueryIr) -> Vec<CompiledQuery> {
        self.compilers
            .iter()
            .map(|c| CompiledQuery {
                dialect: c.dialect(),
                text: c.compile(ir),
            })
            .collect()
    }
}

/// Compile with the default registry: all four targets.
pub fn compile_all(ir: &QueryIr) -> Vec<CompiledQuery> {
    CompilerRegistry::new().compile_all(ir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ir::{QueryIr, QueryKind};

    #[test]
    fn default_registry_covers_all_targets() {
        let ir = QueryIr::new(QueryKind::Select);
        let compiled = compile_all(&ir);
        assert_eq!(compiled.len(), 4);
        for query in &compiled {
            assert!(!query.text.trim().is_empty(), "{:?}", query.dialect);
        }
    }
}
