pub mod dataset;
pub mod dialects;
pub mod query;
pub mod types;

use thiserror::Error;

/// Core error type for boundary operations.
///
/// Only the I/O edges (dataset loading, query-document decoding in the CLI)
/// produce errors. Inside the query pipeline every malformed input is
/// recovered locally into an empty or degenerate result — evaluation and
/// compilation never fail.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed dataset: {0}")]
    Dataset(String),
    #[error("Malformed query document: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

pub use dataset::Dataset;
pub use dialects::{compile_all, CompiledQuery, CompilerRegistry, QueryCompiler, TargetDialect};
pub use query::envelope::ResultEnvelope;
pub use query::execute;
pub use query::ir::{
    AggOp, Aggregation, CompareOp, Predicate, QueryIr, QueryKind, SortDirection, SortSpec,
};
pub use types::{Record, Value};
