//! polyql — compile one query for every target store and run it in memory.
//!
//! Reads a JSON dataset and a structured query document (the same shape
//! the NL-to-query service emits), prints the four backend renderings side
//! by side, then executes the query against the loaded records and prints
//! the result envelope as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use polyql_core::dataset::{Dataset, DEFAULT_NUMERIC_FIELDS};
use polyql_core::{compile_all, execute, QueryIr};

#[derive(Parser, Debug)]
#[command(name = "polyql", about = "Run a backend-agnostic query against an in-memory dataset")]
struct Args {
    /// JSON dataset file: an array of flat objects
    #[arg(long)]
    data: PathBuf,

    /// Query document as inline JSON
    #[arg(long, conflicts_with = "query_file")]
    query: Option<String>,

    /// Query document read from a file
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// Comma-separated columns to coerce to numbers while loading
    #[arg(long)]
    numeric: Option<String>,

    /// Skip the execution path and only print the compiled queries
    #[arg(long)]
    compile_only: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let numeric_owned: Vec<String> = match &args.numeric {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        None => DEFAULT_NUMERIC_FIELDS.iter().map(|s| s.to_string()).collect(),
    };
    let numeric: Vec<&str> = numeric_owned.iter().map(String::as_str).collect();

    let dataset = Dataset::from_json_file(&args.data, &numeric)
        .with_context(|| format!("loading dataset from {}", args.data.display()))?;

    let query_text = match (&args.query, &args.query_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading query from {}", path.display()))?,
        (None, None) => anyhow::bail!("pass a query with --query or --query-file"),
    };
    let ir = QueryIr::from_json_str(&query_text).context("decoding query document")?;

    for compiled in compile_all(&ir) {
        println!("-- {} --", compiled.dialect.as_str());
        println!("{}\n", compiled.text);
    }

    if !args.compile_only {
        let envelope = execute(dataset.records(), &ir);
        println!("-- result ({} records) --", dataset.len());
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }

    Ok(())
}
