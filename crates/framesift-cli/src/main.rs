//! Framesift CLI - multi-signal keyframe search over a fixture index.
//!
//! # Usage
//!
//! ```bash
//! # Free-text search
//! fsift "a vehicle on the road"
//!
//! # Structured clauses
//! fsift --object person:2 --ocr "EXIT" --metadata "traffic report"
//!
//! # JSON output, custom index location
//! fsift "harbor at dawn" --json --index-dir ./fixtures
//!
//! # Enable the vector signal and bi-encoder reranking via an embedding
//! # service
//! fsift "harbor at dawn" --encoder-url http://localhost:8000 --rerank 50
//! ```

mod config;
mod output;
mod search;
mod store;

use anyhow::{anyhow, Result};
use clap::Parser;
use framesift_core::search::{ObjectConstraint, StructuredQuery};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Framesift keyframe search CLI.
///
/// Combines vector similarity, metadata, and OCR/object signals over an
/// indexed video corpus and returns one fused, explainable ranking.
#[derive(Parser)]
#[command(name = "fsift", version, about)]
struct Cli {
    /// Free-text search query
    query: Option<String>,

    /// Require a detected object, as LABEL:MIN_COUNT (repeatable)
    #[arg(long = "object", value_name = "LABEL:COUNT")]
    objects: Vec<String>,

    /// Text to match against keyframe OCR content
    #[arg(long)]
    ocr: Option<String>,

    /// Text to match against video metadata (title, description, keywords)
    #[arg(long)]
    metadata: Option<String>,

    /// Maximum number of results to return
    #[arg(short = 'n', long, default_value = "20")]
    limit: usize,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Index directory (default: platform data dir, or $FRAMESIFT_INDEX_DIR)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Base URL of the embedding service powering the vector signal
    #[arg(long)]
    encoder_url: Option<String>,

    /// Rerank the fused top-N candidates with the bi-encoder
    #[arg(long, value_name = "N")]
    rerank: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let query = build_query(&cli)?;
    if query.is_empty() {
        eprintln!("No query clauses provided. Use --help for usage information.");
        std::process::exit(1);
    }

    let options = search::SearchOptions {
        index_dir: cli.index_dir.clone(),
        encoder_url: cli.encoder_url.clone(),
        rerank_top_n: cli.rerank,
        limit: cli.limit,
    };
    let results = search::execute_search(&query, &options).await?;

    let rendered = if cli.json {
        output::format_json(&results)?
    } else {
        output::format_human(&query, &results)
    };
    println!("{rendered}");

    Ok(())
}

/// Assembles a structured query from the CLI flags.
fn build_query(cli: &Cli) -> Result<StructuredQuery> {
    let objects = cli
        .objects
        .iter()
        .map(|raw| parse_object(raw))
        .collect::<Result<Vec<_>>>()?;

    Ok(StructuredQuery {
        query: cli.query.clone(),
        objects,
        ocr_text: cli.ocr.clone(),
        metadata: cli.metadata.clone(),
    })
}

/// Parses "label:count" into an object constraint; a bare "label" means
/// at least one detection.
fn parse_object(raw: &str) -> Result<ObjectConstraint> {
    match raw.split_once(':') {
        Some((label, count)) => {
            let label = label.trim();
            if label.is_empty() {
                return Err(anyhow!("empty object label in '{raw}'"));
            }
            let min_count: u32 = count
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid object count in '{raw}'"))?;
            Ok(ObjectConstraint::new(label, min_count))
        }
        None => {
            let label = raw.trim();
            if label.is_empty() {
                return Err(anyhow!("empty object label"));
            }
            Ok(ObjectConstraint::new(label, 1))
        }
    }
}
