//! Build an ontology from a document, or render an existing Turtle file.
//!
//! ```text
//! run_pipeline <document> [--ttl out.ttl] [--dot out.dot]
//! run_pipeline --visualize <ontology.ttl> [--dot out.dot]
//! ```

use anyhow::Result;
use api::{AppConfig, Metrics, OperationMode, Pipeline, PipelineReport, RunOptions};
use clap::Parser;
use ontology::TurtleMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "run_pipeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Document (.txt, .md, .pdf) or directory of documents
    #[arg(required_unless_present = "visualize", conflicts_with = "visualize")]
    document: Option<PathBuf>,

    /// Render an existing Turtle file instead of running the pipeline
    #[arg(long, value_name = "TTL")]
    visualize: Option<PathBuf>,

    /// Where to write the Turtle ontology
    #[arg(long, value_name = "PATH", conflicts_with = "visualize")]
    ttl: Option<PathBuf>,

    /// Where to write the DOT graph
    #[arg(long, value_name = "PATH")]
    dot: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset to start from (ignored when --config is given)
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<OperationMode>,

    /// Let the model write the Turtle instead of the template writer
    #[arg(long)]
    llm_turtle: bool,
}

fn parse_mode(value: &str) -> Result<OperationMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "fast" => Ok(OperationMode::Fast),
        "balanced" => Ok(OperationMode::Balanced),
        "accurate" => Ok(OperationMode::Accurate),
        other => Err(format!("unknown mode '{}' (fast, balanced, accurate)", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    api::init_tracing();
    let cli = Cli::parse();

    let mut config = match (&cli.config, cli.mode) {
        (Some(path), _) => AppConfig::load(Some(path.as_path()))?,
        (None, Some(mode)) => {
            let _ = dotenvy::dotenv();
            let mut config = AppConfig::for_mode(mode);
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        (None, None) => AppConfig::load(None)?,
    };
    if cli.llm_turtle {
        config.output.turtle_mode = TurtleMode::Llm;
    }

    let pipeline = Pipeline::new(config, Metrics::new())?;

    if let Some(ttl) = &cli.visualize {
        let summary = pipeline.visualize_existing(ttl, cli.dot.as_deref()).await?;
        println!(
            "Rendered {:?}: {} triples, {} nodes, {} edges",
            ttl, summary.triples, summary.nodes, summary.edges
        );
        return Ok(());
    }

    let Some(document) = &cli.document else {
        anyhow::bail!("No document given");
    };

    let options = RunOptions {
        turtle_path: cli.ttl.clone(),
        dot_path: cli.dot.clone(),
    };
    let report = pipeline.run_with(document, &options).await?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("\n=== ONTOLOGY ===\n");
    println!("  Source:         {:?}", report.source);
    println!("  Chunks:         {}", report.chunks);
    if !report.failed_chunks.is_empty() {
        println!("  Failed chunks:  {:?}", report.failed_chunks);
    }
    println!("  Entities:       {}", report.entities);
    println!(
        "  Relationships:  {} ({} types)",
        report.relationships, report.relationship_types
    );
    println!(
        "  Discarded:      {} incomplete, {} dangling",
        report.skipped_relationships, report.dropped_relationships
    );
    println!(
        "  Graph:          {} nodes, {} edges",
        report.graph.nodes, report.graph.edges
    );
    println!("\n  Merged JSON:    {:?}", report.merged_path);
    println!("  Turtle ({:?}): {:?}", report.turtle_mode, report.turtle_path);
    println!("  DOT:            {:?}", report.dot_path);
}
