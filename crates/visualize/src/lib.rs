pub mod dot;
pub mod graph;

pub use dot::render_dot;
pub use graph::{EdgeKind, GraphEdge, GraphNode, NodeKind, OntologyGraph};

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub triples: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// Turtle text in, DOT text out.
pub fn visualize_turtle(ttl: &str) -> Result<(String, GraphSummary)> {
    let triples = ontology::parse_turtle(ttl)?;
    let graph = OntologyGraph::from_triples(&triples);

    let summary = GraphSummary {
        triples: triples.len(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    };
    Ok((render_dot(&graph), summary))
}

/// Read a Turtle file and write its graph as DOT.
pub async fn visualize_file(turtle_file: &Path, output_dot: &Path) -> Result<GraphSummary> {
    let ttl = tokio::fs::read_to_string(turtle_file)
        .await
        .context(format!("Failed to read file: {:?}", turtle_file))?;

    let (dot, summary) =
        visualize_turtle(&ttl).context(format!("Failed to visualize {:?}", turtle_file))?;

    ontology::store::write_text(output_dot, &dot).await?;

    info!(
        dot = ?output_dot,
        nodes = summary.nodes,
        edges = summary.edges,
        "Wrote deduplicated DOT graph"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_visualize_file_writes_dot() {
        let dir = tempfile::tempdir().unwrap();
        let ttl_path = dir.path().join("zoo.ttl");
        let dot_path = dir.path().join("graphs").join("zoo.dot");
        std::fs::write(
            &ttl_path,
            "@prefix : <http://example.org/zoo#> .\n\
             @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
             :Dog a owl:Class ; rdfs:subClassOf :Animal .\n",
        )
        .unwrap();

        let summary = visualize_file(&ttl_path, &dot_path).await.unwrap();

        assert_eq!(summary.triples, 2);
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edges, 1);
        let dot = std::fs::read_to_string(&dot_path).unwrap();
        assert!(dot.starts_with("strict digraph"));
    }

    #[test]
    fn test_merged_ontology_turtle_renders() {
        use merge::{PartialExtraction, RawEntity, RawRelationship, aggregate};
        use ontology::TurtleWriter;

        let merged = aggregate(&[PartialExtraction::new(
            vec![
                RawEntity::named("Drug"),
                RawEntity::named("Disease"),
                RawEntity::named("Aspirin")
                    .with_attribute("type", "individual")
                    .with_attribute("class", "Drug"),
            ],
            vec![RawRelationship::new("Drug", "treats", "Disease")],
        )])
        .unwrap();
        let ttl = TurtleWriter::default().write(&merged);

        let (dot, summary) = visualize_turtle(&ttl).unwrap();

        assert!(summary.nodes >= 3);
        assert!(dot.contains("label=\"treats\""));
    }
}
