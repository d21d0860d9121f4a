use petgraph::dot::{Config, Dot};
use petgraph::visit::EdgeRef;

use crate::graph::{EdgeKind, GraphEdge, GraphNode, NodeKind, OntologyGraph};

/// Render as a strict left-to-right Graphviz digraph.
pub fn render_dot(graph: &OntologyGraph) -> String {
    let body = format!(
        "{}",
        Dot::with_attr_getters(
            graph.graph(),
            &[Config::NodeNoLabel, Config::EdgeNoLabel, Config::GraphContentOnly],
            &|_, edge| edge_attributes(edge.weight()),
            &|_, (_, node)| node_attributes(node),
        )
    );

    format!("strict digraph {{\n    rankdir=LR;\n    fontsize=10;\n{}}}\n", body)
}

fn node_attributes(node: &GraphNode) -> String {
    let (shape, fill) = match node.kind {
        NodeKind::Class => ("box", "lightblue"),
        NodeKind::Individual => ("ellipse", "lightyellow"),
    };

    let mut attrs = format!(
        "shape={} style=filled fillcolor={} color=black label={} ",
        shape,
        fill,
        quote(&node.label)
    );
    if let Some(tooltip) = &node.tooltip {
        attrs.push_str(&format!("tooltip={} ", quote(tooltip)));
    }
    attrs
}

fn edge_attributes(edge: &GraphEdge) -> String {
    let style = match edge.kind {
        EdgeKind::SubClassOf => "style=dotted color=blue",
        EdgeKind::PropertyRange => "fontsize=8 color=gray",
        EdgeKind::InstanceOf | EdgeKind::Assertion => "color=green",
    };
    format!("label={} {} ", quote(&edge.label), style)
}

fn quote(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontology::parse_turtle;

    fn render(ttl: &str) -> String {
        render_dot(&OntologyGraph::from_triples(&parse_turtle(ttl).unwrap()))
    }

    #[test]
    fn test_strict_digraph_wrapper() {
        let dot = render(
            r#"@prefix : <http://example.org/zoo#> .
               @prefix owl: <http://www.w3.org/2002/07/owl#> .
               @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
               :Dog a owl:Class ; rdfs:subClassOf :Animal ."#,
        );

        assert!(dot.starts_with("strict digraph {\n    rankdir=LR;"));
        assert!(dot.trim_end().ends_with('}'));
        assert!(dot.contains("shape=box"));
        assert!(dot.contains("label=\"subClassOf\" style=dotted color=blue"));
        assert!(dot.contains("->"));
    }

    #[test]
    fn test_individual_shape_and_tooltip_escaping() {
        let dot = render(
            r#"@prefix : <http://example.org/zoo#> .
               @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
               :rex a :Dog ; rdfs:comment "Says \"woof\"\nloudly" ."#,
        );

        assert!(dot.contains("shape=ellipse style=filled fillcolor=lightyellow"));
        assert!(dot.contains(r#"tooltip="Says \"woof\"\nloudly""#));
    }

    #[test]
    fn test_empty_graph() {
        let dot = render_dot(&OntologyGraph::new());
        assert_eq!(dot, "strict digraph {\n    rankdir=LR;\n    fontsize=10;\n}\n");
    }
}
