use std::collections::{HashMap, HashSet};
use std::fmt;

use ontology::rdf::{
    Node, OWL_CLASS, OWL_OBJECT_PROPERTY, RDF_TYPE, RDFS_CLASS, RDFS_COMMENT, RDFS_DOMAIN,
    RDFS_LABEL, RDFS_RANGE, RDFS_SUBCLASS_OF, Triple,
};
use petgraph::graph::{DiGraph, NodeIndex};

/// `rdf:type` objects that mark schema terms rather than individuals.
const SCHEMA_TYPES: &[&str] = &[
    OWL_CLASS,
    OWL_OBJECT_PROPERTY,
    RDFS_CLASS,
    "http://www.w3.org/2002/07/owl#DatatypeProperty",
    "http://www.w3.org/2002/07/owl#AnnotationProperty",
    "http://www.w3.org/2002/07/owl#Ontology",
    "http://www.w3.org/2002/07/owl#Restriction",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Class,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    SubClassOf,
    /// Object property drawn from its domain to its range.
    PropertyRange,
    InstanceOf,
    /// Object property asserted between two individuals.
    Assertion,
}

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub tooltip: Option<String>,
    pub kind: NodeKind,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub label: String,
    pub kind: EdgeKind,
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Classes, individuals and the edges between them, ready for rendering.
#[derive(Debug, Clone, Default)]
pub struct OntologyGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    node_to_idx: HashMap<String, NodeIndex>,
    edge_keys: HashSet<(String, String, String)>,
    labels: HashMap<String, String>,
    comments: HashMap<String, String>,
}

impl OntologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_to_idx.get(id).map(|&idx| &self.graph[idx])
    }

    /// `(from label, edge label, to label)` for every edge.
    pub fn edge_labels(&self) -> Vec<(String, String, String)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((
                    self.graph[from].label.clone(),
                    self.graph[e].label.clone(),
                    self.graph[to].label.clone(),
                ))
            })
            .collect()
    }

    /// Build the graph from parsed triples, in document order.
    pub fn from_triples(triples: &[Triple]) -> Self {
        let mut graph = Self::new();

        for t in triples {
            let key = t.subject.id();
            if let Node::Literal(value) = &t.object {
                if t.predicate == RDFS_LABEL {
                    graph.labels.entry(key.clone()).or_insert_with(|| value.clone());
                } else if t.predicate == RDFS_COMMENT {
                    graph.comments.entry(key).or_insert_with(|| value.clone());
                }
            }
        }

        let is_type = |t: &&Triple, class: &str| t.predicate == RDF_TYPE && t.object.is_iri(class);

        let classes: Vec<&Node> = unique(triples.iter().filter(|t| is_type(t, OWL_CLASS)).map(|t| &t.subject));
        let class_ids: HashSet<String> = classes.iter().map(|n| n.id()).collect();
        for class in &classes {
            graph.add_or_update_node(class, NodeKind::Class);
        }

        for t in triples.iter().filter(|t| t.predicate == RDFS_SUBCLASS_OF) {
            if !class_ids.contains(&t.subject.id()) {
                continue;
            }
            let sub = graph.add_or_update_node(&t.subject, NodeKind::Class);
            let sup = graph.add_or_update_node(&t.object, NodeKind::Class);
            graph.add_edge(sub, sup, "subClassOf", EdgeKind::SubClassOf);
        }

        let properties: Vec<&Node> =
            unique(triples.iter().filter(|t| is_type(t, OWL_OBJECT_PROPERTY)).map(|t| &t.subject));
        let property_ids: HashSet<String> = properties.iter().map(|n| n.id()).collect();
        for prop in &properties {
            let label = graph.label_of(prop);
            let domains = objects_of(triples, prop, RDFS_DOMAIN);
            let ranges = objects_of(triples, prop, RDFS_RANGE);
            for domain in &domains {
                let from = graph.add_or_update_node(domain, NodeKind::Class);
                for range in &ranges {
                    let to = graph.add_or_update_node(range, NodeKind::Class);
                    graph.add_edge(from, to, &label, EdgeKind::PropertyRange);
                }
            }
        }

        let individuals: Vec<&Node> = unique(
            triples
                .iter()
                .filter(|t| t.predicate == RDF_TYPE && !SCHEMA_TYPES.iter().any(|s| t.object.is_iri(s)))
                .map(|t| &t.subject),
        );
        for ind in &individuals {
            graph.add_or_update_node(ind, NodeKind::Individual);
        }

        for ind in &individuals {
            let from = graph.add_or_update_node(ind, NodeKind::Individual);
            for class in objects_of(triples, ind, RDF_TYPE) {
                if class_ids.contains(&class.id()) {
                    let to = graph.node_to_idx[&class.id()];
                    graph.add_edge(from, to, "rdf:type", EdgeKind::InstanceOf);
                }
            }

            for t in triples.iter().filter(|t| &t.subject == *ind) {
                let prop = Node::iri(t.predicate.clone());
                if !property_ids.contains(&prop.id()) || t.object.is_literal() {
                    continue;
                }
                let label = graph.label_of(&prop);
                let to = graph.add_or_update_node(&t.object, NodeKind::Individual);
                graph.add_edge(from, to, &label, EdgeKind::Assertion);
            }
        }

        graph
    }

    /// Later calls win on kind, so a term first seen as a class and then
    /// as an individual is drawn as an individual.
    fn add_or_update_node(&mut self, node: &Node, kind: NodeKind) -> NodeIndex {
        let id = node.id();
        if let Some(&idx) = self.node_to_idx.get(&id) {
            self.graph[idx].kind = kind;
            return idx;
        }

        let graph_node = GraphNode {
            label: self.label_of(node),
            tooltip: self.comments.get(&id).cloned(),
            id: id.clone(),
            kind,
        };
        let idx = self.graph.add_node(graph_node);
        self.node_to_idx.insert(id, idx);
        idx
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, label: &str, kind: EdgeKind) {
        let key = (
            self.graph[from].id.clone(),
            self.graph[to].id.clone(),
            label.to_string(),
        );
        if self.edge_keys.insert(key) {
            self.graph.add_edge(
                from,
                to,
                GraphEdge {
                    label: label.to_string(),
                    kind,
                },
            );
        }
    }

    /// First `rdfs:label`, else the IRI's local name.
    fn label_of(&self, node: &Node) -> String {
        self.labels
            .get(&node.id())
            .cloned()
            .unwrap_or_else(|| node.local_name())
    }
}

fn objects_of<'a>(triples: &'a [Triple], subject: &Node, predicate: &str) -> Vec<&'a Node> {
    unique(
        triples
            .iter()
            .filter(|t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object),
    )
}

/// Deduplicate while keeping first-seen order.
fn unique<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<&'a Node> {
    let mut seen = HashSet::new();
    nodes.filter(|n| seen.insert(*n)).collect()
}
