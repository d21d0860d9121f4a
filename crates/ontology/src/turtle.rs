//! Deterministic OWL/Turtle rendering of a merged ontology.

use std::collections::{BTreeMap, HashMap, HashSet};

use merge::{Entity, MergedOntology, normalize};
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_BASE_IRI: &str = "http://example.org/ontology#";

const STANDARD_PREFIXES: &str = "\
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
";

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntityKind {
    Class,
    Individual { classes: Vec<String> },
}

impl EntityKind {
    fn of(entity: &Entity) -> Self {
        let declared = entity
            .attributes
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_lowercase)
            .unwrap_or_default();

        if declared.contains("individual") || declared.contains("instance") {
            EntityKind::Individual {
                classes: string_list(entity.attributes.get("class")),
            }
        } else {
            EntityKind::Class
        }
    }
}

/// Renders [`MergedOntology`] as Turtle under a base namespace.
#[derive(Debug, Clone)]
pub struct TurtleWriter {
    base_iri: String,
}

impl Default for TurtleWriter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_IRI)
    }
}

impl TurtleWriter {
    pub fn new(base_iri: impl Into<String>) -> Self {
        Self {
            base_iri: base_iri.into(),
        }
    }

    pub fn base_iri(&self) -> &str {
        &self.base_iri
    }

    pub fn write(&self, ontology: &MergedOntology) -> String {
        let mut out = format!("@prefix : <{}> .\n{}\n", self.base_iri, STANDARD_PREFIXES);
        out.push_str(&format!(
            "<{}> a owl:Ontology .\n\n",
            self.base_iri.trim_end_matches(['#', '/'])
        ));

        let entities: Vec<&Entity> = ontology
            .entities()
            .iter()
            .filter(|e| {
                if e.normalized_name.is_empty() {
                    warn!(name = %e.name, "Skipping entity with an empty identifier");
                }
                !e.normalized_name.is_empty()
            })
            .collect();
        let kinds: HashMap<&str, EntityKind> = entities
            .iter()
            .map(|e| (e.normalized_name.as_str(), EntityKind::of(e)))
            .collect();

        // Data properties used on individuals are owl:DatatypeProperty,
        // everything else is an annotation.
        let mut value_properties: BTreeMap<String, bool> = BTreeMap::new();
        let mut referenced_classes: BTreeMap<String, String> = BTreeMap::new();

        for entity in &entities {
            let kind = &kinds[entity.normalized_name.as_str()];
            let mut statements = Vec::new();

            match kind {
                EntityKind::Class => {
                    statements.push("a owl:Class".to_string());
                }
                EntityKind::Individual { classes } => {
                    let mut types = vec!["owl:NamedIndividual".to_string()];
                    for class in classes {
                        let local = normalize(class);
                        types.push(self.term(&local));
                        referenced_classes.entry(local).or_insert_with(|| class.clone());
                    }
                    statements.push(format!("a {}", types.join(", ")));
                }
            }

            statements.push(format!("rdfs:label {}", literal(&entity.name)));
            if !entity.description.is_empty() {
                statements.push(format!("rdfs:comment {}", literal(&entity.description)));
            }

            if *kind == EntityKind::Class {
                for parent in string_list(entity.attributes.get("superclasses")) {
                    let local = normalize(&parent);
                    if local.is_empty() || local == entity.normalized_name {
                        continue;
                    }
                    statements.push(format!("rdfs:subClassOf {}", self.term(&local)));
                    referenced_classes.entry(local).or_insert(parent);
                }
            }

            let on_individual = matches!(kind, EntityKind::Individual { .. });
            for (key, value) in &entity.properties {
                let local = normalize(key);
                if local.is_empty() {
                    continue;
                }
                for object in value_literals(value) {
                    statements.push(format!("{} {}", self.term(&local), object));
                }
                *value_properties.entry(local).or_insert(false) |= on_individual;
            }

            out.push_str(&format!("# source chunks: {}\n", join_indices(&entity.source_chunks)));
            out.push_str(&format!(
                "{} {} .\n\n",
                self.term(&entity.normalized_name),
                statements.join(" ;\n    ")
            ));
        }

        for (local, label) in &referenced_classes {
            if kinds.contains_key(local.as_str()) {
                continue;
            }
            out.push_str(&format!(
                "{} a owl:Class ;\n    rdfs:label {} .\n\n",
                self.term(local),
                literal(label)
            ));
        }

        self.write_object_properties(&mut out, ontology, &kinds);

        for (local, on_individual) in &value_properties {
            let declaration = if *on_individual {
                "owl:DatatypeProperty"
            } else {
                "owl:AnnotationProperty"
            };
            out.push_str(&format!("{} a {} .\n", self.term(local), declaration));
        }
        if !value_properties.is_empty() {
            out.push('\n');
        }

        self.write_assertions(&mut out, ontology, &kinds);

        out
    }

    /// One owl:ObjectProperty per relationship type; domain and range come
    /// from the first relationship carrying that type.
    fn write_object_properties(
        &self,
        out: &mut String,
        ontology: &MergedOntology,
        kinds: &HashMap<&str, EntityKind>,
    ) {
        let mut declared = HashSet::new();

        for rel in ontology.relationships() {
            let local = normalize(&rel.rel_type);
            if local.is_empty() || !declared.insert(local.clone()) {
                continue;
            }

            let mut statements = vec![
                "a owl:ObjectProperty".to_string(),
                format!("rdfs:label {}", literal(&rel.rel_type)),
            ];
            if let Some(domain) = self.class_of(&rel.source, kinds) {
                statements.push(format!("rdfs:domain {}", domain));
            }
            if let Some(range) = self.class_of(&rel.target, kinds) {
                statements.push(format!("rdfs:range {}", range));
            }

            out.push_str(&format!("{} {} .\n\n", self.term(&local), statements.join(" ;\n    ")));
        }
    }

    /// Relationships between two individuals become property assertions.
    fn write_assertions(
        &self,
        out: &mut String,
        ontology: &MergedOntology,
        kinds: &HashMap<&str, EntityKind>,
    ) {
        let is_individual =
            |name: &str| matches!(kinds.get(name), Some(EntityKind::Individual { .. }));

        let mut seen = HashSet::new();
        for rel in ontology.relationships() {
            if !is_individual(&rel.source) || !is_individual(&rel.target) {
                continue;
            }
            let triple = (
                self.term(&rel.source),
                self.term(&normalize(&rel.rel_type)),
                self.term(&rel.target),
            );
            if seen.insert(triple.clone()) {
                out.push_str(&format!("{} {} {} .\n", triple.0, triple.1, triple.2));
            }
        }
    }

    fn class_of(&self, name: &str, kinds: &HashMap<&str, EntityKind>) -> Option<String> {
        match kinds.get(name)? {
            EntityKind::Class => Some(self.term(name)),
            EntityKind::Individual { classes } => classes
                .first()
                .map(|c| normalize(c))
                .filter(|c| !c.is_empty())
                .map(|c| self.term(&c)),
        }
    }

    /// `:local` when the name is a safe prefixed name, else a full IRI.
    fn term(&self, local: &str) -> String {
        let simple = !local.is_empty()
            && !local.starts_with('-')
            && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if simple {
            format!(":{}", local)
        } else {
            format!("<{}{}>", self.base_iri, percent_encode(local))
        }
    }
}

fn percent_encode(local: &str) -> String {
    let mut encoded = String::with_capacity(local.len());
    for c in local.chars() {
        if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '~') {
            encoded.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}

fn literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('"');
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped.push('"');
    escaped
}

/// Turtle objects for a JSON property value. Arrays fan out into one
/// object each; nested objects are kept as their JSON text.
fn value_literals(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![b.to_string()],
        Value::Number(n) if n.is_f64() => vec![format!("\"{}\"^^xsd:double", n)],
        Value::Number(n) => vec![n.to_string()],
        Value::String(s) => vec![literal(s)],
        Value::Array(items) => items.iter().flat_map(value_literals).collect(),
        Value::Object(_) => vec![literal(&value.to_string())],
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let items = match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
