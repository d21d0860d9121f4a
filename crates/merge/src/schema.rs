use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form attribute map carried by entities and relationships.
pub type Properties = Map<String, Value>;

/// One chunk's structured extraction, before merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialExtraction {
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default, alias = "relations")]
    pub relationships: Vec<RawRelationship>,
    /// Set by the producer when the chunk's output could not be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PartialExtraction {
    pub fn new(entities: Vec<RawEntity>, relationships: Vec<RawRelationship>) -> Self {
        Self {
            entities,
            relationships,
            error: None,
        }
    }

    /// An empty partial marked with the reason extraction failed.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// An entity as emitted by the extractor.
///
/// Any top-level field other than `name`, `description` and `properties`
/// (e.g. `type`, `superclasses`) lands in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(flatten)]
    pub attributes: Properties,
}

impl RawEntity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A relationship as emitted by the extractor. Records missing any of
/// `source`, `type` or `target` are skipped by the merger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl RawRelationship {
    pub fn new(
        source: impl Into<String>,
        rel_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: Some(source.into()),
            rel_type: Some(rel_type.into()),
            target: Some(target.into()),
            properties: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_extra_fields_become_attributes() {
        let raw: RawEntity = serde_json::from_str(
            r#"{"name": "Patient", "description": "A person", "type": "class", "superclasses": ["Person"]}"#,
        )
        .unwrap();

        assert_eq!(raw.name.as_deref(), Some("Patient"));
        assert_eq!(raw.attributes["type"], "class");
        assert_eq!(raw.attributes["superclasses"][0], "Person");
        assert!(!raw.attributes.contains_key("name"));
    }

    #[test]
    fn test_missing_fields_deserialize() {
        let partial: PartialExtraction = serde_json::from_str(
            r#"{"entities": [{"description": "nameless"}], "relationships": [{"source": "a"}]}"#,
        )
        .unwrap();

        assert!(partial.entities[0].name.is_none());
        assert!(partial.relationships[0].rel_type.is_none());
        assert!(!partial.is_error());
    }

    #[test]
    fn test_failed_partial_is_empty() {
        let partial = PartialExtraction::failed("Invalid JSON returned: ...");
        assert!(partial.is_error());
        assert!(partial.entities.is_empty());
        assert!(partial.relationships.is_empty());
    }
}
