use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::normalizer::normalize;
use crate::schema::{PartialExtraction, Properties, RawRelationship};

/// A directed, typed edge between two merged entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Normalized source entity name.
    pub source: String,
    /// Relationship label, trimmed with its original casing.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Normalized target entity name.
    pub target: String,
    #[serde(default)]
    pub properties: Properties,
    pub source_chunks: Vec<usize>,
}

/// Grouping key. All three parts are normalized, including the type, so
/// `"Treats"` and `"treats"` land in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub source: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub target: String,
}

impl RelationshipKey {
    pub fn new(source: &str, rel_type: &str, target: &str) -> Self {
        Self {
            source: normalize(source),
            rel_type: normalize(rel_type),
            target: normalize(target),
        }
    }
}

/// All property variants recorded under one key.
#[derive(Debug, Clone)]
pub struct RelationshipGroup {
    pub key: RelationshipKey,
    pub variants: Vec<Relationship>,
    /// Every chunk that mentioned this key, whichever variant it matched.
    pub chunks: BTreeSet<usize>,
}

/// Relationship groups in first-seen key order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGroups {
    groups: Vec<RelationshipGroup>,
    index: HashMap<RelationshipKey, usize>,
    skipped: usize,
}

impl RelationshipGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one relationship from chunk `chunk`. Returns false when the
    /// record lacks a source, type or target and was skipped.
    pub fn merge(&mut self, chunk: usize, raw: &RawRelationship) -> bool {
        let (Some(source), Some(rel_type), Some(target)) =
            (&raw.source, &raw.rel_type, &raw.target)
        else {
            self.skipped += 1;
            return false;
        };

        let key = RelationshipKey::new(source, rel_type, target);
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(RelationshipGroup {
                    key: key.clone(),
                    variants: Vec::new(),
                    chunks: BTreeSet::new(),
                });
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[idx];
        group.chunks.insert(chunk);

        let properties = raw.properties.clone().unwrap_or_default();
        if group.variants.iter().any(|v| v.properties == properties) {
            return true;
        }

        group.variants.push(Relationship {
            source: key.source.clone(),
            rel_type: rel_type.trim().to_string(),
            target: key.target.clone(),
            properties,
            source_chunks: vec![chunk],
        });
        true
    }

    pub fn merge_partial(&mut self, chunk: usize, partial: &PartialExtraction) {
        for raw in &partial.relationships {
            self.merge(chunk, raw);
        }
    }

    /// Number of records dropped for missing source, type or target.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn groups(&self) -> &[RelationshipGroup] {
        &self.groups
    }

    pub fn variant_count(&self) -> usize {
        self.groups.iter().map(|g| g.variants.len()).sum()
    }

    /// Flatten to variants: key order, then append order within a key.
    pub fn variants(&self) -> impl Iterator<Item = &Relationship> {
        self.groups.iter().flat_map(|g| g.variants.iter())
    }
}

/// Relationship pass over all partials, in chunk order.
pub fn merge_relationships(partials: &[PartialExtraction]) -> RelationshipGroups {
    let mut groups = RelationshipGroups::new();
    for (chunk, partial) in partials.iter().enumerate() {
        groups.merge_partial(chunk, partial);
    }
    groups
}
