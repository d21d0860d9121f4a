use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};
use crate::normalizer::normalize;
use crate::schema::{PartialExtraction, Properties, RawEntity};

/// A merged entity: one per normalized name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Name as first seen; later variants never replace it.
    pub name: String,
    pub normalized_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub attributes: Properties,
    /// Contributing chunk indices.
    pub source_chunks: Vec<usize>,
}

impl Entity {
    fn create(name: String, normalized_name: String, raw: &RawEntity, chunk: usize) -> Self {
        Self {
            name,
            normalized_name,
            description: raw.description.clone().unwrap_or_default(),
            properties: raw.properties.clone().unwrap_or_default(),
            attributes: raw.attributes.clone(),
            source_chunks: vec![chunk],
        }
    }

    /// Folds a later record into this one. Descriptions accumulate unless
    /// already contained; every other field present on `raw` replaces ours.
    fn absorb(&mut self, raw: &RawEntity, chunk: usize) {
        if let Some(description) = &raw.description {
            let incoming = description.trim();
            if !incoming.is_empty() && !self.description.contains(incoming) {
                self.description = format!("{}\n{}", self.description, incoming)
                    .trim()
                    .to_string();
            }
        }

        if let Some(properties) = &raw.properties {
            self.properties = properties.clone();
        }
        for (key, value) in &raw.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }

        self.source_chunks.push(chunk);
    }
}

/// Entities keyed by normalized name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct EntityMap {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one entity record from chunk `chunk`.
    pub fn merge(&mut self, chunk: usize, position: usize, raw: &RawEntity) -> Result<()> {
        let name = raw
            .name
            .as_ref()
            .ok_or(MergeError::MissingEntityName { chunk, position })?;
        let key = normalize(name);

        match self.index.get(&key) {
            Some(&idx) => self.entities[idx].absorb(raw, chunk),
            None => {
                self.index.insert(key.clone(), self.entities.len());
                self.entities
                    .push(Entity::create(name.clone(), key, raw, chunk));
            }
        }

        Ok(())
    }

    pub fn merge_partial(&mut self, chunk: usize, partial: &PartialExtraction) -> Result<()> {
        for (position, raw) in partial.entities.iter().enumerate() {
            self.merge(chunk, position, raw)?;
        }
        Ok(())
    }

    pub fn contains_key(&self, normalized_name: &str) -> bool {
        self.index.contains_key(normalized_name)
    }

    pub fn get(&self, normalized_name: &str) -> Option<&Entity> {
        self.index.get(normalized_name).map(|&idx| &self.entities[idx])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

/// Entity pass over all partials, in chunk order.
pub fn merge_entities(partials: &[PartialExtraction]) -> Result<EntityMap> {
    let mut map = EntityMap::new();
    for (chunk, partial) in partials.iter().enumerate() {
        map.merge_partial(chunk, partial)?;
    }
    Ok(map)
}
