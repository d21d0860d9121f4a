pub mod cleanup;
pub mod llm;
pub mod prompt;

pub use cleanup::clean_llm_output;
pub use llm::{LlmClient, ResponseFormat};

use anyhow::Result;
use merge::PartialExtraction;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Length of the raw-output excerpt kept in an error marker.
const ERROR_PREVIEW_CHARS: usize = 200;

/// A partial extraction tagged with the chunk it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedChunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub index: usize,
    pub extraction: PartialExtraction,
}

#[derive(Clone)]
pub struct Extractor {
    llm_client: LlmClient,
    max_repairs: usize,
}

impl Extractor {
    pub fn new(llm_client: LlmClient) -> Self {
        Self {
            llm_client,
            max_repairs: 2,
        }
    }

    pub fn with_max_repairs(mut self, max_repairs: usize) -> Self {
        self.max_repairs = max_repairs;
        self
    }

    /// Extract a partial ontology from a chunk of text.
    ///
    /// Transport failures are errors so callers can retry them. Output that
    /// never becomes valid JSON yields an empty, error-marked partial.
    pub async fn try_extract(&self, text: &str) -> Result<PartialExtraction> {
        let prompt = prompt::build_extraction_prompt(text);

        let raw = self
            .llm_client
            .generate_json_with_repair(prompt::EXTRACTION_SYSTEM, &prompt, self.max_repairs)
            .await?;

        Ok(parse_partial(&raw))
    }
}

/// Turn a raw model reply into a well-formed partial. Never fails: anything
/// unparseable becomes an empty partial carrying an error marker. Records
/// that don't fit the schema are dropped one by one; the rest are kept.
pub fn parse_partial(raw: &str) -> PartialExtraction {
    let cleaned = clean_llm_output(raw);

    let parsed = serde_json::from_str::<Value>(&cleaned).or_else(|e| {
        cleanup::extract_json_object(&cleaned)
            .ok_or(e)
            .and_then(serde_json::from_str::<Value>)
    });

    match parsed {
        Ok(Value::Object(object)) => drop_unnamed_entities(partial_from_object(object)),
        Ok(other) => {
            debug!(kind = json_kind(&other), "Extraction output is not an object");
            invalid_output(&cleaned)
        }
        Err(e) => {
            debug!(error = %e, "Unparseable extraction output");
            invalid_output(&cleaned)
        }
    }
}

fn invalid_output(cleaned: &str) -> PartialExtraction {
    PartialExtraction::failed(format!(
        "Invalid JSON returned: {}...",
        cleanup::preview(cleaned, ERROR_PREVIEW_CHARS)
    ))
}

fn partial_from_object(mut object: Map<String, Value>) -> PartialExtraction {
    let relationships = object
        .remove("relationships")
        .or_else(|| object.remove("relations"));

    PartialExtraction {
        entities: records("entities", object.remove("entities")),
        relationships: records("relationships", relationships),
        error: object
            .remove("error")
            .and_then(|e| e.as_str().map(str::to_string)),
    }
}

/// Deserialize each element of a JSON array on its own, skipping bad ones.
fn records<T: DeserializeOwned>(field: &str, value: Option<Value>) -> Vec<T> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(field, kind = json_kind(&other), "Expected an array, ignoring field");
            return Vec::new();
        }
    };

    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(field, error = %e, "Malformed record");
                None
            }
        })
        .collect();

    if kept.len() < total {
        warn!(field, dropped = total - kept.len(), "Dropped malformed records");
    }
    kept
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The merge requires a name on every entity; drop the ones without.
fn drop_unnamed_entities(mut partial: PartialExtraction) -> PartialExtraction {
    let before = partial.entities.len();
    partial
        .entities
        .retain(|e| e.name.as_deref().is_some_and(|n| !n.trim().is_empty()));

    let dropped = before - partial.entities.len();
    if dropped > 0 {
        warn!(dropped, "Dropped entities without a name");
    }
    partial
}
