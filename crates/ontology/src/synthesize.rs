use anyhow::{Context, Result};
use extract::{LlmClient, clean_llm_output, prompt};
use merge::MergedOntology;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::rdf::parse_turtle;
use crate::turtle::TurtleWriter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurtleMode {
    /// Deterministic rendering with [`TurtleWriter`].
    #[default]
    Template,
    /// Ask the model to write the ontology, falling back to the template.
    Llm,
}

/// Produces the final Turtle document for a merged ontology.
#[derive(Clone)]
pub struct TurtleSynthesizer {
    llm: Option<LlmClient>,
    writer: TurtleWriter,
}

impl TurtleSynthesizer {
    pub fn template(writer: TurtleWriter) -> Self {
        Self { llm: None, writer }
    }

    pub fn with_llm(llm: LlmClient, writer: TurtleWriter) -> Self {
        Self {
            llm: Some(llm),
            writer,
        }
    }

    pub fn mode(&self) -> TurtleMode {
        if self.llm.is_some() {
            TurtleMode::Llm
        } else {
            TurtleMode::Template
        }
    }

    /// LLM-written Turtle, cleaned and checked to parse.
    pub async fn synthesize_with_llm(&self, llm: &LlmClient, ontology: &MergedOntology) -> Result<String> {
        let merged_json =
            serde_json::to_string_pretty(ontology).context("Failed to serialize merged ontology")?;
        let prompt = prompt::build_turtle_prompt(&merged_json, self.writer.base_iri());

        let raw = llm.generate_text(prompt::TURTLE_SYSTEM, &prompt).await?;
        let ttl = clean_llm_output(&raw);

        let triples = parse_turtle(&ttl).context("LLM returned invalid Turtle")?;
        if triples.is_empty() {
            anyhow::bail!("LLM returned an empty ontology");
        }

        info!(triples = triples.len(), model = llm.model(), "LLM synthesized Turtle");
        Ok(ttl)
    }

    /// Final Turtle for `ontology`. Never fails: LLM problems fall back to
    /// the template writer.
    pub async fn synthesize(&self, ontology: &MergedOntology) -> String {
        if let Some(llm) = &self.llm {
            match self.synthesize_with_llm(llm, ontology).await {
                Ok(ttl) => return ttl,
                Err(e) => warn!(error = %e, "Turtle synthesis failed, using template writer"),
            }
        }
        self.writer.write(ontology)
    }
}
