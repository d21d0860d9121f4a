use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::prompt;

/// Client for an Ollama-compatible `/api/generate` endpoint.
///
/// Constructed explicitly and passed to whoever needs it; there is no
/// process-wide client.
#[derive(Clone)]
pub struct LlmClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>, // "json" for structured output
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Same as [`LlmClient::new`] with a per-request timeout.
    pub fn with_timeout(base_url: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Same endpoint, different model.
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            base_url: self.base_url.clone(),
            model: model.into(),
            client: self.client.clone(),
        }
    }

    pub async fn generate(&self, system: &str, prompt: &str, format: ResponseFormat) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: match format {
                ResponseFormat::Json => Some("json"), // Force JSON output
                ResponseFormat::Text => None,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM")?;

        if !response.status().is_success() {
            anyhow::bail!("LLM request failed: {}", response.status());
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        debug!(model = %self.model, chars = body.response.len(), "LLM response received");
        Ok(body.response.trim().to_string())
    }

    pub async fn generate_json(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate(system, prompt, ResponseFormat::Json).await
    }

    pub async fn generate_text(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate(system, prompt, ResponseFormat::Text).await
    }

    /// Generate JSON, asking the model to repair its own output when it does
    /// not parse. Returns the last response even if it is still invalid;
    /// transport errors are returned as errors.
    pub async fn generate_json_with_repair(
        &self,
        system: &str,
        prompt: &str,
        max_repairs: usize,
    ) -> Result<String> {
        let mut response = self.generate_json(system, prompt).await?;

        for attempt in 0..max_repairs {
            if is_valid_json(&response) {
                return Ok(response);
            }

            warn!(attempt = attempt + 1, max_repairs, "LLM returned invalid JSON, asking for a fix");
            let retry_prompt = prompt::build_retry_prompt(&response);
            response = self.generate_json(system, &retry_prompt).await?;
        }

        Ok(response)
    }
}

fn is_valid_json(raw: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(&crate::cleanup::clean_llm_output(raw)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_format_for_text() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "hi",
            system: "sys",
            stream: false,
            format: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_for_model_keeps_endpoint() {
        let client = LlmClient::new("http://localhost:11434".into(), "llama3".into());
        let other = client.for_model("mistral");
        assert_eq!(other.model(), "mistral");
        assert_eq!(other.base_url, client.base_url);
    }

    #[test]
    fn test_fenced_json_counts_as_valid() {
        assert!(is_valid_json("```json\n{\"entities\": []}\n```"));
        assert!(!is_valid_json("{\"entities\": ["));
    }
}
