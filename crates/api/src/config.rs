use anyhow::{Context, Result};
use ingest::ChunkerConfig;
use ontology::{DEFAULT_BASE_IRI, TurtleMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_LLM_URL: &str = "ONTOGEN_LLM_URL";
pub const ENV_EXTRACTION_MODEL: &str = "ONTOGEN_EXTRACTION_MODEL";
pub const ENV_SYNTHESIS_MODEL: &str = "ONTOGEN_SYNTHESIS_MODEL";
pub const ENV_DATA_DIR: &str = "ONTOGEN_DATA_DIR";
pub const ENV_BIND: &str = "ONTOGEN_BIND";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: OperationMode,
    pub llm: LlmConfig,
    pub chunking: ChunkerConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,      // Cache aggressively, many parallel extractions
    Accurate,  // Always fresh, LLM-written Turtle
    Balanced,  // Default: cache when available, templated Turtle
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub extraction_model: String,
    pub synthesis_model: String,
    /// Follow-up prompts asking the model to fix invalid JSON.
    pub max_repairs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_extractions: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root for partials, the merged JSON, Turtle and DOT files.
    pub data_dir: PathBuf,
    pub turtle_mode: TurtleMode,
    pub base_iri: String,
    /// HTTP listen address.
    pub bind: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            extraction_model: "llama3".to_string(),
            synthesis_model: "llama3".to_string(),
            max_repairs: 2,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_extractions: 5,
            request_timeout_secs: 300,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            turtle_mode: TurtleMode::Template,
            base_iri: DEFAULT_BASE_IRI.to_string(),
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            llm: LlmConfig::default(),
            chunking: ChunkerConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn fast_mode() -> Self {
        Self {
            mode: OperationMode::Fast,
            concurrency: ConcurrencyConfig {
                max_concurrent_extractions: 20,
                request_timeout_secs: 120,
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 500,
                max_backoff_ms: 5000,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 50000,
            },
            ..Self::default()
        }
    }

    pub fn accurate_mode() -> Self {
        Self {
            mode: OperationMode::Accurate,
            llm: LlmConfig {
                max_repairs: 3,
                ..LlmConfig::default()
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_extractions: 2,
                request_timeout_secs: 600,
            },
            retry: RetryConfig {
                max_retries: 5,
                initial_backoff_ms: 2000,
                max_backoff_ms: 20000,
            },
            cache: CacheConfig {
                enabled: false,
                max_entries: 0,
            },
            output: OutputConfig {
                turtle_mode: TurtleMode::Llm,
                ..OutputConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Fast => Self::fast_mode(),
            OperationMode::Balanced => Self::default(),
            OperationMode::Accurate => Self::accurate_mode(),
        }
    }

    /// The JSON file at `path` over the preset its `mode` names (defaults
    /// without a file), then `ONTOGEN_*` environment variables (a `.env`
    /// file is honoured).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());

        info!(
            mode = ?config.mode,
            llm = %config.llm.base_url,
            data_dir = ?config.output.data_dir,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The file's `mode` picks the preset; every other field in the file
    /// overrides that preset.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        let overlay: Value =
            serde_json::from_str(&json).context(format!("Invalid config file: {:?}", path))?;

        let mode = match overlay.get("mode") {
            Some(mode) => OperationMode::deserialize(mode)
                .context(format!("Invalid mode in config file: {:?}", path))?,
            None => OperationMode::Balanced,
        };

        let mut merged = serde_json::to_value(Self::for_mode(mode))?;
        overlay_json(&mut merged, overlay);
        serde_json::from_value(merged).context(format!("Invalid config file: {:?}", path))
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_LLM_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup(ENV_EXTRACTION_MODEL) {
            self.llm.extraction_model = model;
        }
        if let Some(model) = lookup(ENV_SYNTHESIS_MODEL) {
            self.llm.synthesis_model = model;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.output.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.output.bind = bind;
        }
    }
}

/// Recursively replace fields of `base` with those present in `overlay`.
fn overlay_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => overlay_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_presets() {
        let fast = AppConfig::for_mode(OperationMode::Fast);
        assert!(fast.cache.enabled);
        assert_eq!(fast.concurrency.max_concurrent_extractions, 20);

        let accurate = AppConfig::for_mode(OperationMode::Accurate);
        assert!(!accurate.cache.enabled);
        assert_eq!(accurate.output.turtle_mode, TurtleMode::Llm);

        assert_eq!(AppConfig::default().chunking.chunk_size, 50000);
        assert_eq!(AppConfig::default().chunking.overlap, 4000);
    }

    #[test]
    fn test_partial_json_file_starts_from_its_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mode": "fast", "llm": {"extraction_model": "mistral"}, "output": {"turtle_mode": "llm"}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.mode, OperationMode::Fast);
        assert_eq!(config.llm.extraction_model, "mistral");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.output.turtle_mode, TurtleMode::Llm);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.concurrency.max_concurrent_extractions, 20);
        assert_eq!(config.cache.max_entries, 50000);
    }

    #[test]
    fn test_file_fields_override_the_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"mode": "accurate", "cache": {"enabled": true}, "output": {"turtle_mode": "template"}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.mode, OperationMode::Accurate);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 0);
        assert_eq!(config.output.turtle_mode, TurtleMode::Template);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.concurrency.max_concurrent_extractions, 2);
    }

    #[test]
    fn test_file_without_mode_is_balanced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"retry": {"max_retries": 7}}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.mode, OperationMode::Balanced);
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.retry.initial_backoff_ms, AppConfig::default().retry.initial_backoff_ms);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_LLM_URL, "http://gpu-box:11434"),
            (ENV_DATA_DIR, "/tmp/onto"),
            (ENV_BIND, "127.0.0.1:8080"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(config.output.data_dir, PathBuf::from("/tmp/onto"));
        assert_eq!(config.output.bind, "127.0.0.1:8080");
        assert_eq!(config.llm.extraction_model, "llama3");
    }

    #[test]
    fn test_missing_config_file() {
        assert!(AppConfig::from_file(Path::new("/nonexistent/config.json")).is_err());
    }
}
