use anyhow::{Context, Result};
use extract::ExtractedChunk;
use merge::MergedOntology;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// On-disk layout for pipeline artifacts:
///
/// ```text
/// <root>/partial_ontologies/partial_<index>.json
/// <root>/merged_ontology.json
/// <root>/ontologies/<name>_ontology.ttl
/// <root>/ontologies/graphs/<name>_ontology.dot
/// ```
#[derive(Debug, Clone)]
pub struct OntologyStore {
    root: PathBuf,
}

impl OntologyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partials_dir(&self) -> PathBuf {
        self.root.join("partial_ontologies")
    }

    pub fn merged_path(&self) -> PathBuf {
        self.root.join("merged_ontology.json")
    }

    pub fn turtle_path(&self, name: &str) -> PathBuf {
        self.root.join("ontologies").join(format!("{}_ontology.ttl", name))
    }

    pub fn dot_path(&self, name: &str) -> PathBuf {
        self.root
            .join("ontologies")
            .join("graphs")
            .join(format!("{}_ontology.dot", name))
    }

    pub async fn save_partial(&self, chunk: &ExtractedChunk) -> Result<PathBuf> {
        let path = self.partials_dir().join(format!("partial_{}.json", chunk.index));
        write_json(&path, chunk).await?;
        Ok(path)
    }

    /// Remove partials left by an earlier run.
    pub async fn clear_partials(&self) -> Result<()> {
        let dir = self.partials_dir();
        if fs::try_exists(&dir).await.unwrap_or(false) {
            fs::remove_dir_all(&dir)
                .await
                .context(format!("Failed to clear directory: {:?}", dir))?;
        }
        Ok(())
    }

    /// Load every saved partial, ordered by chunk index.
    pub async fn load_partials(&self) -> Result<Vec<ExtractedChunk>> {
        let dir = self.partials_dir();
        let mut entries = fs::read_dir(&dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        let mut chunks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path)
                .await
                .context(format!("Failed to read file: {:?}", path))?;
            let chunk: ExtractedChunk = serde_json::from_str(&json)
                .context(format!("Failed to parse partial: {:?}", path))?;
            chunks.push(chunk);
        }

        chunks.sort_by_key(|c| c.index);
        Ok(chunks)
    }

    pub async fn save_merged(&self, ontology: &MergedOntology) -> Result<PathBuf> {
        let path = self.merged_path();
        write_json(&path, ontology).await?;
        info!(path = ?path, "Saved merged ontology");
        Ok(path)
    }

    pub async fn save_turtle(&self, name: &str, ttl: &str) -> Result<PathBuf> {
        let path = self.turtle_path(name);
        write_text(&path, ttl).await?;
        info!(path = ?path, "Saved Turtle ontology");
        Ok(path)
    }
}

pub async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    write_text(path, &json).await
}

/// Write `contents`, creating parent directories as needed.
pub async fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create directory: {:?}", parent))?;
    }
    fs::write(path, contents)
        .await
        .context(format!("Failed to write file: {:?}", path))
}
