use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf"];

pub struct FileReader;

impl FileReader {
    pub fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub async fn read_file(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "txt" | "md" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read file: {:?}", path))?;
                Ok(content)
            }
            "pdf" => Self::read_pdf(path).await,
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    async fn read_pdf(path: &Path) -> Result<String> {
        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        // pdf-extract is synchronous and CPU bound
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .context("PDF extraction task panicked")?
            .map_err(|e| anyhow::anyhow!("Failed to extract PDF text from {:?}: {}", path, e))?;

        debug!(path = ?path, chars = text.len(), "Extracted PDF text");
        Ok(text)
    }

    /// Read every supported file under `dir`, recursively, in file-name order.
    pub async fn read_directory(dir: &Path) -> Result<Vec<(String, String)>> {
        let paths: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| Self::is_supported(path))
            .collect();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = Self::read_file(&path).await?;
            let path_str = path.to_string_lossy().to_string();
            files.push((path_str, content));
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_text_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# Heading").unwrap();
        std::fs::write(dir.path().join("a.txt"), "plain text").unwrap();
        std::fs::write(dir.path().join("ignored.csv"), "x,y").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "nested").unwrap();

        let files = FileReader::read_directory(dir.path()).await.unwrap();
        let contents: Vec<_> = files.iter().map(|(_, c)| c.as_str()).collect();

        assert_eq!(contents, vec!["plain text", "# Heading", "nested"]);
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "x,y").unwrap();

        let err = FileReader::read_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn test_is_supported() {
        assert!(FileReader::is_supported(Path::new("manual.PDF")));
        assert!(FileReader::is_supported(Path::new("notes.md")));
        assert!(!FileReader::is_supported(Path::new("image.png")));
        assert!(!FileReader::is_supported(Path::new("README")));
    }
}
