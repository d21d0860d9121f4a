pub mod chunk;
pub mod chunker;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::FileReader;

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Read and chunk a single document
pub async fn ingest_file(file_path: &Path, config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    let content = FileReader::read_file(file_path).await?;
    let path_str = file_path.to_string_lossy().to_string();
    let doc_id = generate_doc_id(&path_str);

    let chunker = Chunker::new(config.clone());
    let chunks = chunker.chunk_text(&doc_id, &content, &path_str);

    info!(
        path = %path_str,
        chars = content.chars().count(),
        chunks = chunks.len(),
        "Ingested document"
    );
    Ok(chunks)
}

/// Ingest entire directory. Chunk indices run across all documents in
/// reading order.
pub async fn ingest_directory(dir_path: &Path, config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    let files = FileReader::read_directory(dir_path).await?;
    let chunker = Chunker::new(config.clone());

    let mut all_chunks = Vec::new();

    for (path, content) in files {
        let doc_id = generate_doc_id(&path);
        for mut chunk in chunker.chunk_text(&doc_id, &content, &path) {
            chunk.index = all_chunks.len();
            all_chunks.push(chunk);
        }
    }

    info!(dir = ?dir_path, chunks = all_chunks.len(), "Ingested directory");
    Ok(all_chunks)
}

/// Ingest a file or a directory, whichever `path` is.
pub async fn ingest_path(path: &Path, config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    if path.is_dir() {
        ingest_directory(path, config).await
    } else if path.is_file() {
        ingest_file(path, config).await
    } else {
        anyhow::bail!("Path does not exist: {:?}", path)
    }
}
